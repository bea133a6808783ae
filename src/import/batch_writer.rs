//! Batched, per-batch-transactional writes.
//!
//! Rows are split into consecutive slices of `batch_size`. Each slice is one
//! transaction running one upsert statement: it either commits completely or
//! is rolled back completely. A failed slice is logged and skipped; the
//! writer always moves on to the next slice.

use crate::db::DbSession;
use crate::import::retry::{self, FailureKind, RetryPolicy};
use crate::import::stats::WriteReport;
use crate::import::upsert::BatchRow;
use sqlx::Connection;

/// One write unit within a larger sequence of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSlice {
    /// 1-based batch number
    pub number: usize,
    pub start: usize,
    pub len: usize,
}

impl BatchSlice {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Percentage of `total` rows covered once this slice is done.
    pub fn progress(&self, total: usize) -> f64 {
        if total == 0 {
            return 100.0;
        }
        self.end() as f64 / total as f64 * 100.0
    }
}

/// Split `total` rows into consecutive slices of at most `batch_size`.
pub fn plan_batches(total: usize, batch_size: usize) -> Vec<BatchSlice> {
    let batch_size = batch_size.max(1);
    (0..total)
        .step_by(batch_size)
        .enumerate()
        .map(|(i, start)| BatchSlice {
            number: i + 1,
            start,
            len: batch_size.min(total - start),
        })
        .collect()
}

pub struct BatchWriter<'s> {
    session: &'s mut DbSession,
    batch_size: usize,
    retry: RetryPolicy,
    retries: u32,
}

impl<'s> BatchWriter<'s> {
    pub fn new(session: &'s mut DbSession, batch_size: usize, retry: RetryPolicy) -> Self {
        Self {
            session,
            batch_size,
            retry,
            retries: 0,
        }
    }

    /// Write every row of `rows` in batches, reporting progress after each
    /// committed batch. Never fails: failed batches are recorded in the
    /// returned report.
    pub async fn write_all<R: BatchRow>(&mut self, label: &str, rows: &[R]) -> WriteReport {
        let mut report = WriteReport::new(R::UPSERT.table, rows.len());
        if rows.is_empty() {
            log::info!("{}: nothing to write", label);
            return report;
        }

        let total = rows.len();
        let retries_before = self.retries;

        for slice in plan_batches(total, self.batch_size) {
            report.batches += 1;
            let batch = &rows[slice.start..slice.end()];

            match self.write_unit(batch).await {
                Ok(affected) => {
                    report.committed_batches += 1;
                    report.rows_written += batch.len();
                    report.rows_affected += affected;
                    log::info!(
                        "{} progress: {:.1}% ({}/{})",
                        label,
                        slice.progress(total),
                        slice.end(),
                        total
                    );
                }
                Err(e) => {
                    log::error!("error inserting {} batch {}: {}", label, slice.number, e);
                    report.failed_batches.push(slice.number);
                }
            }
        }

        report.retries = self.retries - retries_before;
        report
    }

    /// Write `rows` as a single transaction, retrying transient failures as
    /// allowed by the retry policy.
    pub async fn write_unit<R: BatchRow>(&mut self, rows: &[R]) -> Result<u64, sqlx::Error> {
        let sql = R::UPSERT.to_sql(self.session.schema());
        let mut attempt = 0;

        loop {
            let err = match self.write_transaction(&sql, rows).await {
                Ok(affected) => return Ok(affected),
                Err(err) => err,
            };

            let kind = retry::classify(&err);
            if !self.retry.should_retry(kind, attempt) {
                return Err(err);
            }

            attempt += 1;
            self.retries += 1;
            let delay = self.retry.delay_for(attempt);
            log::warn!(
                "{} write failed ({:?}), retry {}/{} in {:?}: {}",
                R::UPSERT.table,
                kind,
                attempt,
                self.retry.max_retries,
                delay,
                err
            );
            tokio::time::sleep(delay).await;

            if kind == FailureKind::Connection {
                if let Err(e) = self.session.reconnect().await {
                    log::warn!("reconnect failed: {}", e);
                }
            }
        }
    }

    async fn write_transaction<R: BatchRow>(
        &mut self,
        sql: &str,
        rows: &[R],
    ) -> Result<u64, sqlx::Error> {
        let mut tx = self.session.conn().begin().await?;

        let result = R::bind_batch(sqlx::query(sql), rows)
            .execute(&mut *tx)
            .await;

        match result {
            Ok(done) => {
                tx.commit().await?;
                log::trace!("committed {} rows into {}", rows.len(), R::UPSERT.table);
                Ok(done.rows_affected())
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    log::warn!("rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_for_2500_rows_is_three_units() {
        let plan = plan_batches(2500, 1000);
        let lens: Vec<usize> = plan.iter().map(|s| s.len).collect();
        assert_eq!(lens, vec![1000, 1000, 500]);

        let numbers: Vec<usize> = plan.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);

        let progress: Vec<String> = plan
            .iter()
            .map(|s| format!("{:.1}", s.progress(2500)))
            .collect();
        assert_eq!(progress, vec!["40.0", "80.0", "100.0"]);
    }

    #[test]
    fn plan_edges() {
        assert!(plan_batches(0, 1000).is_empty());

        let exact = plan_batches(2000, 1000);
        assert_eq!(exact.len(), 2);
        assert_eq!(exact[1].start, 1000);
        assert_eq!(exact[1].end(), 2000);

        let small = plan_batches(3, 1000);
        assert_eq!(small, vec![BatchSlice { number: 1, start: 0, len: 3 }]);
    }

    #[test]
    fn slices_cover_every_row_once() {
        let plan = plan_batches(10_001, 999);
        let covered: usize = plan.iter().map(|s| s.len).sum();
        assert_eq!(covered, 10_001);
        for pair in plan.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start);
        }
    }
}
