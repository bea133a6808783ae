//! Daily snapshot recording.

use crate::import::batch_writer::BatchWriter;
use crate::models::SnapshotRow;
use chrono::NaiveDate;

/// Snapshot for a full import of `total` sellers on `date`.
///
/// `removed_count` is always 0: this path does not compare against the
/// previous day's snapshot.
pub fn snapshot_for_run(date: NaiveDate, total: usize) -> SnapshotRow {
    let count = i32::try_from(total).unwrap_or(i32::MAX);
    SnapshotRow {
        snapshot_date: date,
        total_count: count,
        new_count: count,
        removed_count: 0,
    }
}

/// Upsert the snapshot row. Returns whether it was written; a failure is
/// logged and rolled back but never aborts the run.
pub async fn record_snapshot(writer: &mut BatchWriter<'_>, snapshot: &SnapshotRow) -> bool {
    log::info!("creating snapshot for {}", snapshot.snapshot_date);

    match writer.write_unit(std::slice::from_ref(snapshot)).await {
        Ok(_) => {
            log::info!(
                "snapshot created: total={} new={} removed={}",
                snapshot.total_count,
                snapshot.new_count,
                snapshot.removed_count
            );
            true
        }
        Err(e) => {
            log::error!("error creating snapshot: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_are_the_full_input_size() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let row = snapshot_for_run(date, 2);
        assert_eq!(row.snapshot_date, date);
        assert_eq!(row.total_count, 2);
        assert_eq!(row.new_count, 2);
        assert_eq!(row.removed_count, 0);
    }

    #[test]
    fn oversized_counts_saturate() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let row = snapshot_for_run(date, usize::MAX);
        assert_eq!(row.total_count, i32::MAX);
    }
}
