//! Import statistics tracking.

use std::fmt;

/// Outcome of writing one table in batches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub table: &'static str,
    /// Rows handed to the writer
    pub total_rows: usize,
    /// Write units issued
    pub batches: usize,
    pub committed_batches: usize,
    /// 1-based numbers of batches that were rolled back
    pub failed_batches: Vec<usize>,
    /// Rows in committed batches
    pub rows_written: usize,
    /// Rows Postgres reported as inserted or updated
    pub rows_affected: u64,
    pub retries: u32,
}

impl WriteReport {
    pub fn new(table: &'static str, total_rows: usize) -> Self {
        Self {
            table,
            total_rows,
            ..Self::default()
        }
    }

    pub fn rows_failed(&self) -> usize {
        self.total_rows - self.rows_written
    }

    pub fn is_complete(&self) -> bool {
        self.failed_batches.is_empty()
    }
}

/// Counts produced by the transformer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformSummary {
    pub seller_rows: usize,
    pub domain_rows: usize,
    pub missing_seller_id: usize,
    pub unknown_seller_type: usize,
}

/// Statistics for a complete import run.
#[derive(Debug, Clone, Default)]
pub struct ImportStats {
    pub loaded: usize,
    pub transform: TransformSummary,
    pub sellers: WriteReport,
    pub snapshot_recorded: bool,
    pub domains: WriteReport,
}

impl ImportStats {
    pub fn has_failures(&self) -> bool {
        !self.sellers.is_complete() || !self.domains.is_complete() || !self.snapshot_recorded
    }
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Import summary:")?;
        writeln!(f, "  loaded: {}", self.loaded)?;
        writeln!(
            f,
            "  sellers written: {}/{} ({} failed batches)",
            self.sellers.rows_written,
            self.sellers.total_rows,
            self.sellers.failed_batches.len()
        )?;
        writeln!(
            f,
            "  snapshot: {}",
            if self.snapshot_recorded { "recorded" } else { "failed" }
        )?;
        writeln!(
            f,
            "  domains written: {}/{} ({} new, {} failed batches)",
            self.domains.rows_written,
            self.domains.total_rows,
            self.domains.rows_affected,
            self.domains.failed_batches.len()
        )?;
        Ok(())
    }
}
