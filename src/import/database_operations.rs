//! Upsert statements for the seller_adsense tables.
//!
//! Each row type declares its target table, natural key and conflict policy
//! and binds itself in columnar form for a PostgreSQL UNNEST insert.

use crate::import::data_builder::build_seller_batch_data;
use crate::import::data_structures::{DomainsData, SnapshotsData};
use crate::import::upsert::{BatchRow, Column, ConflictPolicy, PgQuery, UpsertStatement};
use crate::models::{SellerDomainRow, SellerRow, SnapshotRow};

/// `sellers`: insert or update. `first_seen_date` is only written on insert.
pub const SELLERS_UPSERT: UpsertStatement = UpsertStatement {
    table: "sellers",
    columns: &[
        Column::new("seller_id", "text"),
        Column::new("first_seen_date", "date"),
        Column::new("seller_type", "text"),
        Column::new("is_confidential", "bool"),
        Column::new("name", "text"),
        Column::new("domain", "text"),
    ],
    conflict_key: &["seller_id"],
    policy: ConflictPolicy::Update {
        columns: &["seller_type", "is_confidential", "name", "domain"],
        touch: Some("updated_at"),
    },
};

/// `seller_domains`: insert or ignore.
pub const SELLER_DOMAINS_UPSERT: UpsertStatement = UpsertStatement {
    table: "seller_domains",
    columns: &[
        Column::new("seller_id", "text"),
        Column::new("domain", "text"),
        Column::new("first_detected", "date"),
        Column::new("detection_source", "text"),
        Column::new("confidence_score", "float8"),
    ],
    conflict_key: &["seller_id", "domain"],
    policy: ConflictPolicy::Ignore,
};

/// `daily_snapshots`: one row per day; a re-run overwrites total and new
/// counts but leaves the stored `removed_count` alone.
pub const DAILY_SNAPSHOTS_UPSERT: UpsertStatement = UpsertStatement {
    table: "daily_snapshots",
    columns: &[
        Column::new("snapshot_date", "date"),
        Column::new("total_count", "int4"),
        Column::new("new_count", "int4"),
        Column::new("removed_count", "int4"),
    ],
    conflict_key: &["snapshot_date"],
    policy: ConflictPolicy::Update {
        columns: &["total_count", "new_count"],
        touch: None,
    },
};

impl BatchRow for SellerRow {
    const UPSERT: UpsertStatement = SELLERS_UPSERT;

    fn bind_batch<'q>(query: PgQuery<'q>, rows: &[Self]) -> PgQuery<'q> {
        let data = build_seller_batch_data(rows);
        query
            .bind(data.seller_ids)
            .bind(data.first_seen_dates)
            .bind(data.seller_types)
            .bind(data.is_confidential)
            .bind(data.names)
            .bind(data.domains)
    }
}

impl BatchRow for SellerDomainRow {
    const UPSERT: UpsertStatement = SELLER_DOMAINS_UPSERT;

    fn bind_batch<'q>(query: PgQuery<'q>, rows: &[Self]) -> PgQuery<'q> {
        let data = DomainsData::from_rows(rows);
        query
            .bind(data.seller_ids)
            .bind(data.domains)
            .bind(data.first_detected)
            .bind(data.detection_sources)
            .bind(data.confidence_scores)
    }
}

impl BatchRow for SnapshotRow {
    const UPSERT: UpsertStatement = DAILY_SNAPSHOTS_UPSERT;

    fn bind_batch<'q>(query: PgQuery<'q>, rows: &[Self]) -> PgQuery<'q> {
        let data = SnapshotsData::from_rows(rows);
        query
            .bind(data.snapshot_dates)
            .bind(data.total_counts)
            .bind(data.new_counts)
            .bind(data.removed_counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sellers_statement_never_overwrites_first_seen_date() {
        let sql = SELLERS_UPSERT.to_sql("seller_adsense");
        assert!(sql.starts_with("INSERT INTO seller_adsense.sellers (seller_id, first_seen_date,"));
        assert!(sql.contains("ON CONFLICT (seller_id) DO UPDATE SET"));
        assert!(sql.contains("seller_type = EXCLUDED.seller_type"));
        assert!(sql.contains("is_confidential = EXCLUDED.is_confidential"));
        assert!(sql.contains("name = EXCLUDED.name"));
        assert!(sql.contains("domain = EXCLUDED.domain"));
        assert!(sql.contains("updated_at = NOW()"));
        assert!(!sql.contains("first_seen_date = EXCLUDED"));
    }

    #[test]
    fn domains_statement_ignores_conflicts() {
        let sql = SELLER_DOMAINS_UPSERT.to_sql("seller_adsense");
        assert!(sql.contains("$5::float8[]"));
        assert!(sql.ends_with("ON CONFLICT (seller_id, domain) DO NOTHING"));
    }

    #[test]
    fn snapshot_statement_keeps_removed_count() {
        let sql = DAILY_SNAPSHOTS_UPSERT.to_sql("seller_adsense");
        assert!(sql.ends_with(
            "ON CONFLICT (snapshot_date) DO UPDATE SET total_count = EXCLUDED.total_count, new_count = EXCLUDED.new_count"
        ));
    }

    #[test]
    fn column_counts_match_bound_arrays() {
        assert_eq!(SELLERS_UPSERT.columns.len(), 6);
        assert_eq!(SELLER_DOMAINS_UPSERT.columns.len(), 5);
        assert_eq!(DAILY_SNAPSHOTS_UPSERT.columns.len(), 4);
    }
}
