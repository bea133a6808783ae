//! Columnar batch data for UNNEST inserts.
//!
//! Each struct holds one vector per target column; all vectors have the same
//! length and index `i` across them is one row.

use crate::models::{SellerDomainRow, SellerRow, SnapshotRow};
use chrono::NaiveDate;

#[derive(Debug, Default)]
pub struct SellersData {
    pub seller_ids: Vec<Option<String>>,
    pub first_seen_dates: Vec<NaiveDate>,
    pub seller_types: Vec<String>,
    pub is_confidential: Vec<bool>,
    pub names: Vec<Option<String>>,
    pub domains: Vec<Option<String>>,
}

impl SellersData {
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a SellerRow>) -> Self {
        let mut data = Self::default();
        for row in rows {
            data.seller_ids.push(row.seller_id.clone());
            data.first_seen_dates.push(row.first_seen_date);
            data.seller_types.push(row.seller_type.clone());
            data.is_confidential.push(row.is_confidential);
            data.names.push(row.name.clone());
            data.domains.push(row.domain.clone());
        }
        data
    }
}

#[derive(Debug, Default)]
pub struct DomainsData {
    pub seller_ids: Vec<Option<String>>,
    pub domains: Vec<String>,
    pub first_detected: Vec<NaiveDate>,
    pub detection_sources: Vec<String>,
    pub confidence_scores: Vec<f64>,
}

impl DomainsData {
    pub fn from_rows(rows: &[SellerDomainRow]) -> Self {
        let mut data = Self::default();
        for row in rows {
            data.seller_ids.push(row.seller_id.clone());
            data.domains.push(row.domain.clone());
            data.first_detected.push(row.first_detected);
            data.detection_sources.push(row.detection_source.clone());
            data.confidence_scores.push(row.confidence_score);
        }
        data
    }
}

#[derive(Debug, Default)]
pub struct SnapshotsData {
    pub snapshot_dates: Vec<NaiveDate>,
    pub total_counts: Vec<i32>,
    pub new_counts: Vec<i32>,
    pub removed_counts: Vec<i32>,
}

impl SnapshotsData {
    pub fn from_rows(rows: &[SnapshotRow]) -> Self {
        let mut data = Self::default();
        for row in rows {
            data.snapshot_dates.push(row.snapshot_date);
            data.total_counts.push(row.total_count);
            data.new_counts.push(row.new_count);
            data.removed_counts.push(row.removed_count);
        }
        data
    }
}
