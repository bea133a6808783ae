//! Transformation of raw sellers.json entries into table rows.
//!
//! Produces one seller row per entry, in input order, and one domain row
//! for every entry that declares a non-empty domain. Domain rows are built
//! from the same entry as their seller row, so every domain row refers to a
//! seller written in the same run.

use crate::import::data_structures::SellersData;
use crate::import::stats::TransformSummary;
use crate::models::{
    RawSeller, SELLERS_JSON_CONFIDENCE, SELLERS_JSON_SOURCE, SellerDomainRow, SellerRow,
    SellerType,
};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;

/// Output of [`build_rows`].
#[derive(Debug, Default)]
pub struct TransformedSellers {
    pub sellers: Vec<SellerRow>,
    pub domains: Vec<SellerDomainRow>,
    pub summary: TransformSummary,
}

/// Only the number 1 (`1` or `1.0`) marks a seller as confidential. Booleans,
/// strings and null do not.
pub fn is_confidential_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        _ => false,
    }
}

/// The declared seller type, or PUBLISHER when absent, null or blank.
pub fn seller_type_or_default(value: Option<&str>) -> String {
    match value {
        Some(kind) if !kind.trim().is_empty() => kind.to_string(),
        _ => SellerType::default().to_string(),
    }
}

pub fn build_seller_row(raw: &RawSeller, run_date: NaiveDate) -> SellerRow {
    SellerRow {
        seller_id: raw.seller_id.clone(),
        first_seen_date: run_date,
        seller_type: seller_type_or_default(raw.seller_type.as_deref()),
        is_confidential: is_confidential_flag(raw.is_confidential.as_ref()),
        name: raw.name.clone(),
        domain: raw.domain.clone(),
    }
}

/// Domain row for `raw`, if it declares a non-empty domain.
pub fn build_domain_row(raw: &RawSeller, run_date: NaiveDate) -> Option<SellerDomainRow> {
    let domain = raw.domain.as_deref().filter(|d| !d.is_empty())?;
    Some(SellerDomainRow {
        seller_id: raw.seller_id.clone(),
        domain: domain.to_string(),
        first_detected: run_date,
        detection_source: SELLERS_JSON_SOURCE.to_string(),
        confidence_score: SELLERS_JSON_CONFIDENCE,
    })
}

/// Columnar data for one batch of seller rows.
///
/// A seller_id repeated within the batch is collapsed into one row: the last
/// occurrence supplies the values, the first fixes the position. A single
/// `ON CONFLICT DO UPDATE` statement cannot touch the same key twice.
/// Rows without a seller_id are kept as they are.
pub fn build_seller_batch_data(chunk: &[SellerRow]) -> SellersData {
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(chunk.len());
    let mut rows: Vec<&SellerRow> = Vec::with_capacity(chunk.len());

    for row in chunk {
        match row.seller_id.as_deref() {
            Some(id) => match positions.get(id) {
                Some(&pos) => rows[pos] = row,
                None => {
                    positions.insert(id, rows.len());
                    rows.push(row);
                }
            },
            None => rows.push(row),
        }
    }

    if rows.len() < chunk.len() {
        log::debug!(
            "collapsed {} repeated seller_ids in batch",
            chunk.len() - rows.len()
        );
    }

    SellersData::from_rows(rows)
}

/// Transform every entry. Entries without a `seller_id` are forwarded
/// unchanged; the database rejects them when their batch is written.
pub fn build_rows(raw: &[RawSeller], run_date: NaiveDate) -> TransformedSellers {
    let mut out = TransformedSellers {
        sellers: Vec::with_capacity(raw.len()),
        ..TransformedSellers::default()
    };

    for (index, entry) in raw.iter().enumerate() {
        if entry.seller_id.is_none() {
            out.summary.missing_seller_id += 1;
            log::warn!("sellers[{}] has no seller_id; its batch will fail", index);
        }

        if let Some(kind) = entry.seller_type.as_deref() {
            if !kind.trim().is_empty() && kind.parse::<SellerType>().is_err() {
                out.summary.unknown_seller_type += 1;
                log::debug!("sellers[{}] has unrecognised seller_type '{}'", index, kind);
            }
        }

        out.sellers.push(build_seller_row(entry, run_date));
        if let Some(domain_row) = build_domain_row(entry, run_date) {
            out.domains.push(domain_row);
        }
    }

    out.summary.seller_rows = out.sellers.len();
    out.summary.domain_rows = out.domains.len();

    log::info!(
        "transformed {} records, found {} domains",
        out.summary.seller_rows,
        out.summary.domain_rows
    );

    out
}
