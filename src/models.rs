use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Detection source recorded on every domain row written by this importer.
pub const SELLERS_JSON_SOURCE: &str = "sellers_json";

/// Confidence assigned to domains declared directly in sellers.json.
pub const SELLERS_JSON_CONFIDENCE: f64 = 1.0;

// ===== Source document =====

/// One entry of the `sellers` array as it appears in sellers.json.
///
/// Every field is optional so a single odd entry never fails the whole
/// document; defaults are applied by the transformer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSeller {
    #[serde(default)]
    pub seller_id: Option<String>,
    #[serde(default)]
    pub seller_type: Option<String>,
    #[serde(default)]
    pub is_confidential: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

/// Top-level shape of sellers.json. Other keys (`version`, `contact_email`,
/// ...) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct SellersDocument {
    pub sellers: Vec<RawSeller>,
}

// ===== Seller type =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SellerType {
    #[default]
    Publisher,
    Intermediary,
    Both,
}

impl SellerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SellerType::Publisher => "PUBLISHER",
            SellerType::Intermediary => "INTERMEDIARY",
            SellerType::Both => "BOTH",
        }
    }
}

impl fmt::Display for SellerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SellerType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PUBLISHER" => Ok(SellerType::Publisher),
            "INTERMEDIARY" => Ok(SellerType::Intermediary),
            "BOTH" => Ok(SellerType::Both),
            other => Err(format!("unknown seller type '{other}'")),
        }
    }
}

// ===== Rows written to seller_adsense =====

/// Row destined for `sellers`.
///
/// `seller_type` is kept as the raw string so values outside [`SellerType`]
/// reach the database unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerRow {
    pub seller_id: Option<String>,
    pub first_seen_date: NaiveDate,
    pub seller_type: String,
    pub is_confidential: bool,
    pub name: Option<String>,
    pub domain: Option<String>,
}

/// Row destined for `seller_domains`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerDomainRow {
    pub seller_id: Option<String>,
    pub domain: String,
    pub first_detected: NaiveDate,
    pub detection_source: String,
    pub confidence_score: f64,
}

/// Row destined for `daily_snapshots`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SnapshotRow {
    pub snapshot_date: NaiveDate,
    pub total_count: i32,
    pub new_count: i32,
    pub removed_count: i32,
}

// ===== Read models (used by tests and diagnostics) =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StoredSeller {
    pub seller_id: String,
    pub first_seen_date: NaiveDate,
    pub seller_type: String,
    pub is_confidential: bool,
    pub name: Option<String>,
    pub domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StoredSellerDomain {
    pub seller_id: String,
    pub domain: String,
    pub first_detected: NaiveDate,
    pub detection_source: String,
    pub confidence_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seller_type_round_trips_known_values() {
        for kind in [SellerType::Publisher, SellerType::Intermediary, SellerType::Both] {
            assert_eq!(kind.as_str().parse::<SellerType>(), Ok(kind));
        }
        assert_eq!(SellerType::default(), SellerType::Publisher);
        assert!("RESELLER".parse::<SellerType>().is_err());
    }

    #[test]
    fn document_ignores_extra_top_level_keys() {
        let json = r#"{"version":"1.0","contact_email":"a@b.c","sellers":[{"seller_id":"pub-1","extra":true}]}"#;
        let doc: SellersDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.sellers.len(), 1);
        assert_eq!(doc.sellers[0].seller_id.as_deref(), Some("pub-1"));
        assert!(doc.sellers[0].is_confidential.is_none());
    }
}
