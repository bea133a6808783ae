//! sellers.json loading.
//!
//! Reads the document from disk or over HTTP, optionally gunzips it, and
//! returns the entries of its top-level `sellers` array. Any failure here is
//! fatal for the run.

use crate::config::SellersSource;
use crate::error::LoadError;
use crate::models::{RawSeller, SellersDocument};
use flate2::read::GzDecoder;
use serde_json::Value;
use std::io::Read;
use std::path::Path;

pub async fn load_sellers(source: &SellersSource) -> Result<Vec<RawSeller>, LoadError> {
    let origin = source.to_string();

    let bytes = match source {
        SellersSource::File(path) => read_file(path).await?,
        SellersSource::Url(url) => download(url).await?,
    };

    let bytes = if source.is_gzip() {
        gunzip(&bytes, &origin)?
    } else {
        bytes
    };

    parse_sellers(&bytes, &origin)
}

async fn read_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    log::info!("reading {}", path.display());
    tokio::fs::read(path).await.map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

async fn download(url: &str) -> Result<Vec<u8>, LoadError> {
    log::info!("downloading {}", url);
    let wrap = |source| LoadError::Download {
        url: url.to_string(),
        source,
    };

    let response = reqwest::get(url)
        .await
        .map_err(wrap)?
        .error_for_status()
        .map_err(wrap)?;
    let bytes = response.bytes().await.map_err(wrap)?;

    log::debug!("downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

fn gunzip(bytes: &[u8], origin: &str) -> Result<Vec<u8>, LoadError> {
    log::debug!("decompressing {} ({} bytes)", origin, bytes.len());
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|source| LoadError::Decompress {
            origin: origin.to_string(),
            source,
        })?;
    Ok(out)
}

/// Parse a sellers.json payload. `origin` only labels errors.
pub fn parse_sellers(bytes: &[u8], origin: &str) -> Result<Vec<RawSeller>, LoadError> {
    let json_error = |source| LoadError::Json {
        origin: origin.to_string(),
        source,
    };

    let value: Value = serde_json::from_slice(bytes).map_err(json_error)?;
    if !matches!(value.get("sellers"), Some(Value::Array(_))) {
        return Err(LoadError::MissingSellers {
            origin: origin.to_string(),
        });
    }

    let document: SellersDocument = serde_json::from_value(value).map_err(json_error)?;
    log::info!("loaded {} sellers", document.sellers.len());
    Ok(document.sellers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn parses_sellers_array() {
        let json = br#"{"sellers":[{"seller_id":"s1","domain":"example.com"},{"seller_id":"s2","is_confidential":1}]}"#;
        let sellers = parse_sellers(json, "inline").unwrap();
        assert_eq!(sellers.len(), 2);
        assert_eq!(sellers[0].domain.as_deref(), Some("example.com"));
        assert_eq!(sellers[1].is_confidential, Some(Value::from(1)));
    }

    #[test]
    fn empty_array_is_valid() {
        assert!(parse_sellers(br#"{"sellers":[]}"#, "inline").unwrap().is_empty());
    }

    #[test]
    fn missing_key_is_an_error() {
        let err = parse_sellers(br#"{"publishers":[]}"#, "inline").unwrap_err();
        assert!(matches!(err, LoadError::MissingSellers { .. }));

        let err = parse_sellers(br#"{"sellers":{"seller_id":"s1"}}"#, "inline").unwrap_err();
        assert!(matches!(err, LoadError::MissingSellers { .. }));

        let err = parse_sellers(br#"[1,2,3]"#, "inline").unwrap_err();
        assert!(matches!(err, LoadError::MissingSellers { .. }));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = parse_sellers(br#"{"sellers":[{"seller_id":"#, "inline").unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let source = SellersSource::File(PathBuf::from("/nonexistent/dir/sellers.json"));
        let err = load_sellers(&source).await.unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
    }

    #[tokio::test]
    async fn reads_plain_and_gzipped_files() {
        let dir = tempfile::tempdir().unwrap();
        let body = br#"{"sellers":[{"seller_id":"pub-1"}]}"#;

        let plain = dir.path().join("sellers.json");
        std::fs::write(&plain, body).unwrap();
        let sellers = load_sellers(&SellersSource::File(plain)).await.unwrap();
        assert_eq!(sellers[0].seller_id.as_deref(), Some("pub-1"));

        let gz = dir.path().join("sellers.json.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(body).unwrap();
        std::fs::write(&gz, encoder.finish().unwrap()).unwrap();
        let sellers = load_sellers(&SellersSource::File(gz)).await.unwrap();
        assert_eq!(sellers.len(), 1);
    }
}
