use std::path::PathBuf;
use thiserror::Error;

/// Invalid or missing configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("batch size must be greater than zero")]
    ZeroBatchSize,
    #[error("schema name '{0}' is not a plain SQL identifier")]
    InvalidSchema(String),
}

impl ConfigError {
    pub fn invalid(key: &'static str, value: impl Into<String>, reason: impl ToString) -> Self {
        ConfigError::InvalidValue {
            key,
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failures while reading the sellers.json document. Always fatal.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to download {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decompress {origin}: {source}")]
    Decompress {
        origin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON in {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{origin} has no top-level \"sellers\" array")]
    MissingSellers { origin: String },
}

/// Errors that abort an import run.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type ImportResult<T> = Result<T, ImportError>;
