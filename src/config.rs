use crate::error::ConfigError;
use crate::import::retry::RetryPolicy;
use chrono::{Local, NaiveDate};
use log::LevelFilter;
use regex::Regex;
use sqlx::ConnectOptions;
use sqlx::postgres::PgConnectOptions;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_SOURCE: &str = "/tmp/sellers.json";
pub const GOOGLE_SELLERS_JSON_URL: &str =
    "https://storage.googleapis.com/adx-rtb-dictionaries/sellers.json";
pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_SCHEMA: &str = "seller_adsense";

static IDENTIFIER_REGEX: OnceLock<Regex> = OnceLock::new();

fn identifier_regex() -> &'static Regex {
    IDENTIFIER_REGEX
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("invalid identifier regex"))
}

fn var_string(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn var_parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|err| ConfigError::invalid(key, raw.clone(), err)),
        None => Ok(default),
    }
}

/// Where the sellers.json document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SellersSource {
    File(PathBuf),
    Url(String),
}

impl SellersSource {
    /// `http://` and `https://` values are URLs, anything else is a path.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            SellersSource::Url(trimmed.to_string())
        } else {
            SellersSource::File(PathBuf::from(trimmed))
        }
    }

    pub fn is_gzip(&self) -> bool {
        match self {
            SellersSource::File(path) => path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("gz"))
                .unwrap_or(false),
            SellersSource::Url(url) => url.to_ascii_lowercase().ends_with(".gz"),
        }
    }
}

impl fmt::Display for SellersSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SellersSource::File(path) => write!(f, "{}", path.display()),
            SellersSource::Url(url) => f.write_str(url),
        }
    }
}

/// Connection target for the seller_adsense tables.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Full connection URL; takes precedence over the discrete fields.
    pub url: Option<String>,
    pub schema: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("schema", &self.schema)
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 54322,
            database: "postgres".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            url: None,
            schema: DEFAULT_SCHEMA.to_string(),
        }
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        let options = match &self.url {
            Some(url) => url
                .parse::<PgConnectOptions>()
                .map_err(|err| ConfigError::invalid("DATABASE_URL", "<redacted>", err))?,
            None => PgConnectOptions::new()
                .host(&self.host)
                .port(self.port)
                .database(&self.database)
                .username(&self.user)
                .password(&self.password),
        };

        Ok(options.log_statements(LevelFilter::Trace))
    }

    /// Human-readable target without credentials.
    pub fn describe(&self) -> String {
        match &self.url {
            Some(_) => "DATABASE_URL".to_string(),
            None => format!("{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

/// Everything one import run needs, supplied at startup.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub source: SellersSource,
    pub database: DatabaseConfig,
    pub batch_size: usize,
    pub run_date: NaiveDate,
    pub retry: RetryPolicy,
    pub dry_run: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            source: SellersSource::parse(DEFAULT_SOURCE),
            database: DatabaseConfig::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            run_date: Local::now().date_naive(),
            retry: RetryPolicy::default(),
            dry_run: false,
        }
    }
}

impl ImportConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let db_defaults = defaults.database;

        let database = DatabaseConfig {
            host: var_string(&lookup, "SELLERS_DB_HOST", &db_defaults.host),
            port: var_parsed(&lookup, "SELLERS_DB_PORT", db_defaults.port)?,
            database: var_string(&lookup, "SELLERS_DB_NAME", &db_defaults.database),
            user: var_string(&lookup, "SELLERS_DB_USER", &db_defaults.user),
            password: var_string(&lookup, "SELLERS_DB_PASSWORD", &db_defaults.password),
            url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            schema: var_string(&lookup, "SELLERS_DB_SCHEMA", &db_defaults.schema),
        };

        let retry = RetryPolicy {
            max_retries: var_parsed(&lookup, "SELLERS_MAX_RETRIES", defaults.retry.max_retries)?,
            base_delay: Duration::from_millis(var_parsed(
                &lookup,
                "SELLERS_RETRY_BACKOFF_MS",
                defaults.retry.base_delay.as_millis() as u64,
            )?),
        };

        let config = Self {
            source: lookup("SELLERS_SOURCE")
                .map(|value| SellersSource::parse(&value))
                .unwrap_or(defaults.source),
            database,
            batch_size: var_parsed(&lookup, "SELLERS_BATCH_SIZE", defaults.batch_size)?,
            run_date: var_parsed(&lookup, "SELLERS_RUN_DATE", defaults.run_date)?,
            retry,
            dry_run: false,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if !identifier_regex().is_match(&self.database.schema) {
            return Err(ConfigError::InvalidSchema(self.database.schema.clone()));
        }
        Ok(())
    }
}
