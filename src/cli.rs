use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::config::{ImportConfig, SellersSource};
use crate::error::ConfigError;

#[derive(Parser, Debug, Default)]
#[command(
    name = "import_sellers",
    about = "Load a sellers.json document into the seller_adsense tables"
)]
pub struct CliArgs {
    /// Path or http(s) URL of the sellers.json document.
    #[arg(long)]
    pub source: Option<String>,

    /// Shortcut for `--source` pointing at a local file.
    #[arg(long, conflicts_with = "source")]
    pub file: Option<PathBuf>,

    /// Full Postgres connection URL; overrides the discrete connection flags.
    #[arg(long)]
    pub database_url: Option<String>,

    #[arg(long)]
    pub db_host: Option<String>,

    #[arg(long)]
    pub db_port: Option<u16>,

    #[arg(long)]
    pub db_name: Option<String>,

    #[arg(long)]
    pub db_user: Option<String>,

    /// Schema holding the sellers, seller_domains and daily_snapshots tables.
    #[arg(long)]
    pub schema: Option<String>,

    /// Rows per write transaction.
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Date recorded as first-seen/snapshot date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub run_date: Option<NaiveDate>,

    /// Retries for batches failing with a transient error. 0 disables retries.
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Load and transform only; never connect to the database.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Apply flags on top of an environment-derived configuration.
    pub fn apply(self, mut config: ImportConfig) -> Result<ImportConfig, ConfigError> {
        if let Some(source) = self.source {
            config.source = SellersSource::parse(&source);
        }
        if let Some(file) = self.file {
            config.source = SellersSource::File(file);
        }
        if let Some(url) = self.database_url {
            config.database.url = Some(url);
        }
        if let Some(host) = self.db_host {
            config.database.host = host;
        }
        if let Some(port) = self.db_port {
            config.database.port = port;
        }
        if let Some(name) = self.db_name {
            config.database.database = name;
        }
        if let Some(user) = self.db_user {
            config.database.user = user;
        }
        if let Some(schema) = self.schema {
            config.database.schema = schema;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(run_date) = self.run_date {
            config.run_date = run_date;
        }
        if let Some(max_retries) = self.max_retries {
            config.retry.max_retries = max_retries;
        }
        config.dry_run = self.dry_run;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_configuration() {
        let args = CliArgs::try_parse_from([
            "import_sellers",
            "--file",
            "/data/sellers.json",
            "--batch-size",
            "500",
            "--run-date",
            "2025-02-03",
            "--schema",
            "staging",
            "--dry-run",
        ])
        .unwrap();

        let config = args.apply(ImportConfig::default()).unwrap();
        assert_eq!(config.source, SellersSource::File(PathBuf::from("/data/sellers.json")));
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.run_date, NaiveDate::from_ymd_opt(2025, 2, 3).unwrap());
        assert_eq!(config.database.schema, "staging");
        assert!(config.dry_run);
    }

    #[test]
    fn no_flags_keep_configuration() {
        let args = CliArgs::try_parse_from(["import_sellers"]).unwrap();
        let base = ImportConfig::default();
        let config = args.apply(base.clone()).unwrap();
        assert_eq!(config.source, base.source);
        assert_eq!(config.batch_size, base.batch_size);
        assert_eq!(config.database.port, base.database.port);
    }

    #[test]
    fn url_source_and_bad_values() {
        let args = CliArgs::try_parse_from([
            "import_sellers",
            "--source",
            crate::config::GOOGLE_SELLERS_JSON_URL,
        ])
        .unwrap();
        let config = args.apply(ImportConfig::default()).unwrap();
        assert!(matches!(config.source, SellersSource::Url(_)));

        assert!(CliArgs::try_parse_from(["import_sellers", "--run-date", "yesterday"]).is_err());
        assert!(
            CliArgs::try_parse_from(["import_sellers", "--source", "a", "--file", "b"]).is_err()
        );

        let args = CliArgs::try_parse_from(["import_sellers", "--batch-size", "0"]).unwrap();
        assert!(matches!(
            args.apply(ImportConfig::default()),
            Err(ConfigError::ZeroBatchSize)
        ));
    }
}
