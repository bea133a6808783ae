//! Import coordination.
//!
//! The SellersImporter runs the fixed pipeline:
//! 1. Connect
//! 2. Load sellers.json
//! 3. Transform into seller and domain rows
//! 4. Upsert sellers in batches
//! 5. Record the daily snapshot
//! 6. Insert domains in batches
//! 7. Close the connection (on every path)

use crate::config::ImportConfig;
use crate::db::DbSession;
use crate::error::ImportResult;
use crate::import::batch_writer::BatchWriter;
use crate::import::data_builder;
use crate::import::loader;
use crate::import::snapshot::{record_snapshot, snapshot_for_run};
use crate::import::stats::ImportStats;
use crate::models::RawSeller;

pub struct SellersImporter {
    config: ImportConfig,
}

impl SellersImporter {
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Run a complete import. Only configuration, connection and load
    /// failures are returned as errors; batch and snapshot failures are
    /// reported in the stats.
    pub async fn run(&self) -> ImportResult<ImportStats> {
        self.config.validate()?;

        if self.config.dry_run {
            return self.dry_run().await;
        }

        log::info!(
            "starting sellers.json import from {} into {} (schema {})",
            self.config.source,
            self.config.database.describe(),
            self.config.database.schema
        );

        let options = self.config.database.connect_options()?;
        let mut session = DbSession::connect(options, &self.config.database.schema).await?;

        let result = self.run_with_session(&mut session).await;

        if let Err(e) = session.close().await {
            log::warn!("failed to close database connection: {}", e);
        }

        result
    }

    /// Load, transform and write using an already open session. The caller
    /// owns the session and is responsible for closing it.
    pub async fn run_with_session(&self, session: &mut DbSession) -> ImportResult<ImportStats> {
        match session.missing_tables().await {
            Ok(missing) if !missing.is_empty() => log::warn!(
                "schema {} is missing tables: {}; writes to them will fail",
                session.schema(),
                missing.join(", ")
            ),
            Ok(_) => {}
            Err(e) => log::warn!("could not inspect schema {}: {}", session.schema(), e),
        }

        let raw = loader::load_sellers(&self.config.source).await?;
        Ok(self.import_records(session, &raw).await)
    }

    /// Transform and write already loaded entries.
    pub async fn import_records(&self, session: &mut DbSession, raw: &[RawSeller]) -> ImportStats {
        let run_date = self.config.run_date;
        let transformed = data_builder::build_rows(raw, run_date);

        let mut writer = BatchWriter::new(session, self.config.batch_size, self.config.retry);

        let sellers = writer.write_all("sellers", &transformed.sellers).await;
        log::info!(
            "sellers import complete: inserted {} of {} ({} failed batches)",
            sellers.rows_written,
            sellers.total_rows,
            sellers.failed_batches.len()
        );

        let snapshot = snapshot_for_run(run_date, transformed.sellers.len());
        let snapshot_recorded = record_snapshot(&mut writer, &snapshot).await;

        log::info!("inserting {} domains", transformed.domains.len());
        let domains = writer.write_all("domains", &transformed.domains).await;

        let stats = ImportStats {
            loaded: raw.len(),
            transform: transformed.summary,
            sellers,
            snapshot_recorded,
            domains,
        };

        log::info!("all done");
        for line in stats.to_string().lines() {
            log::info!("{}", line);
        }

        stats
    }

    /// Load and transform without touching the database.
    async fn dry_run(&self) -> ImportResult<ImportStats> {
        log::info!("dry run: reading {} without writing", self.config.source);

        let raw = loader::load_sellers(&self.config.source).await?;
        let transformed = data_builder::build_rows(&raw, self.config.run_date);

        log::info!(
            "dry run: {} seller rows, {} domain rows, {} entries without seller_id, {} unknown seller types",
            transformed.summary.seller_rows,
            transformed.summary.domain_rows,
            transformed.summary.missing_seller_id,
            transformed.summary.unknown_seller_type
        );

        Ok(ImportStats {
            loaded: raw.len(),
            transform: transformed.summary,
            snapshot_recorded: false,
            ..ImportStats::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SellersSource;

    #[tokio::test]
    async fn dry_run_never_connects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sellers.json");
        std::fs::write(
            &path,
            r#"{"sellers":[{"seller_id":"s1","domain":"example.com"},{"seller_id":"s2","is_confidential":1}]}"#,
        )
        .unwrap();

        let mut config = ImportConfig::default();
        config.source = SellersSource::File(path);
        config.dry_run = true;
        // unreachable on purpose: a dry run must not open a connection
        config.database.port = 1;

        let stats = SellersImporter::new(config).run().await.unwrap();
        assert_eq!(stats.loaded, 2);
        assert_eq!(stats.transform.seller_rows, 2);
        assert_eq!(stats.transform.domain_rows, 1);
        assert_eq!(stats.sellers.batches, 0);
    }

    #[tokio::test]
    async fn invalid_config_fails_before_connecting() {
        let mut config = ImportConfig::default();
        config.batch_size = 0;
        let err = SellersImporter::new(config).run().await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::ImportError::Config(crate::error::ConfigError::ZeroBatchSize)
        ));
    }
}
