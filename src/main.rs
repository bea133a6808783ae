use std::error::Error;
use std::process::ExitCode;

use clap::Parser;

use sellers_importer::cli::CliArgs;
use sellers_importer::config::ImportConfig;
use sellers_importer::error::ImportResult;
use sellers_importer::import::{ImportStats, SellersImporter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    sellers_importer::init_logger();

    let args = CliArgs::parse();
    let result = run(args).await;

    ExitCode::from(exit_status(&result))
}

async fn run(args: CliArgs) -> ImportResult<ImportStats> {
    let config = args.apply(ImportConfig::from_env()?)?;
    SellersImporter::new(config).run().await
}

/// 0 once the run completes, failed batches included; 1 on a fatal error.
fn exit_status(result: &ImportResult<ImportStats>) -> u8 {
    match result {
        Ok(stats) => {
            if stats.has_failures() {
                log::warn!("import finished with failed batches; see errors above");
            }
            0
        }
        Err(err) => {
            log::error!("fatal error: {}", err);
            let mut source = err.source();
            while let Some(cause) = source {
                log::error!("  caused by: {}", cause);
                source = cause.source();
            }
            log::debug!("{:?}", err);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sellers_importer::error::{ConfigError, ImportError, LoadError};

    #[test]
    fn completed_runs_exit_zero_even_with_failures() {
        assert_eq!(exit_status(&Ok(ImportStats::default())), 0);

        let mut stats = ImportStats::default();
        stats.sellers.failed_batches.push(2);
        stats.snapshot_recorded = false;
        assert!(stats.has_failures());
        assert_eq!(exit_status(&Ok(stats)), 0);
    }

    #[test]
    fn fatal_errors_exit_one() {
        assert_eq!(
            exit_status(&Err(ImportError::Config(ConfigError::ZeroBatchSize))),
            1
        );
        assert_eq!(
            exit_status(&Err(ImportError::Load(LoadError::MissingSellers {
                origin: "/tmp/sellers.json".to_string(),
            }))),
            1
        );
        assert_eq!(exit_status(&Err(ImportError::Database(sqlx::Error::PoolClosed))), 1);
    }
}
