pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;

use env_logger::Env;
use std::sync::Once;

static LOGGER: Once = Once::new();

/// Initialise `env_logger` once; `RUST_LOG` overrides the default `info`.
pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info,sqlx=warn"))
            .format_timestamp(None)
            .init();
    });
}

pub mod test_support {
    use crate::models::{SnapshotRow, StoredSeller, StoredSellerDomain};
    use chrono::NaiveDate;
    use sqlx::PgPool;

    pub use database::{TestDatabase, TestDatabaseError};

    /// Read helpers for asserting on the seller_adsense tables.
    pub struct TestFixtures<'a> {
        pool: &'a PgPool,
    }

    impl<'a> TestFixtures<'a> {
        /// Create a fixture helper bound to the provided pool.
        pub fn new(pool: &'a PgPool) -> Self {
            Self { pool }
        }

        pub async fn sellers(&self) -> Result<Vec<StoredSeller>, sqlx::Error> {
            sqlx::query_as(
                "SELECT seller_id, first_seen_date, seller_type, is_confidential, name, domain
                 FROM seller_adsense.sellers ORDER BY seller_id",
            )
            .fetch_all(self.pool)
            .await
        }

        pub async fn seller_domains(&self) -> Result<Vec<StoredSellerDomain>, sqlx::Error> {
            sqlx::query_as(
                "SELECT seller_id, domain, first_detected, detection_source, confidence_score
                 FROM seller_adsense.seller_domains ORDER BY seller_id, domain",
            )
            .fetch_all(self.pool)
            .await
        }

        pub async fn snapshot(&self, date: NaiveDate) -> Result<Option<SnapshotRow>, sqlx::Error> {
            sqlx::query_as(
                "SELECT snapshot_date, total_count, new_count, removed_count
                 FROM seller_adsense.daily_snapshots WHERE snapshot_date = $1",
            )
            .bind(date)
            .fetch_optional(self.pool)
            .await
        }

        pub async fn count(&self, table: &str) -> Result<i64, sqlx::Error> {
            let sql = format!("SELECT COUNT(*) FROM seller_adsense.{}", table);
            sqlx::query_scalar(&sql).fetch_one(self.pool).await
        }

        /// Insert a seller directly, bypassing the importer.
        pub async fn insert_seller(
            &self,
            seller_id: &str,
            first_seen: NaiveDate,
            name: Option<&str>,
        ) -> Result<(), sqlx::Error> {
            sqlx::query(
                "INSERT INTO seller_adsense.sellers (seller_id, first_seen_date, seller_type, is_confidential, name)
                 VALUES ($1, $2, 'PUBLISHER', false, $3)",
            )
            .bind(seller_id)
            .bind(first_seen)
            .bind(name)
            .execute(self.pool)
            .await?;
            Ok(())
        }

        /// Insert a domain row directly, bypassing the importer.
        pub async fn insert_domain(
            &self,
            seller_id: &str,
            domain: &str,
            first_detected: NaiveDate,
            source: &str,
            confidence: f64,
        ) -> Result<(), sqlx::Error> {
            sqlx::query(
                "INSERT INTO seller_adsense.seller_domains (seller_id, domain, first_detected, detection_source, confidence_score)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(seller_id)
            .bind(domain)
            .bind(first_detected)
            .bind(source)
            .bind(confidence)
            .execute(self.pool)
            .await?;
            Ok(())
        }
    }

    pub mod database {
        use crate::db::DbSession;
        use log::LevelFilter;
        use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
        use sqlx::{ConnectOptions, Executor, PgPool};
        use testcontainers::{GenericImage, ImageExt, core::WaitFor};
        use testcontainers_modules::testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;
        use tokio::runtime::Handle;
        use uuid::Uuid;

        static SCHEMA_SQL: &str = include_str!("../sql/seller_adsense.sql");

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        impl TestDatabaseError {
            /// True when no Postgres could be provisioned at all (no Docker,
            /// unreachable TEST_DATABASE_URL); tests skip in that case.
            pub fn is_unavailable(&self) -> bool {
                matches!(
                    self,
                    TestDatabaseError::Container(_)
                        | TestDatabaseError::Sqlx(sqlx::Error::Io(_))
                        | TestDatabaseError::Sqlx(sqlx::Error::PoolTimedOut)
                )
            }
        }

        /// Ephemeral database with the seller_adsense tables, for integration tests.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            options: PgConnectOptions,
            admin_options: PgConnectOptions,
            database_name: String,
            database_url: String,
            container: Option<ContainerAsync<GenericImage>>,
        }

        impl TestDatabase {
            /// Use `TEST_DATABASE_URL` when set, otherwise launch a disposable
            /// Postgres container.
            pub async fn new_from_env() -> Result<Self, TestDatabaseError> {
                match std::env::var("TEST_DATABASE_URL") {
                    Ok(url) if !url.trim().is_empty() => Self::with_admin_url(&url, None).await,
                    _ => Self::new().await,
                }
            }

            pub async fn new() -> Result<Self, TestDatabaseError> {
                let image = GenericImage::new("postgres", "16-alpine")
                    .with_wait_for(WaitFor::message_on_stdout(
                        "database system is ready to accept connections",
                    ))
                    .with_wait_for(WaitFor::message_on_stderr(
                        "database system is ready to accept connections",
                    ));

                let request = image
                    .with_env_var("POSTGRES_DB", "postgres")
                    .with_env_var("POSTGRES_USER", "postgres")
                    .with_env_var("POSTGRES_PASSWORD", "postgres");

                let container = request.start().await?;

                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let admin_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

                Self::with_admin_url(&admin_url, Some(container)).await
            }

            async fn with_admin_url(
                admin_url: &str,
                container: Option<ContainerAsync<GenericImage>>,
            ) -> Result<Self, TestDatabaseError> {
                let base_options: PgConnectOptions =
                    admin_url.parse().map_err(TestDatabaseError::Sqlx)?;
                let base_options = base_options.log_statements(LevelFilter::Off);

                let base_name = base_options
                    .get_database()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "postgres".to_string());

                let admin_options = base_options.clone();
                let admin_pool = PgPoolOptions::new()
                    .max_connections(1)
                    .connect_with(admin_options.clone())
                    .await?;

                let new_db_name = format!("{}_{}", base_name, Uuid::new_v4().simple());
                let create_sql = format!("CREATE DATABASE \"{}\" TEMPLATE template0", new_db_name);
                sqlx::query(&create_sql).execute(&admin_pool).await?;
                admin_pool.close().await;

                let mut database_url = reqwest::Url::parse(admin_url)
                    .map_err(|err| TestDatabaseError::Sqlx(sqlx::Error::Configuration(err.into())))?;
                database_url.set_path(&new_db_name);

                let options = base_options.database(&new_db_name);
                let pool = PgPoolOptions::new()
                    .max_connections(2)
                    .connect_with(options.clone())
                    .await?;

                pool.execute(SCHEMA_SQL).await?;

                Ok(Self {
                    pool: Some(pool),
                    options,
                    admin_options,
                    database_name: new_db_name,
                    database_url: database_url.to_string(),
                    container,
                })
            }

            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            /// Connection options pointing at the ephemeral database.
            pub fn connect_options(&self) -> PgConnectOptions {
                self.options.clone()
            }

            /// Connection URL of the ephemeral database, for configuring the importer.
            pub fn database_url(&self) -> &str {
                &self.database_url
            }

            /// Open an importer session on the ephemeral database.
            pub async fn session(&self) -> Result<DbSession, TestDatabaseError> {
                Ok(DbSession::connect(self.connect_options(), "seller_adsense").await?)
            }

            /// Close pool connections and drop the ephemeral database.
            pub async fn close(mut self) -> Result<(), TestDatabaseError> {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }

                drop_database(self.admin_options.clone(), &self.database_name).await?;

                if let Some(container) = self.container.take() {
                    drop(container);
                }

                Ok(())
            }
        }

        async fn drop_database(
            admin_options: PgConnectOptions,
            database_name: &str,
        ) -> Result<(), sqlx::Error> {
            let admin_pool = PgPoolOptions::new()
                .max_connections(1)
                .connect_with(admin_options)
                .await?;

            let drop_sql = format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", database_name);
            sqlx::query(&drop_sql).execute(&admin_pool).await?;
            admin_pool.close().await;
            Ok(())
        }

        impl Drop for TestDatabase {
            fn drop(&mut self) {
                if let Some(pool) = self.pool.take() {
                    let admin_options = self.admin_options.clone();
                    let db_name = self.database_name.clone();
                    if let Ok(handle) = Handle::try_current() {
                        handle.spawn(async move {
                            pool.close().await;
                            let _ = drop_database(admin_options, &db_name).await;
                        });
                    }
                }

                if let Some(container) = self.container.take() {
                    drop(container);
                }
            }
        }
    }
}
