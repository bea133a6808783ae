use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;

/// The single database connection used by an import run.
///
/// Owned by the coordinator and lent to each stage; closed explicitly at the
/// end of the run on every path.
pub struct DbSession {
    conn: PgConnection,
    options: PgConnectOptions,
    schema: String,
}

impl DbSession {
    pub async fn connect(options: PgConnectOptions, schema: &str) -> Result<Self, sqlx::Error> {
        let conn = PgConnection::connect_with(&options).await?;
        Ok(Self {
            conn,
            options,
            schema: schema.to_string(),
        })
    }

    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.conn
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Replace a broken connection with a fresh one.
    pub async fn reconnect(&mut self) -> Result<(), sqlx::Error> {
        log::warn!("reconnecting to database");
        let fresh = PgConnection::connect_with(&self.options).await?;
        let stale = std::mem::replace(&mut self.conn, fresh);
        // the old connection is most likely dead already
        if let Err(e) = stale.close().await {
            log::debug!("closing stale connection failed: {}", e);
        }
        Ok(())
    }

    /// Names of the target tables absent from the configured schema.
    pub async fn missing_tables(&mut self) -> Result<Vec<String>, sqlx::Error> {
        let expected: Vec<String> = ["sellers", "seller_domains", "daily_snapshots"]
            .iter()
            .map(|name| name.to_string())
            .collect();
        let found: Vec<String> = sqlx::query_scalar(
            "SELECT table_name::text FROM information_schema.tables
             WHERE table_schema::text = $1 AND table_name::text = ANY($2)",
        )
        .bind(&self.schema)
        .bind(&expected)
        .fetch_all(&mut self.conn)
        .await?;

        Ok(expected
            .into_iter()
            .filter(|name| !found.contains(name))
            .collect())
    }

    pub async fn close(self) -> Result<(), sqlx::Error> {
        self.conn.close().await
    }
}
