//! Database connection pool and leased-client utilities.

pub mod client;
pub mod lease;
pub mod params;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::PgPool;

pub use client::PooledClient;
pub use params::Param;

use crate::config::DbConfig;
use crate::errors::AppError;

/// Process-wide connection pool. Construct once with [`Database::init`],
/// clone it into whatever needs it, and call [`Database::shutdown`] before
/// the process exits.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
    leak_timeout: Duration,
    next_lease: Arc<AtomicU64>,
}

impl Database {
    /// Connect eagerly; fails if the server is unreachable.
    pub async fn init(config: &DbConfig) -> Result<Self, AppError> {
        let pool = pool_options(config)
            .connect_with(config.connect_options())
            .await?;
        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.name,
            max_connections = config.max_connections,
            "Database pool established"
        );
        Ok(Self::from_pool(pool, config.leak_timeout))
    }

    /// Build the pool without opening a connection until first use.
    pub fn init_lazy(config: &DbConfig) -> Self {
        let pool = pool_options(config).connect_lazy_with(config.connect_options());
        Self::from_pool(pool, config.leak_timeout)
    }

    pub fn from_pool(pool: PgPool, leak_timeout: Duration) -> Self {
        Self {
            pool,
            leak_timeout,
            next_lease: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn leak_timeout(&self) -> Duration {
        self.leak_timeout
    }

    /// Run one statement on a pooled connection and return its rows. The
    /// connection goes back to the pool whether or not the statement succeeds.
    pub async fn query(&self, sql: &str, params: &[Param]) -> Result<Vec<PgRow>, AppError> {
        params::prepare(sql, params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| statement_failed(sql, e))
    }

    pub async fn query_as<T>(&self, sql: &str, params: &[Param]) -> Result<Vec<T>, AppError>
    where
        T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
    {
        params::prepare_as::<T>(sql, params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| statement_failed(sql, e))
    }

    pub async fn query_optional_as<T>(
        &self,
        sql: &str,
        params: &[Param],
    ) -> Result<Option<T>, AppError>
    where
        T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
    {
        params::prepare_as::<T>(sql, params)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| statement_failed(sql, e))
    }

    /// Run one statement and return the number of affected rows.
    pub async fn execute(&self, sql: &str, params: &[Param]) -> Result<u64, AppError> {
        params::prepare(sql, params)
            .execute(&self.pool)
            .await
            .map(|done| done.rows_affected())
            .map_err(|e| statement_failed(sql, e))
    }

    /// Lease a connection for multi-statement work. The caller must
    /// `release()` it; holding it past the leak timeout logs a warning.
    pub async fn get_client(&self) -> Result<PooledClient, AppError> {
        let conn = self.pool.acquire().await?;
        let lease_id = self.next_lease.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(lease_id, "Client checked out");
        Ok(PooledClient::new(lease_id, conn, self.leak_timeout))
    }

    /// Readiness check.
    pub async fn ping(&self) -> Result<(), AppError> {
        self.execute("SELECT 1", &[]).await.map(|_| ())
    }

    /// Close every connection. Acquisitions after this fail.
    pub async fn shutdown(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

fn pool_options(config: &DbConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
}

fn statement_failed(sql: &str, e: sqlx::Error) -> AppError {
    tracing::debug!(error = %e, statement = sql, "Statement failed");
    AppError::Database(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> DbConfig {
        let mut config = DbConfig::from_lookup(|_| None);
        config.host = "127.0.0.1".to_string();
        config.port = 1;
        config.acquire_timeout = Duration::from_millis(500);
        config
    }

    #[tokio::test]
    async fn lazy_pool_reports_unreachable_server() {
        let db = Database::init_lazy(&unreachable_config());
        let result = db.query("SELECT 1", &[]).await;
        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(db.get_client().await.is_err());
    }

    #[tokio::test]
    async fn shutdown_closes_pool() {
        let db = Database::init_lazy(&unreachable_config());
        assert!(!db.is_closed());
        db.shutdown().await;
        assert!(db.is_closed());
        assert!(db.ping().await.is_err());
    }

    #[tokio::test]
    async fn eager_init_fails_fast() {
        assert!(Database::init(&unreachable_config()).await.is_err());
    }

    #[tokio::test]
    async fn clones_share_lease_counter() {
        let db = Database::init_lazy(&unreachable_config());
        let other = db.clone();
        db.next_lease.fetch_add(5, Ordering::Relaxed);
        assert_eq!(other.next_lease.load(Ordering::Relaxed), 6);
        assert_eq!(other.leak_timeout(), Duration::from_millis(5000));
    }
}
