//! Explicitly leased connection for multi-statement work.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgRow, Postgres};

use super::lease::{LastStatement, Lease};
use super::params::{self, Param};
use crate::errors::AppError;

/// A connection checked out of the pool with [`Database::get_client`].
///
/// Statements run strictly in order on the same session, so `BEGIN` /
/// `COMMIT` work as expected. Call [`release`](Self::release) when done; a
/// client still held after the leak timeout is reported in the logs.
///
/// [`Database::get_client`]: super::Database::get_client
pub struct PooledClient {
    lease: Lease<PoolConnection<Postgres>>,
    last_statement: LastStatement,
}

impl fmt::Debug for PooledClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledClient")
            .field("lease_id", &self.lease.id())
            .field("released", &self.lease.is_released())
            .finish()
    }
}

impl PooledClient {
    pub(crate) fn new(lease_id: u64, conn: PoolConnection<Postgres>, leak_timeout: Duration) -> Self {
        let last_statement: LastStatement = Arc::new(Mutex::new(None));
        Self {
            lease: Lease::new(lease_id, conn, leak_timeout, last_statement.clone()),
            last_statement,
        }
    }

    pub fn lease_id(&self) -> u64 {
        self.lease.id()
    }

    pub fn is_released(&self) -> bool {
        self.lease.is_released()
    }

    /// Whether this client outlived the leak timeout.
    pub fn leak_reported(&self) -> bool {
        self.lease.leak_reported()
    }

    fn record(&self, sql: &str) {
        if let Ok(mut last) = self.last_statement.lock() {
            *last = Some(sql.to_string());
        }
    }

    /// Run a statement and return every row.
    pub async fn query(&mut self, sql: &str, params: &[Param]) -> Result<Vec<PgRow>, AppError> {
        self.record(sql);
        let conn = self.lease.get_mut()?;
        let rows = params::prepare(sql, params).fetch_all(&mut **conn).await?;
        Ok(rows)
    }

    pub async fn query_as<T>(&mut self, sql: &str, params: &[Param]) -> Result<Vec<T>, AppError>
    where
        T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
    {
        self.record(sql);
        let conn = self.lease.get_mut()?;
        let rows = params::prepare_as::<T>(sql, params)
            .fetch_all(&mut **conn)
            .await?;
        Ok(rows)
    }

    /// Run a statement and return the number of affected rows.
    pub async fn execute(&mut self, sql: &str, params: &[Param]) -> Result<u64, AppError> {
        self.record(sql);
        let conn = self.lease.get_mut()?;
        let done = params::prepare(sql, params).execute(&mut **conn).await?;
        Ok(done.rows_affected())
    }

    /// Hand the connection back to the pool and cancel the leak warning.
    /// Fails with [`AppError::ConnectionReleased`] if already released.
    pub fn release(&mut self) -> Result<(), AppError> {
        self.lease.release()?;
        tracing::debug!(lease_id = self.lease.id(), "Client released");
        Ok(())
    }
}
