//! Database driver seam.
//!
//! A [`Connector`] opens one [`Session`] per request. Sessions run every
//! statement inside a transaction; only an explicit [`Session::commit`]
//! makes it durable and [`Session::close`] rolls back anything left open.

pub mod mssql;
pub mod sqlx_backend;

#[cfg(test)]
pub mod fake;

use std::sync::Arc;

use async_trait::async_trait;
use common::config::AppConfig;
use common::models::{Credentials, DbKind, ResultSet};
use thiserror::Error;

pub use mssql::MssqlConnector;
pub use sqlx_backend::SqlxConnector;

/// Opens database sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new connection with the given credentials.
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Session>, DriverError>;
}

/// One open database connection, owned by a single request.
#[async_trait]
pub trait Session: Send {
    /// Executes a write statement and returns the number of affected rows.
    async fn execute(&mut self, sql: &str) -> Result<u64, DriverError>;

    /// Executes a read statement and fetches every row.
    async fn fetch_all(&mut self, sql: &str) -> Result<ResultSet, DriverError>;

    /// Commits the open transaction.
    async fn commit(&mut self) -> Result<(), DriverError>;

    /// Rolls back anything uncommitted and closes the connection.
    async fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// Driver error type
#[derive(Debug, Error)]
pub enum DriverError {
    /// Establishing the connection failed
    #[error("{0}")]
    Connection(String),

    /// A statement failed
    #[error("{0}")]
    Statement(String),

    /// The connection attempt did not finish in time
    #[error("Connection attempt timed out after {0} seconds")]
    Timeout(u64),
}

impl From<sqlx::Error> for DriverError {
    fn from(error: sqlx::Error) -> Self {
        DriverError::Statement(error.to_string())
    }
}

impl From<tiberius::error::Error> for DriverError {
    fn from(error: tiberius::error::Error) -> Self {
        DriverError::Statement(error.to_string())
    }
}

/// Builds the connector for the configured database kind.
pub fn connector_for(config: &AppConfig) -> Arc<dyn Connector> {
    match config.db_kind {
        DbKind::SqlServer => Arc::new(MssqlConnector::new(
            config.effective_db_port().unwrap_or(1433),
            config.trust_server_certificate,
        )),
        kind => Arc::new(SqlxConnector::new(kind, config.effective_db_port())),
    }
}

/// Splits `tcp:host,port`, `host,port` or `host:port` into its parts.
pub(crate) fn split_host_port(server: &str, default_port: u16) -> (String, u16) {
    let server = server.trim();
    let server = server.strip_prefix("tcp:").unwrap_or(server);

    let split = server
        .rsplit_once(',')
        .or_else(|| server.rsplit_once(':').filter(|(host, _)| !host.contains(':')));

    match split {
        Some((host, port)) => match port.trim().parse() {
            Ok(port) => (host.trim().to_string(), port),
            Err(_) => (server.to_string(), default_port),
        },
        None => (server.to_string(), default_port),
    }
}

/// Renders binary values as `0x`-prefixed upper-case hex.
pub(crate) fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for byte in bytes {
        out.push_str(&format!("{:02X}", byte));
    }
    out
}
