//! Connection models.
//!
//! Contains the database kinds the service can talk to and the
//! credentials needed to open a connection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::errors::AppError;

/// Database type enumeration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DbKind {
    /// Microsoft SQL Server / Azure SQL Database.
    #[serde(rename = "mssql")]
    SqlServer,
    /// PostgreSQL database.
    Postgres,
    /// MySQL or MariaDB database.
    MySql,
    /// SQLite database file.
    Sqlite,
}

impl DbKind {
    /// Returns the default port for this database type.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            DbKind::SqlServer => Some(1433),
            DbKind::Postgres => Some(5432),
            DbKind::MySql => Some(3306),
            DbKind::Sqlite => None,
        }
    }
}

impl fmt::Display for DbKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbKind::SqlServer => write!(f, "mssql"),
            DbKind::Postgres => write!(f, "postgres"),
            DbKind::MySql => write!(f, "mysql"),
            DbKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for DbKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mssql" | "sqlserver" | "azuresql" => Ok(DbKind::SqlServer),
            "postgres" | "postgresql" => Ok(DbKind::Postgres),
            "mysql" | "mariadb" => Ok(DbKind::MySql),
            "sqlite" => Ok(DbKind::Sqlite),
            other => Err(AppError::Config(format!("unsupported database kind: {}", other))),
        }
    }
}

/// Everything needed to open one connection.
///
/// Deserializes straight from the `/{server}/{database}/{username}/{password}`
/// route segments.
#[derive(Clone, Deserialize, Validate, ToSchema)]
pub struct Credentials {
    /// Database host, optionally with a `,port` or `:port` suffix.
    #[validate(custom(function = "not_blank"))]
    pub server: String,
    /// Database name (file path for SQLite).
    #[validate(custom(function = "not_blank"))]
    pub database: String,
    #[validate(custom(function = "not_blank"))]
    pub username: String,
    #[validate(custom(function = "not_blank"))]
    pub password: String,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

impl Credentials {
    /// Builds credentials when every part is present and non-blank.
    pub fn from_parts(
        server: Option<String>,
        database: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Option<Self> {
        let credentials = Self {
            server: server?,
            database: database?,
            username: username?,
            password: password?,
        };
        credentials.validate().ok().map(|_| credentials)
    }

    /// Appends `.{domain}` to the server unless it already carries it as a
    /// whole label suffix (host names compare case-insensitively).
    pub fn with_server_domain(mut self, domain: Option<&str>) -> Self {
        if let Some(domain) = domain.map(|d| d.trim_start_matches('.')).filter(|d| !d.is_empty()) {
            let server = self.server.to_ascii_lowercase();
            let domain_lower = domain.to_ascii_lowercase();
            let suffixed = server == domain_lower || server.ends_with(&format!(".{}", domain_lower));
            if !suffixed {
                self.server = format!("{}.{}", self.server, domain);
            }
        }
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}
