//! Process configuration.
//!
//! Built once in `main` and handed to handlers through application state;
//! request handling never reads the environment directly.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{AppError, AppResult};
use crate::models::connection::{Credentials, DbKind};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 7071;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Where `/api/query` takes its connection credentials from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    /// `SQLSERVER`, `SQLDATABASE`, `SQLUSERNAME`, `SQLPASSWORD` at start-up.
    Env,
    /// `server`, `database`, `username`, `password` fields of the JSON body.
    Request,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Env => write!(f, "env"),
            CredentialSource::Request => write!(f, "request"),
        }
    }
}

impl FromStr for CredentialSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "env" | "environment" => Ok(CredentialSource::Env),
            "request" | "body" => Ok(CredentialSource::Request),
            other => Err(AppError::Config(format!("unsupported credential source: {}", other))),
        }
    }
}

/// Credentials read from the environment; any of them may be missing.
#[derive(Clone, Default)]
pub struct EnvCredentials {
    pub server: Option<String>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl EnvCredentials {
    /// Returns complete credentials or the "missing environment variables" error.
    pub fn require(&self) -> AppResult<Credentials> {
        Credentials::from_parts(
            self.server.clone(),
            self.database.clone(),
            self.username.clone(),
            self.password.clone(),
        )
        .ok_or_else(AppError::missing_environment)
    }

    pub fn is_complete(&self) -> bool {
        self.require().is_ok()
    }
}

impl fmt::Debug for EnvCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvCredentials")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .finish()
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    pub db_kind: DbKind,
    /// Port used when the server value carries none.
    pub db_port: Option<u16>,
    pub credential_source: CredentialSource,
    pub credentials: EnvCredentials,
    /// DNS domain appended to route-supplied server names.
    pub server_domain: Option<String>,
    pub trust_server_certificate: bool,
    pub connect_timeout_secs: u64,
    /// Echo the query text in driver error bodies.
    pub include_query_in_errors: bool,
    /// Reject DROP / TRUNCATE / ALTER statements before connecting.
    pub forbid_ddl: bool,
}

impl AppConfig {
    /// Loads configuration from the process environment.
    pub fn load_with_service(service_name: &str) -> AppResult<Self> {
        Self::from_lookup(service_name, |key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(service_name: &str, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let db_kind = match value("DB_KIND") {
            Some(raw) => raw.parse()?,
            None => DbKind::SqlServer,
        };
        let credential_source = match value("CREDENTIAL_SOURCE") {
            Some(raw) => raw.parse()?,
            None => CredentialSource::Env,
        };

        Ok(Self {
            service_name: service_name.to_string(),
            host: value("SERVER_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or("SERVER_PORT", value("SERVER_PORT"), DEFAULT_PORT),
            db_kind,
            db_port: value("SQLPORT").and_then(|v| v.parse().ok()),
            credential_source,
            credentials: EnvCredentials {
                server: value("SQLSERVER"),
                database: value("SQLDATABASE"),
                username: value("SQLUSERNAME"),
                // Passwords keep their surrounding whitespace.
                password: lookup("SQLPASSWORD").filter(|v| !v.trim().is_empty()),
            },
            server_domain: value("SQLSERVER_DOMAIN"),
            trust_server_certificate: flag(value("SQL_TRUST_SERVER_CERTIFICATE")),
            connect_timeout_secs: parse_or(
                "DB_CONNECT_TIMEOUT_SECS",
                value("DB_CONNECT_TIMEOUT_SECS"),
                DEFAULT_CONNECT_TIMEOUT_SECS,
            ),
            include_query_in_errors: flag(value("ERROR_INCLUDE_QUERY")),
            forbid_ddl: flag(value("SQL_FORBID_DDL")),
        })
    }

    /// Port to use when the server value has no explicit one.
    pub fn effective_db_port(&self) -> Option<u16> {
        self.db_port.or_else(|| self.db_kind.default_port())
    }
}

fn parse_or<T: FromStr + Copy + fmt::Display>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = %default, "Invalid value, using default");
            default
        }),
        None => default,
    }
}

fn flag(raw: Option<String>) -> bool {
    matches!(
        raw.as_deref().map(str::to_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

/// Loads a `.env` file from the working directory (best-effort, no error if missing).
///
/// Variables already present in the environment win.
pub fn load_dotenv() {
    let env_path = std::path::Path::new(".env");
    let Ok(content) = std::fs::read_to_string(env_path) else {
        return;
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"');
            if std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> AppResult<AppConfig> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup("sql-trigger", |key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 7071);
        assert_eq!(config.db_kind, DbKind::SqlServer);
        assert_eq!(config.credential_source, CredentialSource::Env);
        assert_eq!(config.connect_timeout_secs, 30);
        assert_eq!(config.effective_db_port(), Some(1433));
        assert!(!config.include_query_in_errors);
        assert!(!config.forbid_ddl);
        assert!(!config.credentials.is_complete());
    }

    #[test]
    fn test_environment_credentials() {
        let config = load(&[
            ("SQLSERVER", "db.example.net"),
            ("SQLDATABASE", "sales"),
            ("SQLUSERNAME", "reporter"),
            ("SQLPASSWORD", " pass word "),
        ])
        .unwrap();
        let credentials = config.credentials.require().unwrap();
        assert_eq!(credentials.server, "db.example.net");
        assert_eq!(credentials.password, " pass word ");
    }

    #[test]
    fn test_missing_environment_credential() {
        let config = load(&[("SQLSERVER", "db"), ("SQLDATABASE", "sales"), ("SQLUSERNAME", "u")])
            .unwrap();
        let err = config.credentials.require().unwrap_err();
        assert!(matches!(err, AppError::Config(ref m) if m == crate::errors::MISSING_ENVIRONMENT));
    }

    #[test]
    fn test_overrides_and_flags() {
        let config = load(&[
            ("SERVER_PORT", "8090"),
            ("DB_KIND", "postgres"),
            ("SQLPORT", "6543"),
            ("CREDENTIAL_SOURCE", "request"),
            ("SQLSERVER_DOMAIN", "database.windows.net"),
            ("ERROR_INCLUDE_QUERY", "TRUE"),
            ("SQL_FORBID_DDL", "1"),
            ("SQL_TRUST_SERVER_CERTIFICATE", "yes"),
        ])
        .unwrap();
        assert_eq!(config.port, 8090);
        assert_eq!(config.db_kind, DbKind::Postgres);
        assert_eq!(config.effective_db_port(), Some(6543));
        assert_eq!(config.credential_source, CredentialSource::Request);
        assert_eq!(config.server_domain.as_deref(), Some("database.windows.net"));
        assert!(config.include_query_in_errors);
        assert!(config.forbid_ddl);
        assert!(config.trust_server_certificate);
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = load(&[("SERVER_PORT", "http"), ("DB_CONNECT_TIMEOUT_SECS", "-1")]).unwrap();
        assert_eq!(config.port, 7071);
        assert_eq!(config.connect_timeout_secs, 30);
    }

    #[test]
    fn test_invalid_enums_are_errors() {
        assert!(load(&[("DB_KIND", "oracle")]).is_err());
        assert!(load(&[("CREDENTIAL_SOURCE", "header")]).is_err());
    }
}
