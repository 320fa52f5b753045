//! Error taxonomy shared by every handler.
//!
//! All failures are recovered at the handler boundary and turned into a
//! plain-text response by [`AppError::status_and_body`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

pub const MISSING_ENVIRONMENT: &str = "Missing one or more environment variables (SQLSERVER, SQLDATABASE, SQLUSERNAME, SQLPASSWORD).";
pub const MISSING_CONNECTION_PARAMETERS: &str =
    "Missing one or more connection parameters (server, database, username, password).";
pub const MISSING_QUERY: &str = "Please provide a SQL query in the request body or query string.";
pub const MISSING_ROUTE_SQL: &str = "No SQL parameter was provided in the route.";

/// Application error kinds.
#[derive(Debug, Error)]
pub enum AppError {
    /// Required configuration or credential is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The client did not supply a usable request.
    #[error("input error: {0}")]
    Input(String),

    /// Connecting to or executing against the database failed.
    #[error("driver error: {message}")]
    Driver {
        message: String,
        /// Query text echoed back in the response body, when enabled.
        query: Option<String>,
    },
}

impl AppError {
    pub fn missing_environment() -> Self {
        AppError::Config(MISSING_ENVIRONMENT.to_string())
    }

    pub fn missing_connection_parameters() -> Self {
        AppError::Config(MISSING_CONNECTION_PARAMETERS.to_string())
    }

    pub fn missing_query() -> Self {
        AppError::Input(MISSING_QUERY.to_string())
    }

    /// Wraps a driver failure, optionally keeping the query for the body.
    pub fn driver(message: impl Into<String>, query: Option<&str>) -> Self {
        AppError::Driver {
            message: message.into(),
            query: query.map(str::to_string),
        }
    }

    /// Maps the error to its HTTP status and response body.
    pub fn status_and_body(&self) -> (StatusCode, String) {
        match self {
            AppError::Config(message) => (StatusCode::INTERNAL_SERVER_ERROR, message.clone()),
            AppError::Input(message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::Driver { message, query } => {
                let mut body = format!("Error connecting to database: {}", message);
                if let Some(query) = query {
                    body.push_str("\nQuery: ");
                    body.push_str(query);
                }
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Input(message) => tracing::warn!(error = %message, "Rejected request"),
            AppError::Config(message) => tracing::error!(error = %message, "Configuration error"),
            AppError::Driver { message, .. } => tracing::error!(error = %message, "Error occurred"),
        }
        self.status_and_body().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_config_errors_are_server_errors() {
        let (status, body) = AppError::missing_environment().status_and_body();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, MISSING_ENVIRONMENT);
    }

    #[test]
    fn test_missing_query_is_bad_request() {
        let (status, body) = AppError::missing_query().status_and_body();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, MISSING_QUERY);
    }

    #[test]
    fn test_driver_error_body() {
        let (status, body) = AppError::driver("Login failed for user 'sa'.", None).status_and_body();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Error connecting to database: Login failed for user 'sa'.");
    }

    #[test]
    fn test_driver_error_body_with_query() {
        let (_, body) = AppError::driver("Invalid object name 'x'.", Some("SELECT * FROM x"))
            .status_and_body();
        assert_eq!(
            body,
            "Error connecting to database: Invalid object name 'x'.\nQuery: SELECT * FROM x"
        );
    }

    #[tokio::test]
    async fn test_into_response_is_plain_text() {
        let response = AppError::missing_query().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/plain"));
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], MISSING_QUERY.as_bytes());
    }
}
