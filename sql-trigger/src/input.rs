//! Request input resolution.
//!
//! The body is read leniently: a JSON object supplies `query` (and, in
//! request mode, the credentials); anything else makes the handler fall
//! back to the `query` URL parameter.

use axum::extract::Query;
use axum::http::Uri;
use serde_json::{Map, Value};

use common::config::{AppConfig, CredentialSource};
use common::errors::{AppError, AppResult};
use common::models::{Credentials, QueryParams};

/// Parsed request body.
#[derive(Debug)]
pub enum RequestBody {
    /// The body was a JSON object.
    Object(Map<String, Value>),
    /// Empty, not JSON, or JSON that is not an object.
    Unusable,
}

impl RequestBody {
    pub fn parse(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => RequestBody::Object(map),
            _ => RequestBody::Unusable,
        }
    }

    /// Returns a non-blank string field of the body.
    pub fn field(&self, name: &str) -> Option<String> {
        match self {
            RequestBody::Object(map) => map
                .get(name)
                .and_then(Value::as_str)
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string),
            RequestBody::Unusable => None,
        }
    }

    /// Connection credentials carried by the body.
    pub fn credentials(&self) -> AppResult<Credentials> {
        Credentials::from_parts(
            self.field("server"),
            self.field("database"),
            self.field("username"),
            self.field("password"),
        )
        .ok_or_else(AppError::missing_connection_parameters)
    }
}

/// Picks the query: the body's `query` field when the body is a JSON object,
/// the `query` URL parameter otherwise. The URL is only read in the second
/// case, so a malformed query string never hides a usable body.
pub fn resolve_query(body: &RequestBody, uri: &Uri) -> AppResult<String> {
    let query = match body {
        RequestBody::Object(_) => body.field("query"),
        RequestBody::Unusable => url_params(uri)
            .query
            .filter(|q| !q.trim().is_empty()),
    };
    query.ok_or_else(AppError::missing_query)
}

/// Reads the URL query string leniently; a repeated `query` keeps its first value.
pub fn url_params(uri: &Uri) -> QueryParams {
    let pairs = Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map(|Query(pairs)| pairs)
        .unwrap_or_default();
    QueryParams {
        query: pairs
            .into_iter()
            .find(|(key, _)| key == "query")
            .map(|(_, value)| value),
    }
}

/// Credentials for `/api/query` according to the configured source.
pub fn resolve_credentials(config: &AppConfig, body: &RequestBody) -> AppResult<Credentials> {
    match config.credential_source {
        CredentialSource::Env => config.credentials.require(),
        CredentialSource::Request => body.credentials(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::errors::{MISSING_CONNECTION_PARAMETERS, MISSING_QUERY};

    fn uri(query: Option<&str>) -> Uri {
        let uri = match query {
            Some(query) => format!("/api/query?query={}", query.replace(' ', "%20")),
            None => "/api/query".to_string(),
        };
        uri.parse().unwrap()
    }

    #[test]
    fn test_body_query_wins() {
        let body = RequestBody::parse(br#"{"query": "SELECT 1"}"#);
        assert_eq!(resolve_query(&body, &uri(Some("SELECT 2"))).unwrap(), "SELECT 1");
    }

    #[test]
    fn test_invalid_json_falls_back_to_url_parameter() {
        let body = RequestBody::parse(b"{not json");
        assert_eq!(resolve_query(&body, &uri(Some("SELECT 2"))).unwrap(), "SELECT 2");

        let empty = RequestBody::parse(b"");
        assert_eq!(resolve_query(&empty, &uri(Some("SELECT 3"))).unwrap(), "SELECT 3");
    }

    #[test]
    fn test_json_object_without_query_does_not_fall_back() {
        let body = RequestBody::parse(br#"{"server": "db"}"#);
        let err = resolve_query(&body, &uri(Some("SELECT 2"))).unwrap_err();
        assert!(matches!(err, AppError::Input(ref m) if m == MISSING_QUERY));
    }

    #[test]
    fn test_blank_and_non_string_queries_are_missing() {
        assert!(resolve_query(&RequestBody::parse(br#"{"query": "  "}"#), &uri(None)).is_err());
        assert!(resolve_query(&RequestBody::parse(br#"{"query": 42}"#), &uri(None)).is_err());
        assert!(resolve_query(&RequestBody::Unusable, &uri(Some(""))).is_err());
        assert!(resolve_query(&RequestBody::Unusable, &uri(None)).is_err());
    }

    #[test]
    fn test_non_object_json_falls_back() {
        let body = RequestBody::parse(br#"["SELECT 1"]"#);
        assert_eq!(resolve_query(&body, &uri(Some("SELECT 4"))).unwrap(), "SELECT 4");
    }

    #[test]
    fn test_repeated_url_parameter() {
        let repeated: Uri = "/api/query?query=SELECT%201&query=SELECT%202".parse().unwrap();
        let body = RequestBody::parse(br#"{"query": "SELECT 3"}"#);
        assert_eq!(resolve_query(&body, &repeated).unwrap(), "SELECT 3");
        assert_eq!(resolve_query(&RequestBody::Unusable, &repeated).unwrap(), "SELECT 1");
    }

    #[test]
    fn test_url_params_ignore_other_keys() {
        let uri: Uri = "/api/query?db=x&query=SELECT%20a%2Bb".parse().unwrap();
        assert_eq!(url_params(&uri).query.as_deref(), Some("SELECT a+b"));
        assert_eq!(url_params(&"/api/query".parse().unwrap()).query, None);
    }

    #[test]
    fn test_body_credentials() {
        let body = RequestBody::parse(
            br#"{"server": "db", "database": "sales", "username": "u", "password": "p"}"#,
        );
        let credentials = body.credentials().unwrap();
        assert_eq!(credentials.server, "db");
        assert_eq!(credentials.password, "p");

        let partial = RequestBody::parse(br#"{"server": "db", "database": "sales"}"#);
        let err = partial.credentials().unwrap_err();
        assert!(matches!(err, AppError::Config(ref m) if m == MISSING_CONNECTION_PARAMETERS));
    }
}
