//! SQL query models.
//!
//! Contains the request shapes accepted by the query endpoints and the
//! tabular result produced by a driver.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// JSON body accepted by the query endpoints.
///
/// Only documents the shape; handlers read the body leniently so a
/// malformed body can fall back to the query string.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryBody {
    /// SQL statement to execute.
    pub query: Option<String>,
    /// Database host (request-sourced credentials only).
    pub server: Option<String>,
    /// Database name (request-sourced credentials only).
    pub database: Option<String>,
    /// Login name (request-sourced credentials only).
    pub username: Option<String>,
    /// Login password (request-sourced credentials only).
    pub password: Option<String>,
}

/// URL query-string parameters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QueryParams {
    /// SQL statement, used when the body is not valid JSON.
    pub query: Option<String>,
}

/// A single value in a result set.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "NULL"),
            Cell::Bool(value) => write!(f, "{}", value),
            Cell::Int(value) => write!(f, "{}", value),
            Cell::Float(value) => write!(f, "{}", value),
            Cell::Text(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

/// Rows returned by a read statement, with the driver's column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
