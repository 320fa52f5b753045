//! Shared data models.

pub mod connection;
pub mod query;

// Re-export commonly used types
pub use connection::{Credentials, DbKind};
pub use query::{Cell, QueryBody, QueryParams, ResultSet};
