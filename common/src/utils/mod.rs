//! Utility functions and helpers.

pub mod sql_validator;
pub mod table;

// Re-export commonly used types
pub use sql_validator::{SqlValidator, StatementKind};
pub use table::render as render_table;
