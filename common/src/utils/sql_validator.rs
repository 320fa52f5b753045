//! SQL statement inspection.
//!
//! Classifies statements by their leading keyword and provides the
//! optional DDL guard.

use crate::errors::AppError;

/// Whether a statement is committed (write) or fetched (read).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// INSERT / UPDATE / DELETE: executed and committed.
    Write,
    /// Everything else: executed and its rows fetched.
    Read,
}

const WRITE_KEYWORDS: [&str; 3] = ["insert", "update", "delete"];

/// Keywords rejected when the DDL guard is enabled.
const FORBIDDEN_KEYWORDS: [&str; 3] = ["DROP ", "TRUNCATE ", "ALTER "];

impl StatementKind {
    /// Classifies a statement by its leading keyword, ignoring case and
    /// surrounding whitespace.
    pub fn classify(sql: &str) -> Self {
        let sql = sql.trim();
        let is_write = WRITE_KEYWORDS.iter().any(|keyword| {
            sql.get(..keyword.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(keyword))
        });
        if is_write {
            StatementKind::Write
        } else {
            StatementKind::Read
        }
    }
}

/// Validates SQL statements against the forbidden keyword list.
pub struct SqlValidator;

impl SqlValidator {
    /// Rejects statements containing DROP, TRUNCATE or ALTER.
    ///
    /// # Errors
    /// Returns `AppError::Input` naming the first forbidden keyword found.
    pub fn validate(sql: &str) -> Result<(), AppError> {
        let sql_upper = sql.to_uppercase();
        for keyword in FORBIDDEN_KEYWORDS {
            if sql_upper.contains(keyword) {
                return Err(AppError::Input(format!(
                    "Forbidden SQL operation: {}",
                    keyword.trim()
                )));
            }
        }
        Ok(())
    }
}
