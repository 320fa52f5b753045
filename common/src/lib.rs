//! Shared building blocks for the SQL trigger service.
//!
//! - `config`: process configuration, loaded once at start-up
//! - `errors`: the closed error taxonomy and its HTTP mapping
//! - `models`: credentials, result sets and database kinds
//! - `middleware`: request id propagation
//! - `utils`: statement classification and plain-text table rendering
//!
//! Query text is handed to the database verbatim. There is no
//! parameterization, so anyone able to reach the service can run any
//! statement the configured login is allowed to run.

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod utils;
