//! Application state for the SQL trigger service.

use std::sync::Arc;

use common::config::AppConfig;

use crate::driver::{self, Connector};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub connector: Arc<dyn Connector>,
}

impl AppState {
    /// Creates a new application state with the connector for the configured database kind.
    pub fn new(config: AppConfig) -> Self {
        let connector = driver::connector_for(&config);
        Self::with_connector(config, connector)
    }

    pub fn with_connector(config: AppConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config: Arc::new(config),
            connector,
        }
    }
}
