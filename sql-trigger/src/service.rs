//! 查询执行服务模块

use std::sync::Arc;
use std::time::Duration;

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::{Credentials, ResultSet};
use common::utils::{render_table, SqlValidator, StatementKind};

use crate::driver::{Connector, DriverError, Session};

/// What a successfully executed statement produced.
#[derive(Debug, PartialEq)]
pub enum QueryOutcome {
    /// A write statement was executed and committed.
    Committed { query: String, rows_affected: u64 },
    /// A read statement returned no rows.
    NoData,
    /// A read statement returned rows.
    Rows(ResultSet),
}

impl QueryOutcome {
    /// Renders the plain-text response body.
    pub fn into_body(self) -> String {
        match self {
            QueryOutcome::Committed { query, .. } => {
                format!("Query executed successfully: {}", query)
            }
            QueryOutcome::NoData => "No data found".to_string(),
            QueryOutcome::Rows(result) => format!("Query result: \n\n{}", render_table(&result)),
        }
    }
}

/// SQL 查询执行服务
pub struct QueryService {
    connector: Arc<dyn Connector>,
    config: Arc<AppConfig>,
}

impl QueryService {
    /// 创建新的查询服务实例
    pub fn new(connector: Arc<dyn Connector>, config: Arc<AppConfig>) -> Self {
        Self { connector, config }
    }

    /// 执行 SQL 查询
    ///
    /// 每次调用独占一个连接；连接一旦建立，无论成功或失败都会关闭一次。
    pub async fn execute(&self, credentials: &Credentials, query: &str) -> AppResult<QueryOutcome> {
        if self.config.forbid_ddl {
            SqlValidator::validate(query)?;
        }

        let mut session = self.connect(credentials).await.map_err(|e| self.driver_error(e, query))?;

        let outcome = Self::run(session.as_mut(), query).await;

        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, "Failed to close database connection");
        }

        outcome.map_err(|e| self.driver_error(e, query))
    }

    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Session>, DriverError> {
        let timeout_secs = self.config.connect_timeout_secs;
        tracing::debug!(
            server = %credentials.server,
            database = %credentials.database,
            "Opening database connection"
        );
        tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.connector.connect(credentials),
        )
        .await
        .map_err(|_| DriverError::Timeout(timeout_secs))?
    }

    async fn run(session: &mut dyn Session, query: &str) -> Result<QueryOutcome, DriverError> {
        match StatementKind::classify(query) {
            StatementKind::Write => {
                let rows_affected = session.execute(query).await?;
                session.commit().await?;
                tracing::info!(rows_affected, "Write statement committed");
                Ok(QueryOutcome::Committed {
                    query: query.to_string(),
                    rows_affected,
                })
            }
            StatementKind::Read => {
                let result = session.fetch_all(query).await?;
                tracing::info!(rows = result.row_count(), "Read statement fetched");
                if result.is_empty() {
                    Ok(QueryOutcome::NoData)
                } else {
                    Ok(QueryOutcome::Rows(result))
                }
            }
        }
    }

    fn driver_error(&self, error: DriverError, query: &str) -> AppError {
        let query = self.config.include_query_in_errors.then_some(query);
        AppError::driver(error.to_string(), query)
    }
}
