//! In-memory connector for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::models::{Credentials, ResultSet};

use super::{Connector, DriverError, Session};

/// Where the fake driver should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Connect,
    Execute,
    Fetch,
    Commit,
}

/// Calls observed by a [`FakeConnector`].
#[derive(Debug, Default)]
pub struct FakeLog {
    pub connects: usize,
    pub closes: usize,
    pub commits: usize,
    pub statements: Vec<String>,
    pub credentials: Vec<Credentials>,
}

#[derive(Clone, Default)]
pub struct FakeConnector {
    result: ResultSet,
    fail_at: Option<FailAt>,
    hang_on_connect: bool,
    log: Arc<Mutex<FakeLog>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows every read statement returns.
    pub fn with_result(mut self, result: ResultSet) -> Self {
        self.result = result;
        self
    }

    pub fn failing_at(mut self, fail_at: FailAt) -> Self {
        self.fail_at = Some(fail_at);
        self
    }

    /// Connection attempts never complete.
    pub fn hanging_on_connect(mut self) -> Self {
        self.hang_on_connect = true;
        self
    }

    pub fn log(&self) -> std::sync::MutexGuard<'_, FakeLog> {
        self.log.lock().unwrap()
    }

    fn fail(&self, point: FailAt) -> Result<(), DriverError> {
        if self.fail_at == Some(point) {
            let message = format!("fake failure during {:?}", point);
            return Err(match point {
                FailAt::Connect => DriverError::Connection(message),
                _ => DriverError::Statement(message),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Session>, DriverError> {
        {
            let mut log = self.log();
            log.connects += 1;
            log.credentials.push(credentials.clone());
        }
        if self.hang_on_connect {
            std::future::pending::<()>().await;
        }
        self.fail(FailAt::Connect)?;
        Ok(Box::new(FakeSession {
            connector: self.clone(),
        }))
    }
}

struct FakeSession {
    connector: FakeConnector,
}

#[async_trait]
impl Session for FakeSession {
    async fn execute(&mut self, sql: &str) -> Result<u64, DriverError> {
        self.connector.log().statements.push(sql.to_string());
        self.connector.fail(FailAt::Execute)?;
        Ok(1)
    }

    async fn fetch_all(&mut self, sql: &str) -> Result<ResultSet, DriverError> {
        self.connector.log().statements.push(sql.to_string());
        self.connector.fail(FailAt::Fetch)?;
        Ok(self.connector.result.clone())
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        self.connector.fail(FailAt::Commit)?;
        self.connector.log().commits += 1;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.connector.log().closes += 1;
        Ok(())
    }
}
