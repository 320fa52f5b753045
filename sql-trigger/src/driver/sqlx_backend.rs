//! PostgreSQL, MySQL and SQLite sessions on top of sqlx.
//!
//! One plain connection per session; no pool is involved.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, ColumnIndex, ConnectOptions, Connection, Decode, Row, TypeInfo};

use common::models::{Cell, Credentials, DbKind, ResultSet};

use super::{hex, split_host_port, Connector, DriverError, Session};

const SQLITE_MEMORY: &str = ":memory:";

/// Opens sqlx connections for the non-SQL Server database kinds.
pub struct SqlxConnector {
    kind: DbKind,
    default_port: Option<u16>,
}

impl SqlxConnector {
    pub fn new(kind: DbKind, default_port: Option<u16>) -> Self {
        Self { kind, default_port }
    }

    fn host_and_port(&self, credentials: &Credentials) -> (String, u16) {
        let fallback = self
            .default_port
            .or_else(|| self.kind.default_port())
            .unwrap_or_default();
        split_host_port(&credentials.server, fallback)
    }
}

#[async_trait]
impl Connector for SqlxConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Session>, DriverError> {
        let connection = match self.kind {
            DbKind::Postgres => {
                let (host, port) = self.host_and_port(credentials);
                let options = PgConnectOptions::new()
                    .host(&host)
                    .port(port)
                    .username(&credentials.username)
                    .password(&credentials.password)
                    .database(&credentials.database);
                SqlxConnection::Postgres(options.connect().await.map_err(connection_error)?)
            }
            DbKind::MySql => {
                let (host, port) = self.host_and_port(credentials);
                let options = MySqlConnectOptions::new()
                    .host(&host)
                    .port(port)
                    .username(&credentials.username)
                    .password(&credentials.password)
                    .database(&credentials.database);
                SqlxConnection::MySql(options.connect().await.map_err(connection_error)?)
            }
            DbKind::Sqlite => {
                let options = if credentials.database == SQLITE_MEMORY {
                    SqliteConnectOptions::from_str("sqlite::memory:").map_err(connection_error)?
                } else {
                    SqliteConnectOptions::new()
                        .filename(&credentials.database)
                        .create_if_missing(true)
                };
                SqlxConnection::Sqlite(options.connect().await.map_err(connection_error)?)
            }
            DbKind::SqlServer => {
                return Err(DriverError::Connection(
                    "SQL Server connections are handled by the TDS driver".to_string(),
                ))
            }
        };

        Ok(Box::new(SqlxSession {
            connection,
            in_transaction: false,
        }))
    }
}

fn connection_error(error: sqlx::Error) -> DriverError {
    DriverError::Connection(error.to_string())
}

enum SqlxConnection {
    Postgres(PgConnection),
    MySql(MySqlConnection),
    Sqlite(SqliteConnection),
}

struct SqlxSession {
    connection: SqlxConnection,
    in_transaction: bool,
}

impl SqlxSession {
    /// Runs raw SQL text and returns the affected row count.
    async fn run(&mut self, sql: &str) -> Result<u64, sqlx::Error> {
        let affected = match &mut self.connection {
            SqlxConnection::Postgres(c) => sqlx::Executor::execute(c, sqlx::raw_sql(sql)).await?.rows_affected(),
            SqlxConnection::MySql(c) => sqlx::Executor::execute(c, sqlx::raw_sql(sql)).await?.rows_affected(),
            SqlxConnection::Sqlite(c) => sqlx::Executor::execute(c, sqlx::raw_sql(sql)).await?.rows_affected(),
        };
        Ok(affected)
    }

    async fn begin(&mut self) -> Result<(), DriverError> {
        if !self.in_transaction {
            self.run("BEGIN").await?;
            self.in_transaction = true;
        }
        Ok(())
    }

    async fn finish(&mut self, statement: &str) -> Result<(), DriverError> {
        if self.in_transaction {
            self.in_transaction = false;
            self.run(statement).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Session for SqlxSession {
    async fn execute(&mut self, sql: &str) -> Result<u64, DriverError> {
        self.begin().await?;
        Ok(self.run(sql).await?)
    }

    async fn fetch_all(&mut self, sql: &str) -> Result<ResultSet, DriverError> {
        self.begin().await?;
        let result = match &mut self.connection {
            SqlxConnection::Postgres(c) => {
                let rows = sqlx::Executor::fetch_all(c, sqlx::raw_sql(sql)).await?;
                collect(&rows, pg_cell)
            }
            SqlxConnection::MySql(c) => {
                let rows = sqlx::Executor::fetch_all(c, sqlx::raw_sql(sql)).await?;
                collect(&rows, mysql_cell)
            }
            SqlxConnection::Sqlite(c) => {
                let rows = sqlx::Executor::fetch_all(c, sqlx::raw_sql(sql)).await?;
                collect(&rows, sqlite_cell)
            }
        };
        Ok(result)
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        self.finish("COMMIT").await
    }

    async fn close(mut self: Box<Self>) -> Result<(), DriverError> {
        let rollback = self.finish("ROLLBACK").await;
        let SqlxSession { connection, .. } = *self;
        match connection {
            SqlxConnection::Postgres(c) => c.close().await?,
            SqlxConnection::MySql(c) => c.close().await?,
            SqlxConnection::Sqlite(c) => c.close().await?,
        }
        rollback
    }
}

fn collect<R: Row>(rows: &[R], cell: fn(&R, usize) -> Cell) -> ResultSet {
    let columns = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();
    let rows = rows
        .iter()
        .map(|row| (0..row.len()).map(|index| cell(row, index)).collect())
        .collect();
    ResultSet::new(columns, rows)
}

/// Returns from the enclosing decoder when the column decodes as `$ty`.
macro_rules! try_decode {
    ($row:expr, $index:expr, $ty:ty, $wrap:expr) => {
        if let Ok(value) = $row.try_get::<Option<$ty>, _>($index) {
            return value.map_or(Cell::Null, $wrap);
        }
    };
}

fn pg_cell(row: &PgRow, index: usize) -> Cell {
    try_decode!(row, index, bool, Cell::Bool);
    try_decode!(row, index, i16, |v: i16| Cell::Int(v.into()));
    try_decode!(row, index, i32, |v: i32| Cell::Int(v.into()));
    try_decode!(row, index, i64, Cell::Int);
    try_decode!(row, index, f32, |v: f32| Cell::Float(v.into()));
    try_decode!(row, index, f64, Cell::Float);
    try_decode!(row, index, String, Cell::Text);
    try_decode!(row, index, Vec<u8>, |v: Vec<u8>| Cell::Text(hex(&v)));
    try_decode!(row, index, DateTime<Utc>, |v: DateTime<Utc>| Cell::Text(v.to_rfc3339()));
    try_decode!(row, index, NaiveDateTime, |v: NaiveDateTime| Cell::Text(v.to_string()));
    try_decode!(row, index, NaiveDate, |v: NaiveDate| Cell::Text(v.to_string()));
    try_decode!(row, index, NaiveTime, |v: NaiveTime| Cell::Text(v.to_string()));
    text_fallback(row, index)
}

fn mysql_cell(row: &MySqlRow, index: usize) -> Cell {
    try_decode!(row, index, i64, Cell::Int);
    try_decode!(row, index, u64, |v: u64| {
        i64::try_from(v).map(Cell::Int).unwrap_or_else(|_| Cell::Text(v.to_string()))
    });
    try_decode!(row, index, f32, |v: f32| Cell::Float(v.into()));
    try_decode!(row, index, f64, Cell::Float);
    try_decode!(row, index, String, Cell::Text);
    try_decode!(row, index, Vec<u8>, |v: Vec<u8>| Cell::Text(hex(&v)));
    try_decode!(row, index, NaiveDateTime, |v: NaiveDateTime| Cell::Text(v.to_string()));
    try_decode!(row, index, NaiveDate, |v: NaiveDate| Cell::Text(v.to_string()));
    try_decode!(row, index, NaiveTime, |v: NaiveTime| Cell::Text(v.to_string()));
    text_fallback(row, index)
}

fn sqlite_cell(row: &SqliteRow, index: usize) -> Cell {
    try_decode!(row, index, i64, Cell::Int);
    try_decode!(row, index, f64, Cell::Float);
    try_decode!(row, index, String, Cell::Text);
    try_decode!(row, index, Vec<u8>, |v: Vec<u8>| Cell::Text(hex(&v)));
    text_fallback(row, index)
}

/// Reads the raw column text without a type check.
///
/// `raw_sql` runs on the text protocol, so types without a typed arm above
/// (NUMERIC, DECIMAL, UUID, JSON, INTERVAL) still arrive as their text form.
fn text_fallback<'r, R>(row: &'r R, index: usize) -> Cell
where
    R: Row,
    usize: ColumnIndex<R>,
    String: Decode<'r, R::Database>,
{
    match row.try_get_unchecked::<Option<String>, _>(index) {
        Ok(value) => value.map_or(Cell::Null, Cell::Text),
        Err(_) => unsupported(row, index),
    }
}

/// Placeholder for column types without a text conversion.
fn unsupported<R: Row>(row: &R, index: usize) -> Cell {
    let type_name = row
        .columns()
        .get(index)
        .map(|c| c.type_info().name().to_string())
        .unwrap_or_else(|| "UNKNOWN".to_string());
    Cell::Text(format!("<{}>", type_name))
}
