//! SQL Server / Azure SQL driver built on tiberius.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use tiberius::{AuthMethod, Client, ColumnData, Config, FromSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use common::models::{Cell, Credentials, ResultSet};

use super::{hex, split_host_port, Connector, DriverError, Session};

type MssqlClient = Client<Compat<TcpStream>>;

/// Opens TDS connections to SQL Server.
pub struct MssqlConnector {
    default_port: u16,
    trust_server_certificate: bool,
}

impl MssqlConnector {
    pub fn new(default_port: u16, trust_server_certificate: bool) -> Self {
        Self {
            default_port,
            trust_server_certificate,
        }
    }

    fn config_for(&self, credentials: &Credentials) -> Config {
        let (host, port) = split_host_port(&credentials.server, self.default_port);

        let mut config = Config::new();
        config.host(host);
        config.port(port);
        config.database(&credentials.database);
        config.authentication(AuthMethod::sql_server(
            &credentials.username,
            &credentials.password,
        ));
        config.application_name(env!("CARGO_PKG_NAME"));
        if self.trust_server_certificate {
            config.trust_cert();
        }
        config
    }
}

#[async_trait]
impl Connector for MssqlConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Session>, DriverError> {
        let config = self.config_for(credentials);

        let client = match open(config.clone()).await {
            Ok(client) => client,
            // Azure SQL gateways answer with a redirect to the actual node.
            Err(tiberius::error::Error::Routing { host, port }) => {
                tracing::debug!(host = %host, port, "Following SQL Server routing redirect");
                let mut config = config;
                config.host(&host);
                config.port(port);
                open(config).await.map_err(connection_error)?
            }
            Err(e) => return Err(connection_error(e)),
        };

        Ok(Box::new(MssqlSession {
            client,
            in_transaction: false,
        }))
    }
}

async fn open(config: Config) -> Result<MssqlClient, tiberius::error::Error> {
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;
    Client::connect(config, tcp.compat_write()).await
}

fn connection_error(error: tiberius::error::Error) -> DriverError {
    DriverError::Connection(error.to_string())
}

struct MssqlSession {
    client: MssqlClient,
    in_transaction: bool,
}

impl MssqlSession {
    async fn begin(&mut self) -> Result<(), DriverError> {
        if !self.in_transaction {
            self.client
                .simple_query("BEGIN TRANSACTION")
                .await?
                .into_results()
                .await?;
            self.in_transaction = true;
        }
        Ok(())
    }

    async fn finish(&mut self, statement: &str) -> Result<(), DriverError> {
        if self.in_transaction {
            self.in_transaction = false;
            self.client.simple_query(statement).await?.into_results().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Session for MssqlSession {
    async fn execute(&mut self, sql: &str) -> Result<u64, DriverError> {
        self.begin().await?;
        let result = self.client.execute(sql, &[]).await?;
        Ok(result.total())
    }

    async fn fetch_all(&mut self, sql: &str) -> Result<ResultSet, DriverError> {
        self.begin().await?;
        let mut stream = self.client.simple_query(sql).await?;
        let columns: Vec<String> = stream
            .columns()
            .await?
            .map(|columns| columns.iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        let rows = stream
            .into_first_result()
            .await?
            .into_iter()
            .map(|row| row.into_iter().map(|value| cell_from(&value)).collect())
            .collect();
        Ok(ResultSet::new(columns, rows))
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        self.finish("COMMIT TRANSACTION").await
    }

    async fn close(mut self: Box<Self>) -> Result<(), DriverError> {
        let rollback = self.finish("ROLLBACK TRANSACTION").await;
        let MssqlSession { client, .. } = *self;
        client.close().await?;
        rollback
    }
}

/// Converts one SQL Server value into a result cell.
fn cell_from(data: &ColumnData<'static>) -> Cell {
    let cell = match data {
        ColumnData::U8(v) => v.map(|v| Cell::Int(v.into())),
        ColumnData::I16(v) => v.map(|v| Cell::Int(v.into())),
        ColumnData::I32(v) => v.map(|v| Cell::Int(v.into())),
        ColumnData::I64(v) => v.map(Cell::Int),
        ColumnData::F32(v) => v.map(|v| Cell::Float(v.into())),
        ColumnData::F64(v) => v.map(Cell::Float),
        ColumnData::Bit(v) => v.map(Cell::Bool),
        ColumnData::String(v) => v.as_ref().map(|s| Cell::Text(s.to_string())),
        ColumnData::Guid(v) => v.map(|g| Cell::Text(g.to_string())),
        ColumnData::Numeric(v) => v.as_ref().map(|n| Cell::Text(n.to_string())),
        ColumnData::Binary(v) => v.as_ref().map(|bytes| Cell::Text(hex(bytes))),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            text(NaiveDateTime::from_sql(data))
        }
        ColumnData::Date(_) => text(NaiveDate::from_sql(data)),
        ColumnData::Time(_) => text(NaiveTime::from_sql(data)),
        ColumnData::DateTimeOffset(_) => text(DateTime::<FixedOffset>::from_sql(data)),
        other => Some(Cell::Text(format!("{:?}", other))),
    };
    cell.unwrap_or(Cell::Null)
}

fn text<T: ToString>(value: Result<Option<T>, tiberius::error::Error>) -> Option<Cell> {
    value.ok().flatten().map(|v| Cell::Text(v.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn test_integer_and_bit_cells() {
        assert_eq!(cell_from(&ColumnData::U8(Some(7))), Cell::Int(7));
        assert_eq!(cell_from(&ColumnData::I32(Some(-3))), Cell::Int(-3));
        assert_eq!(cell_from(&ColumnData::I64(None)), Cell::Null);
        assert_eq!(cell_from(&ColumnData::Bit(Some(true))), Cell::Bool(true));
        assert_eq!(cell_from(&ColumnData::F64(Some(1.5))), Cell::Float(1.5));
    }

    #[test]
    fn test_string_and_binary_cells() {
        assert_eq!(
            cell_from(&ColumnData::String(Some(Cow::Borrowed("Contoso")))),
            Cell::Text("Contoso".to_string())
        );
        assert_eq!(cell_from(&ColumnData::String(None)), Cell::Null);
        assert_eq!(
            cell_from(&ColumnData::Binary(Some(Cow::Borrowed(&[0xDE, 0xAD][..])))),
            Cell::Text("0xDEAD".to_string())
        );
    }
}
