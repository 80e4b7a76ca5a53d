use anyhow::Result;

use crate::app_config::AppConfig;
use crate::backends::{in_mem, oracle_db};
use crate::common::Row;

/// 🧵 One executed query: column names up front, rows pulled lazily.
///
/// The rows iterator may borrow the connection that produced it, hence the lifetime.
/// Drop the cursor before you drop (or reuse) the connection. The borrow checker
/// will remind you, loudly, if you forget.
pub(crate) struct RowCursor<'a> {
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Box<dyn Iterator<Item = Result<Row>> + 'a>,
}

impl std::fmt::Debug for RowCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowCursor")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

/// 🚰 A source that executes SQL and hands back a cursor.
///
/// # Contract 📜
/// - `query` runs one read-only statement and returns its cursor. Nothing is buffered.
/// - Errors (connect, parse, fetch) propagate. Nobody here retries; a failed extract
///   is a failed run.
/// - `&mut self` because a connection has state. And a network socket. Mostly the socket.
pub(crate) trait Source: std::fmt::Debug {
    fn query(&mut self, sql: &str) -> Result<RowCursor<'_>>;
}

/// 🎭 The many faces of a Source. Callers never need to know whether they're
/// talking to a real Oracle listener or a HashMap with ambitions.
#[derive(Debug)]
pub(crate) enum SourceBackend {
    Oracle(oracle_db::OracleSource),
    InMemory(in_mem::InMemorySource),
}

impl Source for SourceBackend {
    fn query(&mut self, sql: &str) -> Result<RowCursor<'_>> {
        match self {
            SourceBackend::Oracle(source) => source.query(sql),
            SourceBackend::InMemory(source) => source.query(sql),
        }
    }
}

/// 🔧 How to open a fresh [`SourceBackend`]. Cloneable, connection-free.
#[derive(Debug, Clone)]
pub(crate) enum SourceConnector {
    Oracle(oracle_db::OracleConnectOptions),
    InMemory(in_mem::InMemoryDatabase),
}

impl SourceConnector {
    pub(crate) fn from_config(config: &AppConfig) -> Self {
        Self::Oracle(oracle_db::OracleConnectOptions::from_config(config))
    }

    /// 🔌 Open a new scoped connection. Dropping the backend closes it.
    pub(crate) fn connect(&self) -> Result<SourceBackend> {
        match self {
            SourceConnector::Oracle(options) => Ok(SourceBackend::Oracle(oracle_db::OracleSource::connect(options)?)),
            SourceConnector::InMemory(database) => Ok(SourceBackend::InMemory(database.connect())),
        }
    }
}
