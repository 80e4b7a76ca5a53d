use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};

use crate::backends::{RowCursor, Source};
use crate::common::Row;

/// 📦 What one canned query returns: column names, then rows (or a mid-stream failure).
#[derive(Debug)]
pub(crate) struct QueryResult {
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Result<Row>>,
}

impl QueryResult {
    pub(crate) fn new(columns: &[&str], rows: Vec<Row>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows.into_iter().map(Ok).collect(),
        }
    }

    /// 💀 Append a fetch error after the good rows, like a connection dropping mid-cursor.
    pub(crate) fn then_fail(mut self, message: &str) -> Self {
        self.rows.push(Err(anyhow!(message.to_string())));
        self
    }
}

type Responder = dyn Fn(&str) -> Result<QueryResult> + Send + Sync;

/// 🗄️ A database made of one closure and a notebook.
///
/// Cloning shares the notebook, so a test can hand one clone to the job and keep
/// another to read what SQL arrived and how many connections were opened.
#[derive(Clone)]
pub(crate) struct InMemoryDatabase {
    responder: Arc<Responder>,
    journal: Arc<Mutex<Journal>>,
}

#[derive(Debug, Default)]
struct Journal {
    statements: Vec<String>,
    connections: usize,
}

impl std::fmt::Debug for InMemoryDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDatabase").finish_non_exhaustive()
    }
}

impl InMemoryDatabase {
    pub(crate) fn new(responder: impl Fn(&str) -> Result<QueryResult> + Send + Sync + 'static) -> Self {
        Self {
            responder: Arc::new(responder),
            journal: Arc::new(Mutex::new(Journal::default())),
        }
    }

    pub(crate) fn connect(&self) -> InMemorySource {
        self.with_journal(|journal| journal.connections += 1);
        InMemorySource {
            database: self.clone(),
        }
    }

    /// 📜 Every statement executed so far, in order.
    pub(crate) fn statements(&self) -> Vec<String> {
        self.with_journal(|journal| journal.statements.clone())
    }

    pub(crate) fn connections(&self) -> usize {
        self.with_journal(|journal| journal.connections)
    }

    // -- 🔒 a poisoned lock only means another test thread panicked; the journal itself is fine
    fn with_journal<T>(&self, f: impl FnOnce(&mut Journal) -> T) -> T {
        let mut journal = self.journal.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut journal)
    }
}

/// 🔌 One "connection" to an [`InMemoryDatabase`].
#[derive(Debug)]
pub(crate) struct InMemorySource {
    database: InMemoryDatabase,
}

impl Source for InMemorySource {
    fn query(&mut self, sql: &str) -> Result<RowCursor<'_>> {
        self.database
            .with_journal(|journal| journal.statements.push(sql.to_string()));
        let result = (self.database.responder)(sql)?;
        Ok(RowCursor {
            columns: result.columns,
            rows: Box::new(result.rows.into_iter()),
        })
    }
}
