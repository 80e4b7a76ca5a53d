//! 🔌 Backends: where the real I/O happens.
//!
//! 🚰 Source backends pour rows out of a database, Sink backends catch finished
//! artifacts in a bucket. Everything in between is somebody else's module.
//!
//! 🎭 The casting agency: Oracle for the real thing, S3 for the real destination,
//! and an in-memory pair of stunt doubles for every test that would rather not
//! talk to a production database at 2am.
//!
//! 🧠 Knowledge graph:
//! - Pattern: trait → concrete impls → `*Backend` enum dispatch → `*Connector` that builds one
//! - Sources are synchronous (the Oracle driver blocks). Sinks are async (the AWS SDK insists).
//! - Connectors are cheap, cloneable recipes. Connections are scoped: one per query,
//!   one per batch loop, one per term lookup. Sink clients: one per upload call.
//!
//! 🦆

mod in_mem;
mod oracle_db;
mod s3;
mod sink;
mod source;

pub(crate) use in_mem::{InMemoryDatabase, InMemorySink, QueryResult, StoredObject};
pub(crate) use oracle_db::OracleConnectOptions;
pub(crate) use s3::S3ConnectOptions;
pub(crate) use sink::{Sink, SinkBackend, SinkConnector};
pub(crate) use source::{RowCursor, Source, SourceBackend, SourceConnector};
