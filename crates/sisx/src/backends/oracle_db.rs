//! 🏛️ Previously, on "The Source of Record"...
//!
//! The student information system lived in an Oracle database older than some of
//! the students in it. It spoke SQL*Net. It expected a SID. It would not be rushed.
//!
//! This module opens one blocking connection per scope, runs a statement, and turns
//! each fetched row into our own [`Row`](crate::common::Row) of `CellValue`s, with
//! column names read from the cursor metadata.
//!
//! 💀 Connection refused → check the host, the port, the VPN, and your life choices.
//! 🦆

mod oracle_source;

pub(crate) use oracle_source::{OracleConnectOptions, OracleSource};
