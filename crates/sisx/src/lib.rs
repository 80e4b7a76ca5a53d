//! 🦀 sisx, nightly SIS extracts. Oracle rows in, gzipped delimited text out,
//! one copy per configured S3 bucket under today's partition.
//!
//! 🧠 Knowledge graph:
//! - [`app_config`]: dotenv layers + environment → [`app_config::AppConfig`]
//! - [`catalog`]: the SQL, static or paginated
//! - [`serializer`]: rows → TSV/CSV lines, timestamps rendered with an explicit offset
//! - `artifact`: lines → gzip temp file that deletes itself
//! - `backends`: Oracle source, S3 sink, and in-memory stand-ins for both
//! - `uploader`: one artifact → every bucket, failures recorded not fatal
//! - `jobs`: which queries, which keys, which order
//! - [`report`]: the end-of-run table

pub mod app_config;
pub mod catalog;
pub mod common;
pub mod report;
pub mod serializer;

pub(crate) mod artifact;
pub(crate) mod backends;
pub(crate) mod jobs;
pub(crate) mod progress;
pub(crate) mod uploader;

use anyhow::Result;

use crate::app_config::AppConfig;
use crate::backends::{SinkConnector, SourceConnector};

pub use crate::jobs::{JobKind, daily_path, daily_path_for};
pub use crate::report::RunSummary;

/// 🚀 Run the named job against the configured Oracle source and S3 targets.
///
/// An unknown job name is a warning and an empty, skipped summary, not an error.
pub async fn run(config: &AppConfig, job_name: &str) -> Result<RunSummary> {
    jobs::run(
        job_name,
        config,
        SourceConnector::from_config(config),
        SinkConnector::from_config(config),
    )
    .await
}
