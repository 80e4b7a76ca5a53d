//! 🎬 Jobs: which queries run, in what order, and where their artifacts go.
//!
//! 🧠 Knowledge graph:
//! - [`JobKind`]: the three nightly jobs, parsed from the `JOB` selector
//! - `Job`: one invocation. Built from a kind + config, run once, dropped.
//! - Each step: catalog query → scoped connection → `ArtifactWriter` → finish → `Uploader`
//! - Unknown job name: a warning, an empty summary, exit 0. No query, no upload.
//! - Missing `TARGETS`: fatal while building the `Job`, before anything touches a network.
//!
//! ```text
//!   "upload_snapshot" ──parse──▶ JobKind ──Job::new──▶ Job ──run──▶ RunSummary
//!                                              │
//!                         for each step: Query ─▶ Source ─▶ gzip ─▶ every bucket
//! ```

mod batching;
mod partition;

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone};
use tracing::{info, warn};

use crate::app_config::AppConfig;
use crate::artifact::ArtifactWriter;
use crate::backends::{RowCursor, SinkConnector, Source, SourceConnector};
use crate::catalog::{self, Query};
use crate::report::RunSummary;
use crate::serializer::{OutputFormat, TimestampPolicy};
use crate::uploader::Uploader;

use batching::drain_batches;
pub use partition::{daily_path, daily_path_for};
use partition::ArtifactKeys;

/// 🏷️ The jobs we know how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// 🧑‍🏫 Advisor note permissions and the instructor/advisor map.
    UploadAdvisors,
    /// ⏪ Instructor and enrollment changes since the recency cutoff, per active term.
    UploadRecentRefresh,
    /// 📸 Person attributes, then courses and enrollments per active term.
    UploadSnapshot,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UploadAdvisors => "upload_advisors",
            Self::UploadRecentRefresh => "upload_recent_refresh",
            Self::UploadSnapshot => "upload_snapshot",
        }
    }
}

impl FromStr for JobKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "upload_advisors" => Ok(Self::UploadAdvisors),
            "upload_recent_refresh" => Ok(Self::UploadRecentRefresh),
            "upload_snapshot" => Ok(Self::UploadSnapshot),
            other => Err(anyhow!("no job named '{other}'")),
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 🚀 Parse the selector and run the job it names.
///
/// An unrecognized name is not an error: it logs a warning and returns a skipped summary.
pub(crate) async fn run(
    job_name: &str,
    config: &AppConfig,
    source: SourceConnector,
    sink: SinkConnector,
) -> Result<RunSummary> {
    let kind = match job_name.parse::<JobKind>() {
        Ok(kind) => kind,
        Err(_) => {
            warn!("🤷 Job {} not found, aborting", job_name);
            return Ok(RunSummary::skipped(job_name));
        }
    };
    Job::new(kind, config, source, sink)?.run().await
}

/// 🎬 One job invocation with everything it needs resolved up front.
#[derive(Debug)]
pub(crate) struct Job {
    kind: JobKind,
    source: SourceConnector,
    uploader: Uploader,
    format: OutputFormat,
    policy: TimestampPolicy,
    keys: ArtifactKeys,
    batch_size: u64,
    current_term_limit: u32,
    recent_refresh_cutoff_days: i64,
}

impl Job {
    /// 🔧 Validate configuration and build the job. No queries, no network.
    pub(crate) fn new(kind: JobKind, config: &AppConfig, source: SourceConnector, sink: SinkConnector) -> Result<Self> {
        let buckets = config.target_buckets()?;
        let policy = TimestampPolicy::from_config(config)?;
        Ok(Self {
            kind,
            source,
            uploader: Uploader::new(sink, buckets),
            format: config.output_format,
            policy,
            keys: ArtifactKeys::new(daily_path()),
            batch_size: config.batch_size,
            current_term_limit: config.current_term_limit,
            recent_refresh_cutoff_days: config.recent_refresh_cutoff_days,
        })
    }

    pub(crate) async fn run(&self) -> Result<RunSummary> {
        info!("🚀 Starting job {}", self.kind);
        let mut summary = RunSummary::new(self.kind.as_str());

        match self.kind {
            JobKind::UploadAdvisors => {
                self.upload_query_results(catalog::advisor_notes_access(), self.keys.advisor_note_permissions(), &mut summary)
                    .await?;
                self.upload_query_results(
                    catalog::instructor_advisor_relationships(),
                    self.keys.instructor_advisor_map(),
                    &mut summary,
                )
                .await?;
            }
            JobKind::UploadRecentRefresh => {
                let cutoff = recency_cutoff(Local::now(), self.recent_refresh_cutoff_days)?;
                info!("⏪ Recency cutoff is {}", cutoff.format("%Y-%m-%d %H:%M:%S"));
                for term_id in self.current_term_ids()? {
                    self.upload_query_results(
                        catalog::recent_instructor_updates(&term_id, cutoff),
                        self.keys.instructor_updates(&term_id),
                        &mut summary,
                    )
                    .await?;
                    self.upload_query_results(
                        catalog::recent_enrollment_updates(&term_id, cutoff),
                        self.keys.enrollment_updates(&term_id),
                        &mut summary,
                    )
                    .await?;
                }
            }
            JobKind::UploadSnapshot => {
                self.upload_query_results(catalog::basic_attributes(), self.keys.basic_attributes(), &mut summary)
                    .await?;
                for term_id in self.current_term_ids()? {
                    self.upload_query_results(catalog::term_courses(&term_id), self.keys.courses(&term_id), &mut summary)
                        .await?;
                    self.upload_query_results(
                        catalog::term_enrollments(&term_id),
                        self.keys.enrollments(&term_id),
                        &mut summary,
                    )
                    .await?;
                }
            }
        }

        info!(
            "🏁 Job {} finished: {} artifact(s), {} row(s), {} failed upload(s)",
            self.kind,
            summary.artifacts.len(),
            summary.total_rows(),
            summary.failed_uploads()
        );
        Ok(summary)
    }

    /// 🗓️ Active term ids, first column of each row, on a connection of their own.
    fn current_term_ids(&self) -> Result<Vec<String>> {
        let mut term_ids = Vec::new();
        self.drive(&catalog::current_terms(self.current_term_limit), |cursor| {
            let mut seen = 0u64;
            for row in cursor.rows {
                if let Some(term_id) = row?.first_as_string() {
                    term_ids.push(term_id);
                }
                seen += 1;
            }
            Ok(seen)
        })
        .context("💀 Couldn't look up the active terms")?;
        info!("🗓️ Active terms: {}", term_ids.join(", "));
        Ok(term_ids)
    }

    /// 📦 Extract one query into one artifact, then push it to every bucket.
    async fn upload_query_results(&self, query: Query, key: String, summary: &mut RunSummary) -> Result<()> {
        info!("📜 Extracting {}", key);
        let mut writer = ArtifactWriter::create(&key, self.format, self.policy.clone())?;
        self.drive(&query, |cursor| writer.append(cursor))
            .with_context(|| format!("💀 Extract for {key} failed; nothing was uploaded"))?;
        let artifact = writer.finish()?;

        let report = self.uploader.upload(&key, &artifact).await?;
        summary.record(&key, &artifact, &report);
        Ok(())
    }

    /// 🔌 Open one connection, run the query (every batch of it, if batched), hand
    /// each cursor to `consume`, close the connection. Returns the total row count.
    fn drive(&self, query: &Query, mut consume: impl FnMut(RowCursor<'_>) -> Result<u64>) -> Result<u64> {
        let mut connection = self.source.connect()?;
        match query {
            Query::Static(sql) => consume(connection.query(sql)?),
            Query::Batched(batched) => {
                let tally = drain_batches(self.batch_size, |batch_number| {
                    let sql = batched.sql(batch_number, self.batch_size);
                    consume(connection.query(&sql)?)
                })?;
                Ok(tally.rows)
            }
        }
    }
}

/// ⏪ `now - days`, refusing spans chrono can't represent.
///
/// Subtracts elapsed time from the zoned instant, then reads the local wall clock, so a
/// day that crosses a DST change still looks back exactly `days * 24h`.
fn recency_cutoff<Tz: TimeZone>(now: DateTime<Tz>, days: i64) -> Result<NaiveDateTime> {
    let span = TimeDelta::try_days(days)
        .ok_or_else(|| anyhow!("💀 RECENT_REFRESH_CUTOFF_DAYS={days} is not a span of days we can represent"))?;
    now.checked_sub_signed(span)
        .map(|cutoff| cutoff.naive_local())
        .ok_or_else(|| anyhow!("💀 RECENT_REFRESH_CUTOFF_DAYS={days} reaches past the start of time"))
}
