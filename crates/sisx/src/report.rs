//! 🧾 Run Report: what got extracted, how big it was, and who got a copy.
//!
//! 🍽️ Rendered with comfy-table at the end of a run, because "it worked, probably"
//! is not an acceptable status update at 6am.

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use crate::artifact::Artifact;
use crate::progress::{format_bytes, format_number};
use crate::uploader::UploadReport;

/// 📦 One artifact's fate.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactOutcome {
    pub key: String,
    pub rows: u64,
    pub compressed_bytes: u64,
    pub buckets_succeeded: Vec<String>,
    pub buckets_failed: Vec<String>,
}

/// 📊 Everything one job invocation produced, in the order it produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub job: String,
    /// 🤷 True when the job name matched nothing and the run was a no-op.
    pub skipped: bool,
    pub artifacts: Vec<ArtifactOutcome>,
}

impl RunSummary {
    pub fn new(job: &str) -> Self {
        Self {
            job: job.to_string(),
            ..Self::default()
        }
    }

    pub fn skipped(job: &str) -> Self {
        Self {
            job: job.to_string(),
            skipped: true,
            artifacts: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, key: &str, artifact: &Artifact, upload: &UploadReport) {
        self.artifacts.push(ArtifactOutcome {
            key: key.to_string(),
            rows: artifact.rows,
            compressed_bytes: artifact.compressed_bytes,
            buckets_succeeded: upload.succeeded.clone(),
            buckets_failed: upload.failed.iter().map(|(bucket, _)| bucket.clone()).collect(),
        });
    }

    pub fn total_rows(&self) -> u64 {
        self.artifacts.iter().map(|a| a.rows).sum()
    }

    /// 💀 How many (artifact, bucket) pairs never made it.
    pub fn failed_uploads(&self) -> usize {
        self.artifacts.iter().map(|a| a.buckets_failed.len()).sum()
    }

    /// 🍽️ The end-of-run table.
    pub fn render(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["key", "rows", "gzip", "uploaded to", "failed"]);

        for artifact in &self.artifacts {
            table.add_row(vec![
                Cell::new(&artifact.key),
                Cell::new(format_number(artifact.rows)).set_alignment(CellAlignment::Right),
                Cell::new(format_bytes(artifact.compressed_bytes)).set_alignment(CellAlignment::Right),
                Cell::new(artifact.buckets_succeeded.join(", ")),
                Cell::new(artifact.buckets_failed.join(", ")),
            ]);
        }
        table.add_row(vec![
            Cell::new(format!("{} artifact(s)", self.artifacts.len())),
            Cell::new(format_number(self.total_rows())).set_alignment(CellAlignment::Right),
            Cell::new(""),
            Cell::new(""),
            Cell::new(format!("{} failed upload(s)", self.failed_uploads())),
        ]);
        table.to_string()
    }
}
