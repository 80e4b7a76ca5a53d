//! 📤 Uploader: one artifact, every configured bucket, one at a time.
//!
//! 🧠 Knowledge graph:
//! - Builds one sink (and so one SDK client, and one credential resolution) per call
//! - Buckets run sequentially in configured order
//! - A bucket failure is logged and recorded; the loop moves on to the next bucket
//! - A credential failure is not a bucket failure. It propagates before the loop starts.

use anyhow::Result;
use tracing::{error, info, warn};

use crate::artifact::Artifact;
use crate::backends::{Sink, SinkConnector};

/// 🧾 Which buckets took the artifact and which refused it (with why).
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct UploadReport {
    pub(crate) succeeded: Vec<String>,
    pub(crate) failed: Vec<(String, String)>,
}

impl UploadReport {
    pub(crate) fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Uploader {
    connector: SinkConnector,
    buckets: Vec<String>,
}

impl Uploader {
    pub(crate) fn new(connector: SinkConnector, buckets: Vec<String>) -> Self {
        Self { connector, buckets }
    }

    pub(crate) async fn upload(&self, key: &str, artifact: &Artifact) -> Result<UploadReport> {
        let mut sink = self.connector.connect().await?;
        let mut report = UploadReport::default();

        for bucket in &self.buckets {
            match sink.put(bucket, key, artifact).await {
                Ok(()) => {
                    info!("✅ S3 upload complete: bucket={}, key={}", bucket, key);
                    report.succeeded.push(bucket.clone());
                }
                Err(err) => {
                    error!("💀 Error on S3 upload: bucket={}, key={}, error={:#}", bucket, key, err);
                    report.failed.push((bucket.clone(), format!("{err:#}")));
                }
            }
        }

        if !report.all_succeeded() {
            warn!(
                "⚠️ {} of {} bucket(s) did not receive {}",
                report.failed.len(),
                self.buckets.len(),
                key
            );
        }
        Ok(report)
    }
}
