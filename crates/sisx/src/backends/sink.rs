use anyhow::Result;
use async_trait::async_trait;

use crate::app_config::AppConfig;
use crate::artifact::Artifact;
use crate::backends::{in_mem, s3};

/// 🕳️ A sink that stores finished artifacts under a bucket and key. Pure I/O, zero logic.
///
/// # Contract 📜
/// - `put` writes the whole artifact, read from its first byte, to `bucket/key`.
///   Every call starts from the beginning; no call may observe a half-consumed stream.
/// - An `Err` means *this* bucket failed. Deciding whether to carry on is the
///   uploader's job, not the sink's.
#[async_trait]
pub(crate) trait Sink: std::fmt::Debug {
    async fn put(&mut self, bucket: &str, key: &str, artifact: &Artifact) -> Result<()>;
}

/// 🎭 The many faces of a Sink. Mirrors `SourceBackend` on the other end of the pipeline.
#[derive(Debug)]
pub(crate) enum SinkBackend {
    S3(s3::S3Sink),
    InMemory(in_mem::InMemorySink),
}

#[async_trait]
impl Sink for SinkBackend {
    async fn put(&mut self, bucket: &str, key: &str, artifact: &Artifact) -> Result<()> {
        match self {
            SinkBackend::S3(sink) => sink.put(bucket, key, artifact).await,
            SinkBackend::InMemory(sink) => sink.put(bucket, key, artifact).await,
        }
    }
}

/// 🔧 How to build a fresh [`SinkBackend`].
///
/// `connect` is where credentials get resolved (assume-role included), so a credential
/// failure surfaces here, before any bucket is attempted.
#[derive(Debug, Clone)]
pub(crate) enum SinkConnector {
    S3(s3::S3ConnectOptions),
    InMemory(in_mem::InMemorySink),
}

impl SinkConnector {
    pub(crate) fn from_config(config: &AppConfig) -> Self {
        Self::S3(s3::S3ConnectOptions::from_config(config))
    }

    pub(crate) async fn connect(&self) -> Result<SinkBackend> {
        match self {
            SinkConnector::S3(options) => Ok(SinkBackend::S3(s3::S3Sink::connect(options).await?)),
            SinkConnector::InMemory(sink) => Ok(SinkBackend::InMemory(sink.clone())),
        }
    }
}
