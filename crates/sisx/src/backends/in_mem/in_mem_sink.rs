use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::artifact::Artifact;
use crate::backends::Sink;

/// 📦 One object as it would have landed in a bucket.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StoredObject {
    pub(crate) bucket: String,
    pub(crate) key: String,
    pub(crate) bytes: Vec<u8>,
}

/// 📦 A bucket farm that never forgets. Unless told to, for specific buckets.
///
/// Clone-able because tests need to peek inside after handing a copy to the uploader.
/// The `Arc` means everyone shares the same Vec. The borrow checker approved. It had notes.
#[derive(Debug, Default, Clone)]
pub(crate) struct InMemorySink {
    pub(crate) stored: Arc<Mutex<Vec<StoredObject>>>,
    failing_buckets: Arc<HashSet<String>>,
}

impl InMemorySink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 💀 A sink where every `put` to one of these buckets is refused.
    pub(crate) fn failing_for(buckets: &[&str]) -> Self {
        Self {
            stored: Arc::default(),
            failing_buckets: Arc::new(buckets.iter().map(|b| b.to_string()).collect()),
        }
    }

    pub(crate) async fn objects(&self) -> Vec<StoredObject> {
        self.stored.lock().await.clone()
    }
}

#[async_trait]
impl Sink for InMemorySink {
    async fn put(&mut self, bucket: &str, key: &str, artifact: &Artifact) -> Result<()> {
        if self.failing_buckets.contains(bucket) {
            bail!("AccessDenied: the in-memory bucket '{bucket}' refuses '{key}'");
        }
        let bytes = artifact.read_bytes()?;
        self.stored.lock().await.push(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            bytes,
        });
        Ok(())
    }
}
