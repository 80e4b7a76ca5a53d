//! 🗜️ Artifact Assembly: rows in, one gzip file out, nothing left lying around.
//!
//! 🎬 *[a temp file is born. it will live for exactly one upload. it knows this.]*
//!
//! 🧠 Knowledge graph:
//! - Writer stack: `RowWriter` → `Tally` (counts plain bytes) → `GzEncoder` → `BufWriter` → temp `File`
//! - The temp file path is a `tempfile::TempPath`: deleted on drop, on every exit path,
//!   including the one where the database hangs up on us halfway through.
//! - One [`ArtifactWriter`] per destination key. Batched queries call
//!   [`ArtifactWriter::append`] once per batch, all into the same gzip stream.
//! - [`ArtifactWriter::finish`] writes the gzip trailer and flushes everything before
//!   the [`Artifact`] exists at all. No artifact, no upload. No half-written uploads.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::{NamedTempFile, TempPath};
use tracing::info;

use crate::backends::RowCursor;
use crate::progress::{ProgressMetrics, format_bytes, format_number};
use crate::serializer::{OutputFormat, RowWriter, TimestampPolicy};

/// 🧮 Counts bytes on their way into the gzip encoder.
struct Tally<W> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for Tally<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

type GzStack = Tally<GzEncoder<BufWriter<File>>>;

/// ✍️ Streams one or more cursors into a single gzip temp file.
pub(crate) struct ArtifactWriter {
    key: String,
    rows: RowWriter<GzStack>,
    path: TempPath,
    row_count: u64,
    progress: ProgressMetrics,
}

impl std::fmt::Debug for ArtifactWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactWriter")
            .field("key", &self.key)
            .field("path", &self.path)
            .field("row_count", &self.row_count)
            .finish()
    }
}

impl ArtifactWriter {
    /// 🚀 Open a fresh temp file and stack the encoders on top of it.
    pub(crate) fn create(key: &str, format: OutputFormat, policy: TimestampPolicy) -> Result<Self> {
        let (file, path) = NamedTempFile::new()
            .context("💀 Couldn't create a temp file for the artifact. Is the temp dir full, or read-only?")?
            .into_parts();
        let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        let tally = Tally {
            inner: encoder,
            written: 0,
        };
        Ok(Self {
            key: key.to_string(),
            rows: RowWriter::new(tally, format, policy),
            path,
            row_count: 0,
            progress: ProgressMetrics::new(key),
        })
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// 🚿 Drain one cursor into the stream. Returns how many rows this cursor held.
    ///
    /// 💀 A row error propagates immediately. The caller drops the writer, the temp
    /// file goes with it.
    pub(crate) fn append(&mut self, cursor: RowCursor<'_>) -> Result<u64> {
        let mask = self.rows.local_mask(&cursor.columns);
        let mut appended = 0u64;
        for row in cursor.rows {
            let row = row.with_context(|| format!("💀 Fetching a row for '{}' failed mid-stream", self.key))?;
            self.rows.write_row(&mask, &row)?;
            appended += 1;
            self.progress.row(self.rows.get_ref().written);
        }
        self.row_count += appended;
        Ok(appended)
    }

    /// ✅ Close the gzip stream (trailer and all), flush to disk, and hand back the finished artifact.
    pub(crate) fn finish(mut self) -> Result<Artifact> {
        let tally = self.rows.into_inner()?;
        let uncompressed_bytes = tally.written;
        let buffered = tally
            .inner
            .finish()
            .context("💀 Failed to write the gzip trailer. The artifact would be truncated, so it isn't one.")?;
        let file = buffered
            .into_inner()
            .map_err(|err| anyhow!("💀 Failed to flush the artifact to disk: {}", err.error()))?;
        let compressed_bytes = file
            .metadata()
            .context("💀 Couldn't stat the finished artifact")?
            .len();
        drop(file);

        self.progress.finish();
        info!(
            "🗜️ Artifact ready: key={}, rows={}, plain={}, gzip={}",
            self.key,
            format_number(self.row_count),
            format_bytes(uncompressed_bytes),
            format_bytes(compressed_bytes)
        );

        Ok(Artifact {
            path: self.path,
            rows: self.row_count,
            compressed_bytes,
        })
    }
}

/// 📦 A finished, closed gzip file waiting to be uploaded. Deleted when dropped.
#[derive(Debug)]
pub(crate) struct Artifact {
    path: TempPath,
    pub(crate) rows: u64,
    pub(crate) compressed_bytes: u64,
}

impl Artifact {
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// 📖 The whole compressed payload, read fresh from the start of the file.
    pub(crate) fn read_bytes(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path)
            .with_context(|| format!("💀 Couldn't read the artifact back from '{}'", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{CellValue, Row};
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn policy() -> TimestampPolicy {
        TimestampPolicy::new(vec!["last_updated".into()], chrono_tz::America::Los_Angeles)
    }

    fn cursor<'a>(rows: Vec<Result<Row>>) -> RowCursor<'a> {
        RowCursor {
            columns: vec!["id".into(), "name".into()],
            rows: Box::new(rows.into_iter()),
        }
    }

    fn row(id: i64, name: &str) -> Result<Row> {
        Ok(Row::new(vec![CellValue::Integer(id), CellValue::text(name)]))
    }

    fn gunzip(bytes: &[u8]) -> String {
        let mut out = String::new();
        GzDecoder::new(bytes).read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn the_one_where_batches_share_one_gzip_stream() {
        let mut writer = ArtifactWriter::create("sis-data/x.gz", OutputFormat::Tsv, policy()).unwrap();
        assert_eq!(writer.append(cursor(vec![row(1, "a"), row(2, "b")])).unwrap(), 2);
        assert_eq!(writer.append(cursor(vec![row(3, "c")])).unwrap(), 1);
        assert_eq!(writer.append(cursor(vec![])).unwrap(), 0);
        let artifact = writer.finish().unwrap();

        assert_eq!(artifact.rows, 3);
        let bytes = artifact.read_bytes().unwrap();
        assert_eq!(bytes.len() as u64, artifact.compressed_bytes);
        assert_eq!(gunzip(&bytes), "1\ta\n2\tb\n3\tc\n");
    }

    #[test]
    fn the_one_where_an_empty_result_is_still_valid_gzip() {
        let artifact = ArtifactWriter::create("sis-data/empty.gz", OutputFormat::Tsv, policy())
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(artifact.rows, 0);
        assert_eq!(gunzip(&artifact.read_bytes().unwrap()), "");
    }

    #[test]
    fn the_one_where_a_mid_stream_failure_leaves_no_file_behind() {
        let mut writer = ArtifactWriter::create("sis-data/doomed.gz", OutputFormat::Tsv, policy()).unwrap();
        let path = writer.path().to_path_buf();
        assert!(path.exists());

        let result = writer.append(cursor(vec![
            row(1, "a"),
            Err(anyhow!("ORA-03113: end-of-file on communication channel")),
            row(2, "never"),
        ]));
        assert!(result.is_err());
        drop(writer);
        assert!(!path.exists(), "the partial artifact should be deleted on drop");
    }

    #[test]
    fn the_one_where_the_file_disappears_after_upload_day_is_over() {
        let artifact = ArtifactWriter::create("sis-data/y.gz", OutputFormat::Csv, policy())
            .unwrap()
            .finish()
            .unwrap();
        let path = artifact.path().to_path_buf();
        assert!(path.exists());
        drop(artifact);
        assert!(!path.exists());
    }
}
