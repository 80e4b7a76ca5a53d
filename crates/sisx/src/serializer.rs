//! 🧾 Row Serializer: turning result rows into delimited lines, one at a time.
//!
//! 🎬 *[a row arrives. it has nine cells, two NULLs, and a timestamp with a secret.]*
//! *["Render me," it says. "But keep my delimiters where they belong."]*
//!
//! 🧠 Knowledge graph:
//! - Input: a column-name list + a stream of [`Row`]s (from any `backends::Source`)
//! - Output: `\n`-terminated lines, tab- or comma-delimited, into any `io::Write`
//!   (in practice, the gzip encoder of an `artifact::ArtifactWriter`)
//! - NULL → empty field. Numbers and text → as-is. Timestamps → see [`TimestampPolicy`].
//! - Streaming only: rows are written as they're pulled. Nothing buffers a result set.
//! - TSV has no quoting, so stray tabs/newlines inside a value are flattened to a space.
//!   CSV quotes when necessary. Either way, a line splits back into its column count.
//!
//! ```text
//!   Row { [Text("x"), Null, Timestamp(..)] }
//!        │
//!        ▼  RowWriter (tsv)
//!   "x\t\t2024-01-15 04:30:00 UTC\n"
//! ```

use std::borrow::Cow;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::{Duration, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;
use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::app_config::AppConfig;
use crate::common::{CellValue, Row};

// ============================================================
//  📐 OutputFormat: tab or comma, pick your poison
// ============================================================

/// 📐 Which delimiter the artifact speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// ⇥ Tab-separated. The house default. No quoting, ever.
    #[default]
    Tsv,
    /// , Comma-separated, RFC 4180 quoting when a value needs it.
    ///
    /// A record whose only field is NULL comes out as `""`, not a blank line, so it
    /// still reads back as one empty field.
    Csv,
}

impl OutputFormat {
    pub fn delimiter(self) -> u8 {
        match self {
            Self::Tsv => b'\t',
            Self::Csv => b',',
        }
    }

    fn quote_style(self) -> QuoteStyle {
        match self {
            Self::Tsv => QuoteStyle::Never,
            Self::Csv => QuoteStyle::Necessary,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tsv" => Ok(Self::Tsv),
            "csv" => Ok(Self::Csv),
            other => Err(anyhow!(
                "💀 OUTPUT_FORMAT '{other}' is neither 'tsv' nor 'csv'. We only speak two dialects."
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tsv => write!(f, "tsv"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

// ============================================================
//  🕰️ TimestampPolicy: the one column that lies about being UTC
// ============================================================

/// 🕰️ Decides how temporal cells render.
///
/// Upstream labels every timestamp as UTC. Most of them are. The "last updated"
/// family is actually local wall-clock time, so those columns are reinterpreted in
/// the configured zone and rendered with its numeric offset:
///
/// - local-time column: `2024-01-15 04:30:00 -0800`
/// - everything else:   `2024-01-15 04:30:00 UTC`
///
/// The column list is configuration, not code. Add a name, not a branch.
#[derive(Debug, Clone)]
pub struct TimestampPolicy {
    local_columns: Vec<String>,
    zone: Tz,
}

impl TimestampPolicy {
    pub fn new(local_columns: Vec<String>, zone: Tz) -> Self {
        Self {
            local_columns,
            zone,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(config.local_time_column_list(), config.local_tz()?))
    }

    /// 🔍 ASCII case-insensitive, because Oracle SHOUTS its column names.
    pub fn is_local(&self, column: &str) -> bool {
        self.local_columns
            .iter()
            .any(|local| local.eq_ignore_ascii_case(column))
    }

    pub fn render(&self, ts: NaiveDateTime, local: bool) -> String {
        let wall_clock = ts.format("%Y-%m-%d %H:%M:%S");
        if !local {
            return format!("{wall_clock} UTC");
        }
        format!("{wall_clock} {}", format_offset(self.local_offset_seconds(ts)))
    }

    // 🧠 Ambiguous (fall back) → earlier offset. Nonexistent (spring forward gap) →
    // the offset in effect just before the gap, wall-clock digits untouched.
    fn local_offset_seconds(&self, ts: NaiveDateTime) -> i32 {
        if let Some(resolved) = self.zone.from_local_datetime(&ts).earliest() {
            return resolved.offset().fix().local_minus_utc();
        }
        match self.zone.from_local_datetime(&(ts - Duration::hours(1))).earliest() {
            Some(before_gap) => before_gap.offset().fix().local_minus_utc(),
            None => self.zone.offset_from_utc_datetime(&ts).fix().local_minus_utc(),
        }
    }
}

fn format_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let abs = seconds.unsigned_abs();
    format!("{sign}{:02}{:02}", abs / 3600, (abs % 3600) / 60)
}

// ============================================================
//  ✍️ RowWriter: the line factory
// ============================================================

/// ✍️ Streams rows into delimited lines over any writer.
///
/// Wraps a `csv::Writer` configured per [`OutputFormat`]: no headers, `\n` terminator,
/// flexible record lengths (ragged rows are the SQL's business, not ours).
pub struct RowWriter<W: Write> {
    writer: csv::Writer<W>,
    format: OutputFormat,
    policy: TimestampPolicy,
}

impl<W: Write> fmt::Debug for RowWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowWriter")
            .field("format", &self.format)
            .field("policy", &self.policy)
            .finish()
    }
}

impl<W: Write> RowWriter<W> {
    pub fn new(inner: W, format: OutputFormat, policy: TimestampPolicy) -> Self {
        let writer = WriterBuilder::new()
            .delimiter(format.delimiter())
            .quote_style(format.quote_style())
            .terminator(Terminator::Any(b'\n'))
            .has_headers(false)
            .flexible(true)
            .from_writer(inner);
        Self {
            writer,
            format,
            policy,
        }
    }

    /// 🎭 Which columns get the local-time treatment, by position.
    pub fn local_mask(&self, columns: &[String]) -> Vec<bool> {
        columns
            .iter()
            .map(|column| self.policy.is_local(column))
            .collect()
    }

    /// 📝 Write one row as one line.
    pub fn write_row(&mut self, local_mask: &[bool], row: &Row) -> Result<()> {
        let fields: Vec<Cow<'_, str>> = row
            .cells
            .iter()
            .enumerate()
            .map(|(i, cell)| self.render_cell(cell, local_mask.get(i).copied().unwrap_or(false)))
            .collect();
        self.writer
            .write_record(fields.iter().map(|field| field.as_bytes()))
            .context("💀 Failed to write a serialized row. The line was rendered, the writer said no.")
    }

    /// 🚿 Drain a whole cursor. Returns the number of rows written (0 for an empty cursor).
    pub fn write_rows<I>(&mut self, columns: &[String], rows: I) -> Result<u64>
    where
        I: IntoIterator<Item = Result<Row>>,
    {
        let mask = self.local_mask(columns);
        let mut written = 0u64;
        for row in rows {
            self.write_row(&mask, &row?)?;
            written += 1;
        }
        Ok(written)
    }

    /// 👀 Peek at the inner writer. Bytes still sitting in the csv buffer aren't there yet.
    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    /// 🗑️ Flush the csv buffer and hand back the inner writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| anyhow!("💀 Failed to flush serialized rows: {}", err.error()))
    }

    fn render_cell<'a>(&self, cell: &'a CellValue, local: bool) -> Cow<'a, str> {
        match cell {
            CellValue::Null => Cow::Borrowed(""),
            CellValue::Text(s) | CellValue::Number(s) => self.sanitize(s),
            CellValue::Integer(i) => Cow::Owned(i.to_string()),
            CellValue::Float(f) => Cow::Owned(f.to_string()),
            CellValue::Timestamp(ts) => Cow::Owned(self.policy.render(*ts, local)),
        }
    }

    // 🧹 TSV can't quote, so a tab or newline inside a value would split the line.
    fn sanitize<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if self.format != OutputFormat::Tsv
            || memchr::memchr3(b'\t', b'\n', b'\r', value.as_bytes()).is_none()
        {
            return Cow::Borrowed(value);
        }
        Cow::Owned(
            value
                .chars()
                .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
                .collect(),
        )
    }
}
