//! 📊 progress.rs: "Are we there yet?" Every extract, every night, forever.
//!
//! 🚀 Answers the age-old question "how many rows so far?" with a spinner, a row
//! count, a byte count, and a rate that doesn't look like a seismograph.
//!
//! ⚠️ Watching this spinner will not make the source database go faster.
//! Neither will refreshing it. We've tried. Science says no.
//!
//! 🧠 Knowledge graph:
//! - One `ProgressMetrics` per artifact, owned by `artifact::ArtifactWriter`
//! - Total row count is unknowable up front (it's a cursor), so it's a spinner, not a bar
//! - indicatif hides itself when stderr isn't a terminal, so cron logs stay clean

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

// -- 📏 one mebibyte. not a megabyte, pedants. there's a difference and I will die on this hill.
const MIB: u64 = 1024 * 1024;

// -- 🔄 redraw every this many rows; redrawing per row would be a performance art piece
const RENDER_EVERY_ROWS: u64 = 5_000;

/// 📦 Raw bytes → something a human can read at 3am.
pub(crate) fn format_bytes(bytes: u64) -> String {
    if bytes >= MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= 1024 {
        format!("{:.2} KiB", bytes as f64 / 1024.0)
    } else {
        // -- 🐛 raw bytes mode. small artifacts need love too.
        format!("{} bytes", bytes)
    }
}

/// 🔢 "1000000" → "1,000,000", for the 3 people in the audience who like readability.
pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ MM:SS or HH:MM:SS. If it shows hours, call your mom. It's been a while.
pub(crate) fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 📊 Tracks rows and bytes flowing into one artifact.
///
/// Uses a sliding 5-second window for the rows/s rate so one slow batch round trip
/// doesn't scare anybody.
pub(crate) struct ProgressMetrics {
    /// 🏷️ what are we even extracting? the destination key, usually
    label: String,
    total_rows: u64,
    /// 📦 uncompressed bytes the serializer has pushed into gzip so far
    total_bytes: u64,
    rows_since_render: u64,
    progress_bar: ProgressBar,
    /// 🔄 (timestamp, rows) samples for the rate window
    rate_samples: VecDeque<(Instant, u64)>,
    start_time: Instant,
}

impl std::fmt::Debug for ProgressMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("ProgressMetrics")
            .field("label", &self.label)
            .field("total_rows", &self.total_rows)
            .field("total_bytes", &self.total_bytes)
            .finish()
    }
}

impl ProgressMetrics {
    pub(crate) fn new(label: impl Into<String>) -> Self {
        let progress_bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            progress_bar.set_style(style);
        }
        progress_bar.enable_steady_tick(Duration::from_millis(250));

        let start_time = Instant::now();
        let mut rate_samples = VecDeque::new();
        // -- 🔄 seed the window with t=0 so we don't divide by zero like animals
        rate_samples.push_back((start_time, 0u64));

        Self {
            label: label.into(),
            total_rows: 0,
            total_bytes: 0,
            rows_since_render: 0,
            progress_bar,
            rate_samples,
            start_time,
        }
    }

    /// 🔄 Count one more row, with the running byte total. Re-renders every few thousand rows.
    pub(crate) fn row(&mut self, bytes_so_far: u64) {
        self.total_rows += 1;
        self.total_bytes = bytes_so_far;
        self.rows_since_render += 1;
        if self.rows_since_render >= RENDER_EVERY_ROWS {
            self.rows_since_render = 0;
            let rate = self.rows_per_sec();
            self.render(rate);
        }
    }

    /// ✅ Stop the spinner and leave a final line behind.
    pub(crate) fn finish(&mut self) {
        let rate = self.rows_per_sec();
        self.render(rate);
        self.progress_bar.finish_and_clear();
    }

    fn rows_per_sec(&mut self) -> f64 {
        let now = Instant::now();
        let window = Duration::from_secs(5);
        while let Some(&(timestamp, _)) = self.rate_samples.front() {
            if now.duration_since(timestamp) > window {
                self.rate_samples.pop_front();
            } else {
                break;
            }
        }
        self.rate_samples.push_back((now, self.total_rows));

        if let Some(&(oldest_time, oldest_rows)) = self.rate_samples.front() {
            let elapsed = now.duration_since(oldest_time).as_secs_f64();
            if elapsed > 0.0 {
                return self.total_rows.saturating_sub(oldest_rows) as f64 / elapsed;
            }
        }
        0.0
    }

    fn render(&self, rows_per_sec: f64) {
        self.progress_bar.set_message(format!(
            "{} | {} rows | {} | {} rows/s | {} elapsed",
            self.label,
            format_number(self.total_rows),
            format_bytes(self.total_bytes),
            format_number(rows_per_sec as u64),
            format_duration(self.start_time.elapsed()),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_numbers_get_their_commas() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(120000), "120,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn the_one_where_bytes_pick_a_unit() {
        assert_eq!(format_bytes(12), "12 bytes");
        assert_eq!(format_bytes(2048), "2.00 KiB");
        assert_eq!(format_bytes(3 * MIB), "3.00 MiB");
    }

    #[test]
    fn the_one_where_durations_grow_an_hour_column() {
        assert_eq!(format_duration(Duration::from_secs(65)), "01:05");
        assert_eq!(format_duration(Duration::from_secs(3725)), "01:02:05");
    }

    #[test]
    fn the_one_where_rows_are_counted() {
        let mut progress = ProgressMetrics::new("sis-data/test.gz");
        for n in 0..(RENDER_EVERY_ROWS + 3) {
            progress.row(n * 10);
        }
        progress.finish();
        let rendered = format!("{progress:?}");
        assert!(rendered.contains(&format!("total_rows: {}", RENDER_EVERY_ROWS + 3)));
        assert!(rendered.contains(&format!("total_bytes: {}", (RENDER_EVERY_ROWS + 2) * 10)));
    }
}
