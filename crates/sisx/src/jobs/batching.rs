//! 🔁 Offset-window pagination: keep asking until a batch comes back short.
//!
//! A batch with fewer rows than `batch_size` means the window ran past the end.
//! When the total is an exact multiple of the batch size, the last real batch is
//! full, so one more (empty) batch is fetched to find that out. That's
//! `floor(total / batch_size) + 1` queries, every time.

use anyhow::{Result, ensure};
use tracing::debug;

/// 📊 How a batch loop went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct BatchTally {
    pub(crate) batches: u64,
    pub(crate) rows: u64,
}

/// 🚿 Call `run_batch(0)`, `run_batch(1)`, ... until one returns fewer than `batch_size` rows.
pub(crate) fn drain_batches(batch_size: u64, mut run_batch: impl FnMut(u64) -> Result<u64>) -> Result<BatchTally> {
    ensure!(batch_size > 0, "💀 BATCH_SIZE must be at least 1, or pagination never ends");

    let mut tally = BatchTally::default();
    loop {
        let batch_number = tally.batches;
        let rows = run_batch(batch_number)?;
        tally.batches += 1;
        tally.rows += rows;
        debug!("📦 batch {} returned {} row(s), {} so far", batch_number, rows, tally.rows);
        if rows < batch_size {
            return Ok(tally);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 🧪 Pretend table with `total` rows; each batch returns what its window covers.
    fn drain_fake_table(total: u64, batch_size: u64) -> (BatchTally, Vec<u64>) {
        let mut asked = Vec::new();
        let tally = drain_batches(batch_size, |n| {
            asked.push(n);
            let start = n * batch_size;
            Ok(total.saturating_sub(start).min(batch_size))
        })
        .unwrap();
        (tally, asked)
    }

    #[test]
    fn the_one_where_an_exact_multiple_costs_one_empty_batch() {
        let (tally, asked) = drain_fake_table(10, 10);
        assert_eq!(asked, vec![0, 1]);
        assert_eq!(tally, BatchTally { batches: 2, rows: 10 });

        let (tally, asked) = drain_fake_table(20, 10);
        assert_eq!(asked, vec![0, 1, 2]);
        assert_eq!(tally, BatchTally { batches: 3, rows: 20 });
    }

    #[test]
    fn the_one_where_the_query_count_is_floor_plus_one() {
        for (total, batch) in [(0, 5), (4, 5), (5, 5), (11, 5), (120_001, 120_000)] {
            let (tally, _) = drain_fake_table(total, batch);
            assert_eq!(tally.batches, total / batch + 1, "total={total} batch={batch}");
            assert_eq!(tally.rows, total);
        }
    }

    #[test]
    fn the_one_where_a_failed_batch_stops_everything() {
        let mut calls = 0;
        let result = drain_batches(2, |n| {
            calls += 1;
            if n == 1 { anyhow::bail!("ORA-01555: snapshot too old") } else { Ok(2) }
        });
        assert!(result.is_err());
        assert_eq!(calls, 2);
    }

    #[test]
    fn the_one_where_a_zero_batch_size_is_refused() {
        assert!(drain_batches(0, |_| Ok(0)).is_err());
    }
}
