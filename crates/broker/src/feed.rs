//! Replay Feed
//!
//! In-memory implementation of the [`DataFeed`] port over a sorted snapshot
//! series. One mutable cursor is shared by both simulation tracks; callers
//! reposition it explicitly before reading.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeSet;

use hermes_core::BookSnapshot;
use hermes_ports::{DataFeed, FeedError, FeedResult};

/// Historical order-book replay over an in-memory snapshot series
#[derive(Debug, Clone)]
pub struct ReplayFeed {
    snapshots: Vec<(DateTime<Utc>, BookSnapshot)>,
    cursor: usize,
}

impl ReplayFeed {
    /// Create a feed from a snapshot series; snapshots are sorted by
    /// timestamp
    pub fn new(mut snapshots: Vec<(DateTime<Utc>, BookSnapshot)>) -> Self {
        snapshots.sort_by_key(|(ts, _)| *ts);
        Self {
            snapshots,
            cursor: 0,
        }
    }

    /// Generate a deterministic random-walk replay series.
    ///
    /// The mid price walks up/down one price step per snapshot; each
    /// snapshot carries five levels a step apart on both sides with
    /// integer level quantities (volume tick of 1). Useful for tests and
    /// offline experiments where real replay data is unavailable.
    pub fn random_walk(
        start: DateTime<Utc>,
        steps: usize,
        interval: Duration,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let price_step = dec!(1);
        let mut mid = dec!(100);

        let snapshots = (0..steps)
            .map(|i| {
                let drift: i64 = rng.gen_range(-1..=1);
                mid += price_step * Decimal::from(drift);
                let bids: Vec<(Decimal, Decimal)> = (1..=5)
                    .map(|level| {
                        let price = mid - price_step * Decimal::from(level);
                        let quantity = Decimal::from(rng.gen_range(50..500_i64));
                        (price, quantity)
                    })
                    .collect();
                let asks: Vec<(Decimal, Decimal)> = (1..=5)
                    .map(|level| {
                        let price = mid + price_step * Decimal::from(level);
                        let quantity = Decimal::from(rng.gen_range(50..500_i64));
                        (price, quantity)
                    })
                    .collect();
                (
                    start + interval * i as i32,
                    BookSnapshot::from_levels(&bids, &asks),
                )
            })
            .collect();
        Self {
            snapshots,
            cursor: 0,
        }
    }

    /// Number of snapshots in the series
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Timestamp of the first snapshot
    pub fn first_time(&self) -> Option<DateTime<Utc>> {
        self.snapshots.first().map(|(ts, _)| *ts)
    }

    /// Timestamp of the last snapshot
    pub fn last_time(&self) -> Option<DateTime<Utc>> {
        self.snapshots.last().map(|(ts, _)| *ts)
    }
}

impl DataFeed for ReplayFeed {
    fn reset(&mut self, time: DateTime<Utc>) {
        self.cursor = self.snapshots.partition_point(|(ts, _)| *ts < time);
    }

    fn next_snapshot(&mut self) -> FeedResult<(DateTime<Utc>, BookSnapshot)> {
        if self.snapshots.is_empty() {
            return Err(FeedError::Empty);
        }
        let (ts, snapshot) = self
            .snapshots
            .get(self.cursor)
            .ok_or(FeedError::EndOfHistory)?;
        self.cursor += 1;
        Ok((*ts, snapshot.clone()))
    }

    fn past_snapshots(&self, n: usize) -> FeedResult<(Vec<DateTime<Utc>>, Vec<BookSnapshot>)> {
        if self.snapshots.is_empty() {
            return Err(FeedError::Empty);
        }
        let window = &self.snapshots[self.cursor.saturating_sub(n)..self.cursor];
        let times = window.iter().map(|(ts, _)| *ts).collect();
        let books = window.iter().map(|(_, b)| b.clone()).collect();
        Ok((times, books))
    }

    fn trading_dates(&self) -> Vec<NaiveDate> {
        let dates: BTreeSet<NaiveDate> = self
            .snapshots
            .iter()
            .map(|(ts, _)| ts.date_naive())
            .collect();
        dates.into_iter().collect()
    }
}
