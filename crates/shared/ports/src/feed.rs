use chrono::{DateTime, NaiveDate, Utc};
use hermes_core::BookSnapshot;

use crate::error::FeedResult;

/// Port for historical order-book replay
///
/// The feed is a single shared, mutable cursor over a snapshot series.
/// Consumers must reposition the cursor explicitly (`reset`) before each
/// read sequence; the benchmark and adaptive tracks interleave their reads
/// on the same cursor.
pub trait DataFeed {
    /// Reposition the cursor to the first snapshot at or after `time`
    fn reset(&mut self, time: DateTime<Utc>);

    /// Return the snapshot under the cursor and advance past it
    fn next_snapshot(&mut self) -> FeedResult<(DateTime<Utc>, BookSnapshot)>;

    /// Return up to the latest `n` snapshots at or before the cursor,
    /// oldest first
    fn past_snapshots(&self, n: usize) -> FeedResult<(Vec<DateTime<Utc>>, Vec<BookSnapshot>)>;

    /// Distinct trading dates available in the replay
    fn trading_dates(&self) -> Vec<NaiveDate>;
}
