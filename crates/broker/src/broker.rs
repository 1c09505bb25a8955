//! Broker
//!
//! Drives one or both schedule tracks against the shared replay feed:
//! generates orders at schedule events, simulates their execution, keeps an
//! append-only trade log per track and computes VWAPs from those logs.
//!
//! Fill model: a resting limit order fills in full at its limit price on
//! the first replayed snapshot whose opposite best crosses it (the resting
//! order sets the price); a marketable order walks the opposite levels of
//! the current snapshot, one fill per consumed level. An instruction for a
//! track supersedes any order still resting for that track.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use rust_decimal::Decimal;

use hermes_core::{BookSnapshot, Fill, Order, OrderType, Side};
use hermes_ports::DataFeed;
use hermes_schedule::{EventKind, ExecutionEvent, Schedule, ScheduleKind};

use crate::error::Result;

/// Per-track execution state
#[derive(Debug, Clone)]
struct Track {
    fills: Vec<Fill>,
    resting: Option<Order>,
    /// Replay position of this track; the shared feed cursor is moved here
    /// before every read on the track's behalf
    clock: DateTime<Utc>,
}

impl Track {
    fn new() -> Self {
        Self {
            fills: Vec::new(),
            resting: None,
            clock: DateTime::<Utc>::MIN_UTC,
        }
    }
}

/// Simulated broker over a shared data feed
pub struct Broker<F: DataFeed> {
    feed: F,
    benchmark: Track,
    adaptive: Track,
}

impl<F: DataFeed> Broker<F> {
    pub fn new(feed: F) -> Self {
        Self {
            feed,
            benchmark: Track::new(),
            adaptive: Track::new(),
        }
    }

    /// Access the shared feed (observation building, tick derivation)
    pub fn feed_mut(&mut self) -> &mut F {
        &mut self.feed
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    fn track(&self, kind: ScheduleKind) -> &Track {
        match kind {
            ScheduleKind::Benchmark => &self.benchmark,
            ScheduleKind::Adaptive => &self.adaptive,
        }
    }

    fn track_mut(&mut self, kind: ScheduleKind) -> &mut Track {
        match kind {
            ScheduleKind::Benchmark => &mut self.benchmark,
            ScheduleKind::Adaptive => &mut self.adaptive,
        }
    }

    /// Clear a track's log and resting order and rewind it to the
    /// schedule's start
    pub fn reset(&mut self, schedule: &Schedule) {
        let start = schedule.start_time();
        let track = self.track_mut(schedule.kind());
        track.fills.clear();
        track.resting = None;
        track.clock = start;
        self.feed.reset(start);
    }

    /// Advance the track's replay up to the schedule's next timeline event.
    ///
    /// Any resting limit order is matched against each replayed snapshot on
    /// the way. Returns the consumed event, whether the schedule is
    /// exhausted, and the book at the event.
    pub fn simulate_to_next_event(
        &mut self,
        schedule: &mut Schedule,
    ) -> Result<(ExecutionEvent, bool, BookSnapshot)> {
        let kind = schedule.kind();
        let target = schedule.peek_next_time();
        self.feed.reset(self.track(kind).clock);

        let book = loop {
            let (ts, snapshot) = self.feed.next_snapshot()?;
            self.cross_resting(kind, schedule, ts, &snapshot)?;
            if ts >= target {
                break snapshot;
            }
        };

        self.track_mut(kind).clock = target;
        let (event, done) = schedule.next_event();
        debug!(
            "{} track at {} ({}), done={}",
            kind, event.time, event.kind, done
        );
        Ok((event, done, book))
    }

    /// Generate and submit the order for an event.
    ///
    /// `volume` overrides the allocation-table quantity (used for adaptive
    /// decisions). Limit orders rest until crossed; marketable orders fill
    /// immediately against the given book and complete the bucket. Returns
    /// the pass-through `done` flag.
    pub fn place_next_order(
        &mut self,
        schedule: &mut Schedule,
        event: &ExecutionEvent,
        done: bool,
        book: &BookSnapshot,
        volume: Option<Decimal>,
    ) -> Result<bool> {
        let kind = schedule.kind();
        // a new instruction supersedes whatever is still resting
        self.track_mut(kind).resting = None;

        let mut order = schedule.order_at_event(event, book)?;
        if let Some(v) = volume {
            order.quantity = v;
        }

        match order.order_type {
            OrderType::Limit => {
                if order.quantity > Decimal::ZERO {
                    self.track_mut(kind).resting = Some(order);
                }
            }
            OrderType::Market => {
                let fills = Self::execute_marketable(&order, book, event.time);
                for fill in &fills {
                    schedule.apply_fill(fill.quantity)?;
                }
                self.track_mut(kind).fills.extend(fills);
                if event.kind == EventKind::BucketBound {
                    schedule.complete_bucket();
                }
            }
        }
        Ok(done)
    }

    /// Match a resting limit order against one replayed snapshot
    fn cross_resting(
        &mut self,
        kind: ScheduleKind,
        schedule: &mut Schedule,
        ts: DateTime<Utc>,
        snapshot: &BookSnapshot,
    ) -> Result<()> {
        let Some(order) = &self.track(kind).resting else {
            return Ok(());
        };
        let limit = order.price.expect("resting orders carry a price");
        let crossed = match order.side {
            Side::Buy => snapshot.best_ask().is_some_and(|(ask, _)| ask <= limit),
            Side::Sell => snapshot.best_bid().is_some_and(|(bid, _)| bid >= limit),
        };
        if !crossed {
            return Ok(());
        }

        let fill = Fill::new(ts, order.side, limit, order.quantity);
        debug!(
            "{} resting order crossed at {}: {} @ {}",
            kind, ts, fill.quantity, fill.price
        );
        schedule.apply_fill(fill.quantity)?;
        let track = self.track_mut(kind);
        track.fills.push(fill);
        track.resting = None;
        Ok(())
    }

    /// Fill a marketable order by walking the opposite side of the book
    fn execute_marketable(order: &Order, book: &BookSnapshot, ts: DateTime<Utc>) -> Vec<Fill> {
        let mut remaining = order.quantity;
        let mut fills = Vec::new();
        if remaining <= Decimal::ZERO {
            return fills;
        }

        let levels = match order.side {
            Side::Buy => book.top_asks(usize::MAX),
            Side::Sell => book.top_bids(usize::MAX),
        };
        for (price, available) in levels {
            let taken = remaining.min(available);
            fills.push(Fill::new(ts, order.side, price, taken));
            remaining -= taken;
            if remaining <= Decimal::ZERO {
                break;
            }
        }
        if remaining > Decimal::ZERO {
            warn!(
                "marketable order only partially filled: {} of {} left unexecuted",
                remaining, order.quantity
            );
        }
        fills
    }

    // === Trade logs ===

    /// The track's realized fills, oldest first
    pub fn fills(&self, kind: ScheduleKind) -> &[Fill] {
        &self.track(kind).fills
    }

    /// Timestamp of the track's most recent fill
    pub fn latest_fill_time(&self, kind: ScheduleKind) -> Option<DateTime<Utc>> {
        self.track(kind).fills.last().map(|f| f.timestamp)
    }

    /// Volume-weighted average price of both tracks over a window of the
    /// trade logs (bounds inclusive; `None` takes the whole episode).
    /// A track with no fills in the window yields `None`.
    pub fn vwap_from_logs(
        &self,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> (Option<Decimal>, Option<Decimal>) {
        (
            vwap_over(&self.benchmark.fills, window),
            vwap_over(&self.adaptive.fills, window),
        )
    }
}

/// Volume-weighted average price of the fills inside a window (bounds
/// inclusive; `None` takes all fills). `None` when nothing traded.
pub fn vwap_over(fills: &[Fill], window: Option<(DateTime<Utc>, DateTime<Utc>)>) -> Option<Decimal> {
    let mut notional = Decimal::ZERO;
    let mut volume = Decimal::ZERO;
    for fill in fills {
        if let Some((start, end)) = window {
            if fill.timestamp < start || fill.timestamp > end {
                continue;
            }
        }
        notional += fill.notional();
        volume += fill.quantity;
    }
    if volume > Decimal::ZERO {
        Some(notional / volume)
    } else {
        None
    }
}
