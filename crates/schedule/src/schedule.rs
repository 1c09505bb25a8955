//! Execution Schedules
//!
//! A [`Schedule`] owns the buckets, the per-(bucket, slice) volume
//! allocation table, the event timeline and the cursors walking them. The
//! benchmark track builds its complete TWAP allocation ahead of time; the
//! adaptive track copies the benchmark's timeline and bucket metadata,
//! starts all-zero and is filled in one decision at a time by the episode
//! coordinator.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use rand::rngs::StdRng;
use rust_decimal::Decimal;

use hermes_core::{BookSnapshot, Order, ParentOrder, Side};

use crate::bucket::BucketSet;
use crate::error::{Result, ScheduleError};
use crate::event::{EventKind, ExecutionEvent};
use crate::split::split_even;
use crate::timeline::{PlacementFn, Timeline};

/// Which track a schedule belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleKind {
    /// Pre-built TWAP plan
    Benchmark,
    /// Agent-driven plan, filled in online
    Adaptive,
}

impl std::fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleKind::Benchmark => write!(f, "benchmark"),
            ScheduleKind::Adaptive => write!(f, "adaptive"),
        }
    }
}

/// One track's execution schedule and its live cursor state
#[derive(Debug, Clone)]
pub struct Schedule {
    kind: ScheduleKind,
    parent: ParentOrder,
    no_of_slices: usize,
    tick_size: Decimal,
    buckets: Arc<BucketSet>,
    timeline: Arc<Timeline>,
    /// Volume target per bucket
    bucket_volumes: Vec<Decimal>,
    /// The benchmark plan, kept immutable for action scaling
    default_allocations: Arc<Vec<Vec<Decimal>>>,
    /// Live allocation table indexed `[bucket][slice]`
    allocations: Vec<Vec<Decimal>>,
    /// Parent volume not yet realized
    vol_remaining: Decimal,
    /// Per-bucket volume not yet realized
    bucket_vol_remaining: Vec<Decimal>,
    event_idx: usize,
    slice_idx: usize,
    bucket_idx: usize,
    /// Realized volume-weighted average price, set at episode end
    vwap: Option<Decimal>,
}

impl Schedule {
    /// Build the complete TWAP benchmark schedule.
    ///
    /// The final bucket's volume is computed directly from its share of the
    /// horizon (floored to the tick) and the rest of the parent volume is
    /// split near-equally across the other buckets, so rounding error
    /// concentrates in the final bucket. Both the bucket-level and the
    /// slice-level tables are verified to sum to the parent volume within
    /// one tick.
    pub fn twap(
        parent: ParentOrder,
        no_of_slices: usize,
        rand_bucket_width: Option<u32>,
        tick_size: Decimal,
        placement: &PlacementFn,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let buckets = BucketSet::build(
            parent.start_time,
            parent.end_time,
            rand_bucket_width,
            rng,
        )?;

        let bucket_volumes = Self::split_across_buckets(parent.volume, &buckets, tick_size)?;
        let bucket_sum: Decimal = bucket_volumes.iter().sum();
        if (bucket_sum - parent.volume).abs() > tick_size {
            return Err(ScheduleError::BucketSplitMismatch {
                sum: bucket_sum,
                target: parent.volume,
            });
        }

        let timeline = Timeline::sample(&buckets, no_of_slices, placement, rng)?;

        let allocations: Vec<Vec<Decimal>> = bucket_volumes
            .iter()
            .map(|v| split_even(*v, no_of_slices, tick_size))
            .collect::<Result<_>>()?;
        let slice_sum: Decimal = allocations.iter().flatten().sum();
        if (slice_sum - parent.volume).abs() > tick_size {
            return Err(ScheduleError::SliceSplitMismatch {
                sum: slice_sum,
                target: parent.volume,
            });
        }

        debug!(
            "built TWAP schedule: {} buckets x {} slices, {} events, tick {}",
            buckets.n_buckets(),
            no_of_slices,
            timeline.len(),
            tick_size
        );

        let vol_remaining = parent.volume;
        let bucket_vol_remaining = bucket_volumes.clone();
        Ok(Self {
            kind: ScheduleKind::Benchmark,
            parent,
            no_of_slices,
            tick_size,
            buckets: Arc::new(buckets),
            timeline: Arc::new(timeline),
            bucket_volumes,
            default_allocations: Arc::new(allocations.clone()),
            allocations,
            vol_remaining,
            bucket_vol_remaining,
            event_idx: 0,
            slice_idx: 0,
            bucket_idx: 0,
            vwap: None,
        })
    }

    /// Build the adaptive schedule from an already-built benchmark.
    ///
    /// Timeline, buckets and bucket volumes are shared/copied from the
    /// benchmark; the allocation table starts all-zero and is filled in by
    /// the coordinator, held to the same per-bucket volume targets.
    pub fn adaptive(benchmark: &Schedule) -> Self {
        let allocations = benchmark
            .allocations
            .iter()
            .map(|slices| vec![Decimal::ZERO; slices.len()])
            .collect();
        Self {
            kind: ScheduleKind::Adaptive,
            parent: benchmark.parent.clone(),
            no_of_slices: benchmark.no_of_slices,
            tick_size: benchmark.tick_size,
            buckets: Arc::clone(&benchmark.buckets),
            timeline: Arc::clone(&benchmark.timeline),
            bucket_volumes: benchmark.bucket_volumes.clone(),
            default_allocations: Arc::clone(&benchmark.default_allocations),
            allocations,
            vol_remaining: benchmark.parent.volume,
            bucket_vol_remaining: benchmark.bucket_volumes.clone(),
            event_idx: 0,
            slice_idx: 0,
            bucket_idx: 0,
            vwap: None,
        }
    }

    /// Last-bucket-computed-first volume split (see [`Self::twap`])
    fn split_across_buckets(
        total: Decimal,
        buckets: &BucketSet,
        tick: Decimal,
    ) -> Result<Vec<Decimal>> {
        let n = buckets.n_buckets();
        let last_us = buckets
            .duration(n - 1)
            .num_microseconds()
            .expect("bucket width fits in microseconds");
        let total_us = buckets
            .total_duration()
            .num_microseconds()
            .expect("horizon fits in microseconds");
        let share_last = Decimal::from(last_us) / Decimal::from(total_us);
        let vol_last = (total * share_last / tick).floor() * tick;

        let mut volumes = split_even(total - vol_last, n - 1, tick)?;
        volumes.push(vol_last);
        Ok(volumes)
    }

    // === Metadata ===

    pub fn kind(&self) -> ScheduleKind {
        self.kind
    }

    pub fn direction(&self) -> Side {
        self.parent.direction
    }

    pub fn total_volume(&self) -> Decimal {
        self.parent.volume
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.parent.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.parent.end_time
    }

    pub fn no_of_slices(&self) -> usize {
        self.no_of_slices
    }

    pub fn tick_size(&self) -> Decimal {
        self.tick_size
    }

    pub fn buckets(&self) -> &BucketSet {
        &self.buckets
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn bucket_volume(&self, bucket: usize) -> Decimal {
        self.bucket_volumes[bucket]
    }

    // === Allocation table ===

    pub fn allocation(&self, bucket: usize, slice: usize) -> Decimal {
        self.allocations[bucket][slice]
    }

    /// The benchmark plan's cell, used to scale agent actions
    pub fn default_allocation(&self, bucket: usize, slice: usize) -> Decimal {
        self.default_allocations[bucket][slice]
    }

    /// Sum of the benchmark plan across one bucket
    pub fn default_bucket_allocation(&self, bucket: usize) -> Decimal {
        self.default_allocations[bucket].iter().sum()
    }

    /// Write one decision's volume into the live table
    pub fn set_allocation(&mut self, bucket: usize, slice: usize, volume: Decimal) {
        self.allocations[bucket][slice] = volume;
    }

    // === Remaining volume ===

    pub fn vol_remaining(&self) -> Decimal {
        self.vol_remaining
    }

    pub fn bucket_vol_remaining(&self, bucket: usize) -> Decimal {
        self.bucket_vol_remaining[bucket]
    }

    /// Remaining volume of the bucket under the cursor
    pub fn current_bucket_remaining(&self) -> Decimal {
        self.bucket_vol_remaining[self.bucket_idx]
    }

    // === Cursor ===

    pub fn event_idx(&self) -> usize {
        self.event_idx
    }

    pub fn bucket_idx(&self) -> usize {
        self.bucket_idx
    }

    pub fn slice_idx(&self) -> usize {
        self.slice_idx
    }

    /// Timestamp of the event under the cursor, without consuming it
    pub fn peek_next_time(&self) -> DateTime<Utc> {
        self.timeline.events()[self.event_idx]
    }

    /// Consume the event under the cursor.
    ///
    /// Returns the classified event and whether the timeline is exhausted;
    /// on the last event the cursor wraps back to the start.
    pub fn next_event(&mut self) -> (ExecutionEvent, bool) {
        let time = self.timeline.events()[self.event_idx];
        let kind = self.timeline.classify(time);
        let done = if self.event_idx == self.timeline.len() - 1 {
            self.event_idx = 0;
            true
        } else {
            self.event_idx += 1;
            false
        };
        (ExecutionEvent::new(time, kind), done)
    }

    /// Generate the child order for an event.
    ///
    /// An order placement yields a resting limit order one tick inside the
    /// best bid/ask, sized at the current allocation cell, and advances the
    /// slice cursor (wrapping per bucket). A bucket bound yields a
    /// marketable order sweeping the bucket's entire remaining volume and
    /// leaves the slice cursor alone.
    pub fn order_at_event(&mut self, event: &ExecutionEvent, book: &BookSnapshot) -> Result<Order> {
        let side = self.parent.direction;
        let order = match event.kind {
            EventKind::OrderPlacement => {
                let price = match side {
                    Side::Buy => {
                        let (best_bid, _) =
                            book.best_bid().ok_or(ScheduleError::MissingBestPrice {
                                side: "bid".into(),
                            })?;
                        best_bid - self.tick_size
                    }
                    Side::Sell => {
                        let (best_ask, _) =
                            book.best_ask().ok_or(ScheduleError::MissingBestPrice {
                                side: "ask".into(),
                            })?;
                        best_ask + self.tick_size
                    }
                };
                let quantity = self.allocations[self.bucket_idx][self.slice_idx];
                self.slice_idx += 1;
                Order::limit(side, quantity, price, event.time)
            }
            EventKind::BucketBound => Order::market(
                side,
                self.bucket_vol_remaining[self.bucket_idx],
                event.time,
            ),
        };
        if self.slice_idx >= self.no_of_slices {
            self.slice_idx = 0;
        }
        Ok(order)
    }

    /// Account a realized fill against the global and per-bucket remaining
    /// volume.
    ///
    /// Both counters are floored at one tick below zero; crossing the floor
    /// is a fatal consistency error.
    pub fn apply_fill(&mut self, quantity: Decimal) -> Result<()> {
        if quantity > Decimal::ZERO {
            self.vol_remaining -= quantity;
            self.bucket_vol_remaining[self.bucket_idx] -= quantity;
        }
        if self.vol_remaining < -self.tick_size {
            return Err(ScheduleError::VolumeOverdraw {
                scope: "parent order".into(),
                remaining: self.vol_remaining,
                tick: self.tick_size,
            });
        }
        if self.bucket_vol_remaining[self.bucket_idx] < -self.tick_size {
            return Err(ScheduleError::VolumeOverdraw {
                scope: format!("bucket {}", self.bucket_idx),
                remaining: self.bucket_vol_remaining[self.bucket_idx],
                tick: self.tick_size,
            });
        }
        Ok(())
    }

    /// Advance the bucket cursor after the bucket's residual order settled
    pub fn complete_bucket(&mut self) {
        self.bucket_idx += 1;
    }

    // === Episode result ===

    pub fn set_vwap(&mut self, vwap: Decimal) {
        self.vwap = Some(vwap);
    }

    pub fn vwap(&self) -> Option<Decimal> {
        self.vwap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::default_placement;
    use chrono::{Duration, TimeZone};
    use rand::SeedableRng;
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 21, 10, 0, 0).unwrap()
    }

    fn make_parent(minutes: i64) -> ParentOrder {
        ParentOrder::new(
            Side::Buy,
            dec!(1000),
            t0(),
            t0() + Duration::minutes(minutes),
        )
    }

    fn make_benchmark(seed: u64) -> Schedule {
        let mut rng = StdRng::seed_from_u64(seed);
        Schedule::twap(
            make_parent(5),
            3,
            None,
            dec!(1),
            &default_placement,
            &mut rng,
        )
        .unwrap()
    }

    fn make_book() -> BookSnapshot {
        BookSnapshot::from_levels(
            &[(dec!(99), dec!(50.0)), (dec!(100), dec!(20.0))],
            &[(dec!(101), dec!(30.0)), (dec!(102), dec!(60.0))],
        )
    }

    #[test]
    fn test_bucket_volumes_sum_within_one_tick() {
        for seed in 0..10 {
            let schedule = make_benchmark(seed);
            let sum: Decimal = (0..schedule.buckets().n_buckets())
                .map(|i| schedule.bucket_volume(i))
                .sum();
            assert!((sum - dec!(1000)).abs() <= dec!(1));
        }
    }

    #[test]
    fn test_slice_volumes_sum_to_bucket_volume() {
        let schedule = make_benchmark(1);
        for bucket in 0..schedule.buckets().n_buckets() {
            let sum: Decimal = (0..3).map(|s| schedule.allocation(bucket, s)).sum();
            assert!((sum - schedule.bucket_volume(bucket)).abs() <= dec!(1));
        }
    }

    #[test]
    fn test_identical_seeds_identical_schedules() {
        let a = make_benchmark(42);
        let b = make_benchmark(42);
        assert_eq!(a.buckets().bounds(), b.buckets().bounds());
        assert_eq!(a.timeline().events(), b.timeline().events());
        assert_eq!(a.allocations, b.allocations);
    }

    #[test]
    fn test_event_cursor_wraps_with_done() {
        let mut schedule = make_benchmark(2);
        let total = schedule.timeline().len();
        for i in 0..total {
            let (event, done) = schedule.next_event();
            assert_eq!(event.time, schedule.timeline().events()[i]);
            assert_eq!(done, i == total - 1);
        }
        // wrapped back to the first event
        assert_eq!(schedule.event_idx(), 0);
    }

    #[test]
    fn test_limit_order_priced_one_tick_inside() {
        let mut schedule = make_benchmark(3);
        let book = make_book();
        let (event, _) = schedule.next_event();
        assert_eq!(event.kind, EventKind::OrderPlacement);
        let order = schedule.order_at_event(&event, &book).unwrap();
        assert_eq!(order.price, Some(dec!(99))); // best bid 100 - tick 1
        assert_eq!(order.quantity, schedule.default_allocation(0, 0));
        assert_eq!(schedule.slice_idx(), 1);

        let sell_parent = ParentOrder::new(Side::Sell, dec!(1000), t0(), t0() + Duration::minutes(5));
        let mut rng = StdRng::seed_from_u64(3);
        let mut sell =
            Schedule::twap(sell_parent, 3, None, dec!(1), &default_placement, &mut rng).unwrap();
        let (event, _) = sell.next_event();
        let order = sell.order_at_event(&event, &book).unwrap();
        assert_eq!(order.price, Some(dec!(102))); // best ask 101 + tick 1
    }

    #[test]
    fn test_bucket_bound_sweeps_remaining_without_slice_advance() {
        let mut schedule = make_benchmark(4);
        // drain the first bucket's decision events
        for _ in 0..3 {
            let (event, _) = schedule.next_event();
            assert_eq!(event.kind, EventKind::OrderPlacement);
            schedule.order_at_event(&event, &make_book()).unwrap();
        }
        // slice cursor wrapped after the last slice
        assert_eq!(schedule.slice_idx(), 0);

        schedule.apply_fill(dec!(30)).unwrap();
        let (bound, _) = schedule.next_event();
        assert_eq!(bound.kind, EventKind::BucketBound);
        let order = schedule.order_at_event(&bound, &make_book()).unwrap();
        assert_eq!(order.quantity, schedule.bucket_volume(0) - dec!(30));
        assert_eq!(order.price, None);
        assert_eq!(schedule.slice_idx(), 0);
    }

    #[test]
    fn test_overdraw_is_fatal() {
        let mut schedule = make_benchmark(5);
        let bucket_vol = schedule.bucket_volume(0);
        // one tick over the floor is fine
        schedule.apply_fill(bucket_vol + dec!(1)).unwrap();
        // anything past it blows up
        let err = schedule.apply_fill(dec!(1));
        assert!(matches!(err, Err(ScheduleError::VolumeOverdraw { .. })));
    }

    #[test]
    fn test_adaptive_mirrors_benchmark_with_zero_allocations() {
        let benchmark = make_benchmark(6);
        let adaptive = Schedule::adaptive(&benchmark);
        assert_eq!(adaptive.kind(), ScheduleKind::Adaptive);
        assert_eq!(adaptive.timeline().events(), benchmark.timeline().events());
        assert_eq!(adaptive.buckets().bounds(), benchmark.buckets().bounds());
        assert_eq!(adaptive.vol_remaining(), benchmark.total_volume());
        for bucket in 0..adaptive.buckets().n_buckets() {
            assert_eq!(
                adaptive.bucket_vol_remaining(bucket),
                benchmark.bucket_volume(bucket)
            );
            for slice in 0..adaptive.no_of_slices() {
                assert_eq!(adaptive.allocation(bucket, slice), Decimal::ZERO);
                assert_eq!(
                    adaptive.default_allocation(bucket, slice),
                    benchmark.allocation(bucket, slice)
                );
            }
        }
    }

    #[test]
    fn test_last_bucket_volume_proportional_to_tail() {
        // 4m10s horizon: 8 whole 30s buckets + one 10s tail; the tail gets
        // floor(1000 * 10/250) = 40 and the rest splits across 8 buckets
        let parent = ParentOrder::new(Side::Buy, dec!(1000), t0(), t0() + Duration::seconds(250));
        let mut rng = StdRng::seed_from_u64(0);
        let schedule =
            Schedule::twap(parent, 2, None, dec!(1), &default_placement, &mut rng).unwrap();
        let n = schedule.buckets().n_buckets();
        assert_eq!(schedule.bucket_volume(n - 1), dec!(40));
        let head_sum: Decimal = (0..n - 1).map(|i| schedule.bucket_volume(i)).sum();
        assert_eq!(head_sum, dec!(960));
    }
}
