//! Dual-Track Episode Coordinator
//!
//! [`ExecutionEnv`] owns the broker, the episode random source and both
//! schedules, and drives them through one episode: `reset` builds the
//! benchmark, derives the adaptive schedule from it and advances both to
//! the shared first event; `step` converts an agent action into a volume
//! for the adaptive track's current cell and advances both tracks through
//! the next decision, enforcing that they stay on identical timestamps and
//! terminate together. Any divergence is a fatal invariant violation, never
//! silently tolerated.

use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_decimal::Decimal;

use hermes_broker::Broker;
use hermes_core::{BookSnapshot, ParentOrder};
use hermes_ports::DataFeed;
use hermes_schedule::{
    EventKind, ExecutionEvent, PlacementFn, Schedule, ScheduleKind, default_placement,
};

use crate::action::{Action, ActionMapping};
use crate::config::EnvConfig;
use crate::episode::{EpisodeParams, sample_params};
use crate::error::{Result, SimError};
use crate::observation::build_observation;
use crate::reward::{RewardContext, RewardPolicy};

/// Outcome of one `step`
#[derive(Debug, Clone)]
pub struct StepResult {
    pub observation: Vec<f64>,
    pub reward: f64,
    pub done: bool,
}

/// Live state of one episode
struct Episode {
    benchmark: Schedule,
    adaptive: Schedule,
    event_bmk: ExecutionEvent,
    done_bmk: bool,
    book_bmk: BookSnapshot,
    event_rl: ExecutionEvent,
    done_rl: bool,
    book_rl: BookSnapshot,
    /// End of the elapsed step window (latest realized trade)
    event_time: DateTime<Utc>,
    /// End of the latest completed-bucket window
    bucket_time: DateTime<Utc>,
    bucket_time_bmk: Option<DateTime<Utc>>,
    bucket_time_rl: Option<DateTime<Utc>>,
    /// Index of the next unconsumed timeline event
    state_idx: usize,
    /// Bucket the last decision ran in (trails the schedule cursor)
    bucket_idx: usize,
    done: bool,
}

/// The episode coordinator
pub struct ExecutionEnv<F: DataFeed> {
    config: EnvConfig,
    action_mapping: ActionMapping,
    reward_policy: RewardPolicy,
    placement: Box<PlacementFn>,
    broker: Broker<F>,
    rng: StdRng,
    reset_counter: u32,
    params: Option<EpisodeParams>,
    episode: Option<Episode>,
}

impl<F: DataFeed> ExecutionEnv<F> {
    /// Create a coordinator over a data feed. Defaults: raw action mapping,
    /// per-step percentage reward, uniform decision placement.
    pub fn new(feed: F, config: EnvConfig) -> Result<Self> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            action_mapping: ActionMapping::Raw,
            reward_policy: RewardPolicy::PctPerStep,
            placement: Box::new(default_placement),
            broker: Broker::new(feed),
            rng,
            reset_counter: 0,
            params: None,
            episode: None,
            config,
        })
    }

    pub fn with_action_mapping(mut self, mapping: ActionMapping) -> Self {
        self.action_mapping = mapping;
        self
    }

    pub fn with_reward_policy(mut self, policy: RewardPolicy) -> Self {
        self.reward_policy = policy;
        self
    }

    /// Replace the decision-time placement function
    pub fn with_placement(
        mut self,
        placement: impl Fn(usize, &mut StdRng) -> Vec<f64> + 'static,
    ) -> Self {
        self.placement = Box::new(placement);
        self
    }

    /// Start a fresh episode and return the initial observation.
    ///
    /// On the configured cadence the parent-order parameters are redrawn
    /// from their ranges; the benchmark schedule is then built (deriving
    /// the tick size from the first snapshot of the horizon), the adaptive
    /// schedule is derived from it, and both are advanced to their first
    /// event, which must coincide.
    pub fn reset(&mut self) -> Result<Vec<f64>> {
        if self.params.is_none() || self.reset_counter >= self.config.reset.reset_num_episodes {
            let dates = self.broker.feed().trading_dates();
            self.params = Some(sample_params(&self.config, &dates, &mut self.rng)?);
            self.reset_counter = 0;
        }
        self.reset_counter += 1;
        let params = self.params.clone().expect("params sampled above");
        debug!(
            "episode: {} {} over {}m from {}, {} slices",
            params.direction, params.volume, params.exec_minutes, params.start_time,
            params.no_of_slices
        );

        // tick size implied by the first snapshot of the horizon
        let feed = self.broker.feed_mut();
        feed.reset(params.start_time);
        let (_, first_book) = feed.next_snapshot()?;
        let tick_size = first_book.volume_tick().ok_or(SimError::NoTickSize)?;

        let parent = ParentOrder::new(
            params.direction,
            params.volume,
            params.start_time,
            params.end_time(),
        );
        let mut benchmark = Schedule::twap(
            parent,
            params.no_of_slices,
            params.rand_bucket_width,
            tick_size,
            &*self.placement,
            &mut self.rng,
        )?;
        self.broker.reset(&benchmark);
        let (event_bmk, done_bmk, book_bmk) = self.broker.simulate_to_next_event(&mut benchmark)?;

        let mut adaptive = Schedule::adaptive(&benchmark);
        self.broker.reset(&adaptive);
        let (event_rl, done_rl, book_rl) = self.broker.simulate_to_next_event(&mut adaptive)?;

        if event_rl.time != event_bmk.time {
            return Err(SimError::DesynchronizedEvents {
                benchmark: event_bmk.time,
                adaptive: event_rl.time,
            });
        }

        let first_event_time = benchmark.timeline().events()[0];
        let observation = build_observation(
            first_event_time,
            self.broker.feed_mut(),
            &self.config.obs,
            &adaptive,
            0,
        )?;

        let shared_time = event_rl.time;
        self.episode = Some(Episode {
            benchmark,
            adaptive,
            event_bmk,
            done_bmk,
            book_bmk,
            event_rl,
            done_rl,
            book_rl,
            event_time: shared_time,
            bucket_time: shared_time,
            bucket_time_bmk: None,
            bucket_time_rl: None,
            state_idx: 0,
            bucket_idx: 0,
            done: false,
        });
        Ok(observation)
    }

    /// Advance both tracks through one decision.
    ///
    /// The action sizes the adaptive track's current (bucket, slice) cell;
    /// both schedules then place their order and replay forward, sweeping
    /// the bucket residual whenever the advance lands on a bucket bound (a
    /// single `step` may therefore consume two timeline events). The tracks
    /// must report identical timestamps and termination afterwards.
    pub fn step(&mut self, action: Action) -> Result<StepResult> {
        let Self {
            broker,
            episode,
            config,
            action_mapping,
            reward_policy,
            ..
        } = self;
        let ep = episode.as_mut().ok_or(SimError::EpisodeNotRunning)?;
        if ep.done {
            return Err(SimError::EpisodeNotRunning);
        }

        let factor = action_mapping.scaling_factor(action, ep.adaptive.no_of_slices())?;
        let volume = infer_volume(&ep.adaptive, factor);
        ep.adaptive
            .set_allocation(ep.adaptive.bucket_idx(), ep.adaptive.slice_idx(), volume);
        debug!("decision: factor {factor} -> volume {volume}");

        let event_time_prev = ep.event_bmk.time;
        let bucket_time_prev = ep.bucket_time;

        let (event, done, book, bucket_closed) = advance_track(
            broker,
            &mut ep.benchmark,
            &ep.event_bmk,
            ep.done_bmk,
            &ep.book_bmk,
            None,
        )?;
        ep.event_bmk = event;
        ep.done_bmk = done;
        ep.book_bmk = book;
        if let Some(t) = bucket_closed {
            ep.bucket_time_bmk = Some(t);
            ep.state_idx += 1;
        }

        let (event, done, book, bucket_closed) = advance_track(
            broker,
            &mut ep.adaptive,
            &ep.event_rl,
            ep.done_rl,
            &ep.book_rl,
            Some(volume),
        )?;
        ep.event_rl = event;
        ep.done_rl = done;
        ep.book_rl = book;
        if let Some(t) = bucket_closed {
            ep.bucket_time_rl = Some(t);
        }

        if ep.done_bmk != ep.done_rl {
            return Err(SimError::DesynchronizedTermination {
                benchmark: ep.done_bmk,
                adaptive: ep.done_rl,
            });
        }
        if ep.event_bmk.time != ep.event_rl.time {
            return Err(SimError::DesynchronizedEvents {
                benchmark: ep.event_bmk.time,
                adaptive: ep.event_rl.time,
            });
        }

        // the step window closes at the latest realized trade of either track
        ep.event_time = match (
            broker.latest_fill_time(ScheduleKind::Benchmark),
            broker.latest_fill_time(ScheduleKind::Adaptive),
        ) {
            (Some(b), Some(a)) => b.max(a),
            (Some(b), None) => b,
            (None, Some(a)) => a,
            (None, None) => ep.event_rl.time,
        };
        if let (Some(b), Some(a)) = (ep.bucket_time_bmk, ep.bucket_time_rl) {
            ep.bucket_time = b.max(a);
        }

        ep.done = ep.done_rl;
        let ctx = RewardContext {
            direction: ep.benchmark.direction(),
            step_window: (event_time_prev, ep.event_time),
            bucket_window: (ep.bucket_time != bucket_time_prev)
                .then_some((bucket_time_prev, ep.bucket_time)),
            episode_done: ep.done,
            bucket_volume: ep.benchmark.default_bucket_allocation(ep.bucket_idx),
        };
        let reward = reward_policy.evaluate(
            broker.fills(ScheduleKind::Benchmark),
            broker.fills(ScheduleKind::Adaptive),
            &ctx,
        );

        ep.state_idx += 1;
        let observation = if !ep.done {
            ep.bucket_idx = ep.adaptive.bucket_idx();
            let t = ep.benchmark.timeline().events()[ep.state_idx];
            if ep.benchmark.buckets().is_bound(t) {
                return Err(SimError::ObservationAtBucketBound(t));
            }
            build_observation(t, broker.feed_mut(), &config.obs, &ep.adaptive, ep.bucket_idx)?
        } else {
            let t = broker
                .latest_fill_time(ScheduleKind::Adaptive)
                .unwrap_or(ep.event_rl.time);
            build_observation(t, broker.feed_mut(), &config.obs, &ep.adaptive, ep.bucket_idx)?
        };

        if ep.done {
            let (bmk_vwap, rl_vwap) = broker.vwap_from_logs(None);
            if let Some(v) = bmk_vwap {
                ep.benchmark.set_vwap(v);
            }
            if let Some(v) = rl_vwap {
                ep.adaptive.set_vwap(v);
            }
            info!(
                "episode done: benchmark vwap {:?}, adaptive vwap {:?}",
                bmk_vwap, rl_vwap
            );
        }

        Ok(StepResult {
            observation,
            reward,
            done: ep.done,
        })
    }

    // === Inspection ===

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn broker(&self) -> &Broker<F> {
        &self.broker
    }

    /// The current episode's sampled parameters
    pub fn params(&self) -> Option<&EpisodeParams> {
        self.params.as_ref()
    }

    pub fn benchmark(&self) -> Option<&Schedule> {
        self.episode.as_ref().map(|ep| &ep.benchmark)
    }

    pub fn adaptive(&self) -> Option<&Schedule> {
        self.episode.as_ref().map(|ep| &ep.adaptive)
    }

    pub fn is_done(&self) -> bool {
        self.episode.as_ref().is_none_or(|ep| ep.done)
    }

    pub fn benchmark_vwap(&self) -> Option<Decimal> {
        self.episode.as_ref().and_then(|ep| ep.benchmark.vwap())
    }

    pub fn adaptive_vwap(&self) -> Option<Decimal> {
        self.episode.as_ref().and_then(|ep| ep.adaptive.vwap())
    }
}

/// One track's two-phase advance: place the pending order, replay to the
/// next event and, when that event is a bucket bound, immediately sweep the
/// bucket residual and replay again. Returns the new (event, done, book)
/// triple and the bucket completion time if a bucket closed.
fn advance_track<F: DataFeed>(
    broker: &mut Broker<F>,
    schedule: &mut Schedule,
    event: &ExecutionEvent,
    done: bool,
    book: &BookSnapshot,
    volume: Option<Decimal>,
) -> Result<(ExecutionEvent, bool, BookSnapshot, Option<DateTime<Utc>>)> {
    broker.place_next_order(schedule, event, done, book, volume)?;
    let (mut event, mut done, mut book) = broker.simulate_to_next_event(schedule)?;

    let mut bucket_closed = None;
    if event.kind == EventKind::BucketBound {
        done = broker.place_next_order(schedule, &event, done, &book, None)?;
        let closed_at = match broker.latest_fill_time(schedule.kind()) {
            Some(t) if t >= event.time => t,
            _ => event.time,
        };
        bucket_closed = Some(closed_at);
        if !done {
            let (e, d, b) = broker.simulate_to_next_event(schedule)?;
            event = e;
            done = d;
            book = b;
        }
    }
    Ok((event, done, book, bucket_closed))
}

/// Turn a scaling factor into the adaptive cell's volume: the factor scales
/// the benchmark's default cell, is added to whatever the cell already
/// holds, quantized down to the tick and clipped to the bucket's remaining
/// volume.
fn infer_volume(adaptive: &Schedule, factor: f64) -> Decimal {
    let bucket = adaptive.bucket_idx();
    let slice = adaptive.slice_idx();
    let current = adaptive.allocation(bucket, slice);
    let scale: Decimal = factor.to_string().parse().unwrap_or_default();
    let target = current + scale * adaptive.default_allocation(bucket, slice);

    let tick = adaptive.tick_size();
    let mut volume = (target / tick).floor() * tick;
    let remaining = adaptive.bucket_vol_remaining(bucket);
    if volume > remaining {
        volume = remaining;
    }
    volume
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 21, 10, 0, 0).unwrap()
    }

    fn make_adaptive(tick: Decimal) -> Schedule {
        let parent = ParentOrder::new(
            hermes_core::Side::Buy,
            dec!(1000),
            t0(),
            t0() + Duration::minutes(5),
        );
        let mut rng = StdRng::seed_from_u64(1);
        let benchmark =
            Schedule::twap(parent, 3, None, tick, &default_placement, &mut rng).unwrap();
        Schedule::adaptive(&benchmark)
    }

    #[test]
    fn test_infer_volume_scales_the_default_cell() {
        let adaptive = make_adaptive(dec!(1));
        let default = adaptive.default_allocation(0, 0);
        let volume = infer_volume(&adaptive, 1.0);
        assert_eq!(volume, default);
    }

    #[test]
    fn test_infer_volume_quantizes_down_to_tick() {
        let adaptive = make_adaptive(dec!(1));
        // 0.8 x 34 = 27.2, floored to the tick
        assert_eq!(adaptive.default_allocation(0, 0), dec!(34));
        assert_eq!(infer_volume(&adaptive, 0.8), dec!(27));
    }

    #[test]
    fn test_infer_volume_clips_to_bucket_remaining() {
        let adaptive = make_adaptive(dec!(1));
        let volume = infer_volume(&adaptive, 1_000_000.0);
        assert_eq!(volume, adaptive.bucket_vol_remaining(0));
    }
}
