//! Reward Policies
//!
//! A closed set of reward variants, selected at construction time. Every
//! variant compares the two tracks' volume-weighted average prices over a
//! window of realized trades and scores them directionally: buying rewards
//! a lower adaptive VWAP than benchmark, selling a higher one. A window
//! with no trades on either track always resolves to a neutral zero
//! reward.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use hermes_broker::vwap_over;
use hermes_core::{Fill, Side};

/// Which comparison each step feeds into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardPolicy {
    /// +1 whenever the step's adaptive VWAP strictly beats the benchmark
    SignPerStep,
    /// Ratio improvement of the step window VWAPs
    PctPerStep,
    /// Ratio improvement, paid only when a bucket completes
    PctPerBucket,
    /// Ratio improvement over the whole episode, paid at termination
    PctPerEpisode,
    /// Price difference of the step window VWAPs
    DollarPerStep,
    /// Price difference scaled by the completed bucket's planned volume,
    /// paid only when a bucket completes
    DollarVolumePerBucket,
}

/// Window bounds and episode state a reward evaluation runs against
#[derive(Debug, Clone)]
pub struct RewardContext {
    pub direction: Side,
    /// Elapsed step window (previous event time, latest trade time)
    pub step_window: (DateTime<Utc>, DateTime<Utc>),
    /// Completed-bucket window, set only on steps that closed a bucket
    pub bucket_window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// The episode terminated on this step
    pub episode_done: bool,
    /// Planned benchmark volume of the bucket the step ran in
    pub bucket_volume: Decimal,
}

impl RewardPolicy {
    /// Score one step from the two tracks' trade logs
    pub fn evaluate(
        &self,
        benchmark_fills: &[Fill],
        adaptive_fills: &[Fill],
        ctx: &RewardContext,
    ) -> f64 {
        match self {
            RewardPolicy::SignPerStep => {
                match Self::window_vwaps(benchmark_fills, adaptive_fills, Some(ctx.step_window)) {
                    Some((bmk, rl)) => {
                        let improved = match ctx.direction {
                            Side::Buy => bmk > rl,
                            Side::Sell => bmk < rl,
                        };
                        if improved { 1.0 } else { 0.0 }
                    }
                    None => 0.0,
                }
            }
            RewardPolicy::PctPerStep => {
                Self::pct(benchmark_fills, adaptive_fills, Some(ctx.step_window), ctx.direction)
            }
            RewardPolicy::PctPerBucket => match ctx.bucket_window {
                Some(window) => {
                    Self::pct(benchmark_fills, adaptive_fills, Some(window), ctx.direction)
                }
                None => 0.0,
            },
            RewardPolicy::PctPerEpisode => {
                if ctx.episode_done {
                    Self::pct(benchmark_fills, adaptive_fills, None, ctx.direction)
                } else {
                    0.0
                }
            }
            RewardPolicy::DollarPerStep => {
                Self::dollar(benchmark_fills, adaptive_fills, Some(ctx.step_window), ctx.direction)
            }
            RewardPolicy::DollarVolumePerBucket => match ctx.bucket_window {
                Some(window) => {
                    let improvement =
                        Self::dollar(benchmark_fills, adaptive_fills, Some(window), ctx.direction);
                    ctx.bucket_volume.to_f64().unwrap_or(0.0) * improvement
                }
                None => 0.0,
            },
        }
    }

    /// Both tracks' VWAPs over a window; `None` unless both traded
    fn window_vwaps(
        benchmark_fills: &[Fill],
        adaptive_fills: &[Fill],
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Option<(Decimal, Decimal)> {
        let bmk = vwap_over(benchmark_fills, window)?;
        let rl = vwap_over(adaptive_fills, window)?;
        Some((bmk, rl))
    }

    /// Ratio improvement: `bmk/rl - 1` buying, `rl/bmk - 1` selling
    fn pct(
        benchmark_fills: &[Fill],
        adaptive_fills: &[Fill],
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
        direction: Side,
    ) -> f64 {
        let Some((bmk, rl)) = Self::window_vwaps(benchmark_fills, adaptive_fills, window) else {
            return 0.0;
        };
        let ratio = match direction {
            Side::Buy if !rl.is_zero() => bmk / rl - Decimal::ONE,
            Side::Sell if !bmk.is_zero() => rl / bmk - Decimal::ONE,
            _ => return 0.0,
        };
        ratio.to_f64().unwrap_or(0.0)
    }

    /// Price improvement: `bmk - rl` buying, `rl - bmk` selling
    fn dollar(
        benchmark_fills: &[Fill],
        adaptive_fills: &[Fill],
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
        direction: Side,
    ) -> f64 {
        let Some((bmk, rl)) = Self::window_vwaps(benchmark_fills, adaptive_fills, window) else {
            return 0.0;
        };
        let diff = match direction {
            Side::Buy => bmk - rl,
            Side::Sell => rl - bmk,
        };
        diff.to_f64().unwrap_or(0.0)
    }
}
