//! Episode Parameter Sampling
//!
//! Draws the parent-order parameters for an episode from the configured
//! ranges: a start timestamp on one of the replay's trading dates, an
//! execution duration from the candidate list, and a volume/slice-count
//! pair. When several candidate durations exist, volume and slice count are
//! interpolated between their bounds in proportion to where the drawn
//! duration sits in the candidates' range, so longer parent orders carry
//! more volume.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::Rng;
use rand::rngs::StdRng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use hermes_core::Side;
use hermes_ports::FeedError;

use crate::config::EnvConfig;
use crate::error::{Result, SimError};

/// One episode's sampled parent-order parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeParams {
    pub direction: Side,
    pub volume: Decimal,
    pub start_time: DateTime<Utc>,
    pub exec_minutes: i64,
    pub no_of_slices: usize,
    /// Bucket-bound jitter width (% of the canonical width), if any
    pub rand_bucket_width: Option<u32>,
}

impl EpisodeParams {
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + Duration::minutes(self.exec_minutes)
    }
}

/// Draw a fresh parameter set from the config ranges
pub fn sample_params(
    config: &EnvConfig,
    dates: &[NaiveDate],
    rng: &mut StdRng,
) -> Result<EpisodeParams> {
    if dates.is_empty() {
        return Err(SimError::Feed(FeedError::Empty));
    }
    let date = dates[rng.gen_range(0..dates.len())];
    let hour = rng.gen_range(config.start.hour_low..=config.start.hour_high);
    let minute = rng.gen_range(config.start.minute_low..=config.start.minute_high);
    let second = rng.gen_range(config.start.second_low..=config.start.second_high);
    let start_time = date
        .and_hms_opt(hour, minute, second)
        .expect("start window is validated to clock bounds")
        .and_utc();

    let (exec_minutes, volume, no_of_slices) = if config.exec.exec_times.len() > 1 {
        sample_proportional(config, rng)
    } else {
        (
            config.exec.exec_times[0],
            rng.gen_range(config.trade.vol_low..=config.trade.vol_high),
            rng.gen_range(config.trade.no_slices_low..=config.trade.no_slices_high),
        )
    };

    let jitter = rng.gen_range(config.trade.rand_bucket_low..=config.trade.rand_bucket_high);
    Ok(EpisodeParams {
        direction: config.trade.direction,
        volume: Decimal::from(volume),
        start_time,
        exec_minutes,
        no_of_slices,
        rand_bucket_width: (jitter > 0).then_some(jitter),
    })
}

/// Volume and slice count proportional to the drawn duration's position in
/// the candidate range
fn sample_proportional(config: &EnvConfig, rng: &mut StdRng) -> (i64, u64, usize) {
    let times = &config.exec.exec_times;
    let exec_minutes = times[rng.gen_range(0..times.len())];
    let min = *times.iter().min().expect("exec_times is non-empty");
    let max = *times.iter().max().expect("exec_times is non-empty");
    let perc = if max > min {
        (exec_minutes - min) as f64 / (max - min) as f64
    } else {
        0.0
    };

    let volume = (config.trade.vol_low as f64
        + perc * (config.trade.vol_high - config.trade.vol_low) as f64)
        .round() as u64;
    let no_of_slices = (config.trade.no_slices_low as f64
        + perc * (config.trade.no_slices_high - config.trade.no_slices_low) as f64)
        .round() as usize;
    (exec_minutes, volume, no_of_slices)
}
