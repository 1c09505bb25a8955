//! Environment Configuration
//!
//! Sectioned configuration for episode generation, mirroring how an episode
//! is sampled: what to observe, what to trade, when to start, how long to
//! execute, and how often to redraw the parameters. Loadable from JSON;
//! unknown keys are rejected at parse time.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use hermes_core::Side;

/// Hard cap on the book depth an observation may request
pub const MAX_LOB_DEPTH: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Config rejected: {0}")]
    Parse(String),

    #[error("'{field}': low bound {low} exceeds high bound {high}")]
    InvertedRange {
        field: &'static str,
        low: u64,
        high: u64,
    },

    #[error("'lob_depth' must be at most {MAX_LOB_DEPTH}, got {0}")]
    DepthTooLarge(usize),

    #[error("bucket jitter bounds are percentages and must lie within 0-100")]
    JitterOutOfRange,

    #[error("'{field}' high bound {high} is outside clock range (max {max})")]
    ClockOutOfRange {
        field: &'static str,
        high: u32,
        max: u32,
    },

    #[error("'exec_times' must name at least one execution duration")]
    NoExecTimes,

    #[error("'no_of_slices' bounds must be at least 1")]
    ZeroSlices,
}

/// Observation window shape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ObsConfig {
    /// Book depth per snapshot side
    pub lob_depth: usize,
    /// Number of past snapshots concatenated into one observation
    pub nr_of_lobs: usize,
    /// Min-max rescale prices and volumes across the window
    pub norm: bool,
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            lob_depth: 5,
            nr_of_lobs: 5,
            norm: true,
        }
    }
}

/// Parent-order sampling ranges
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TradeConfig {
    pub direction: Side,
    /// Parent volume range
    pub vol_low: u64,
    pub vol_high: u64,
    /// Order placements per bucket
    pub no_slices_low: usize,
    pub no_slices_high: usize,
    /// Bucket-bound jitter width range (% of the canonical bucket width)
    pub rand_bucket_low: u32,
    pub rand_bucket_high: u32,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            direction: Side::Buy,
            vol_low: 500,
            vol_high: 1000,
            no_slices_low: 5,
            no_slices_high: 10,
            rand_bucket_low: 0,
            rand_bucket_high: 0,
        }
    }
}

/// Intraday start-time sampling window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct StartWindowConfig {
    pub hour_low: u32,
    pub hour_high: u32,
    pub minute_low: u32,
    pub minute_high: u32,
    pub second_low: u32,
    pub second_high: u32,
}

impl Default for StartWindowConfig {
    fn default() -> Self {
        Self {
            hour_low: 1,
            hour_high: 19,
            minute_low: 0,
            minute_high: 59,
            second_low: 0,
            second_high: 59,
        }
    }
}

/// Execution-duration sampling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ExecConfig {
    /// Candidate execution durations in minutes
    pub exec_times: Vec<i64>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            exec_times: vec![5, 10, 15, 30, 60, 120, 240],
        }
    }
}

/// Episode-parameter redraw cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ResetConfig {
    /// Redraw the episode parameters every this many resets
    pub reset_num_episodes: u32,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            reset_num_episodes: 1,
        }
    }
}

/// Full environment configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EnvConfig {
    pub obs: ObsConfig,
    pub trade: TradeConfig,
    pub start: StartWindowConfig,
    pub exec: ExecConfig,
    pub reset: ResetConfig,
    /// Seed for the episode random source
    pub seed: u64,
}

impl EnvConfig {
    /// Parse a configuration from JSON, rejecting unknown keys, and
    /// validate its ranges
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every configured range for consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.obs.lob_depth > MAX_LOB_DEPTH {
            return Err(ConfigError::DepthTooLarge(self.obs.lob_depth));
        }
        if self.trade.vol_low > self.trade.vol_high {
            return Err(ConfigError::InvertedRange {
                field: "vol",
                low: self.trade.vol_low,
                high: self.trade.vol_high,
            });
        }
        if self.trade.no_slices_low > self.trade.no_slices_high {
            return Err(ConfigError::InvertedRange {
                field: "no_slices",
                low: self.trade.no_slices_low as u64,
                high: self.trade.no_slices_high as u64,
            });
        }
        if self.trade.no_slices_low == 0 {
            return Err(ConfigError::ZeroSlices);
        }
        if self.trade.rand_bucket_low > self.trade.rand_bucket_high {
            return Err(ConfigError::InvertedRange {
                field: "rand_bucket",
                low: self.trade.rand_bucket_low as u64,
                high: self.trade.rand_bucket_high as u64,
            });
        }
        if self.trade.rand_bucket_high > 100 {
            return Err(ConfigError::JitterOutOfRange);
        }
        if self.start.hour_low > self.start.hour_high {
            return Err(ConfigError::InvertedRange {
                field: "hour",
                low: self.start.hour_low as u64,
                high: self.start.hour_high as u64,
            });
        }
        if self.start.minute_low > self.start.minute_high {
            return Err(ConfigError::InvertedRange {
                field: "minute",
                low: self.start.minute_low as u64,
                high: self.start.minute_high as u64,
            });
        }
        if self.start.second_low > self.start.second_high {
            return Err(ConfigError::InvertedRange {
                field: "second",
                low: self.start.second_low as u64,
                high: self.start.second_high as u64,
            });
        }
        for (field, high, max) in [
            ("hour", self.start.hour_high, 23),
            ("minute", self.start.minute_high, 59),
            ("second", self.start.second_high, 59),
        ] {
            if high > max {
                return Err(ConfigError::ClockOutOfRange { field, high, max });
            }
        }
        if self.exec.exec_times.is_empty() {
            return Err(ConfigError::NoExecTimes);
        }
        Ok(())
    }
}
