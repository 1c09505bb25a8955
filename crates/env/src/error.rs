//! Coordinator errors
//!
//! Two families are kept distinguishable: configuration errors (fix the
//! config and retry) and simulation invariant violations (the episode is
//! poisoned and must be discarded with a fresh `reset`).

use chrono::{DateTime, Utc};
use thiserror::Error;

use hermes_broker::BrokerError;
use hermes_ports::FeedError;
use hermes_schedule::ScheduleError;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error(
        "Tracks desynchronized: benchmark event at {benchmark}, adaptive event at {adaptive}"
    )]
    DesynchronizedEvents {
        benchmark: DateTime<Utc>,
        adaptive: DateTime<Utc>,
    },

    #[error("Tracks desynchronized: benchmark done={benchmark}, adaptive done={adaptive}")]
    DesynchronizedTermination { benchmark: bool, adaptive: bool },

    #[error("Invalid discrete action code {0}, expected one of 0, 1, 2")]
    InvalidAction(usize),

    #[error("Action kind does not match the configured action mapping")]
    ActionMismatch,

    #[error("step() requires a running episode; call reset() first")]
    EpisodeNotRunning,

    #[error("Cannot build an observation at a bucket bound ({0})")]
    ObservationAtBucketBound(DateTime<Utc>),

    #[error("First snapshot has no bid levels to derive a tick size from")]
    NoTickSize,
}

pub type Result<T> = std::result::Result<T, SimError>;
