//! Execution Events
//!
//! The two kinds of timestamps a schedule reacts to: sampled intra-bucket
//! decision times (resting child orders) and bucket boundaries (marketable
//! residual orders).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a timeline timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A sampled intra-bucket decision time: place a resting order
    OrderPlacement,
    /// A bucket boundary: sweep the bucket's remaining volume
    BucketBound,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::OrderPlacement => write!(f, "order_placement"),
            EventKind::BucketBound => write!(f, "bucket_bound"),
        }
    }
}

/// One entry of the episode timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub time: DateTime<Utc>,
    pub kind: EventKind,
}

impl ExecutionEvent {
    pub fn new(time: DateTime<Utc>, kind: EventKind) -> Self {
        Self { time, kind }
    }
}
