//! Scheduling engine errors

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("end time {end} precedes start time {start}")]
    EndBeforeStart { start: String, end: String },

    #[error("cannot split a quantity into zero parts")]
    EmptySplit,

    #[error("tick size must be positive, got {0}")]
    InvalidTick(Decimal),

    #[error("cannot split negative quantity {0}")]
    NegativeQuantity(Decimal),

    #[error("bucket volumes sum to {sum}, off the parent volume {target} by more than one tick")]
    BucketSplitMismatch { sum: Decimal, target: Decimal },

    #[error("slice volumes sum to {sum}, off the parent volume {target} by more than one tick")]
    SliceSplitMismatch { sum: Decimal, target: Decimal },

    #[error(
        "placement function failed to produce {slices} distinct decision times off the bucket bounds for bucket {bucket}"
    )]
    PlacementSampling { bucket: usize, slices: usize },

    #[error("book snapshot has no best {side} to price a resting order against")]
    MissingBestPrice { side: String },

    #[error(
        "volume overdrawn on {scope}: remaining {remaining} fell more than one tick ({tick}) below zero"
    )]
    VolumeOverdraw {
        scope: String,
        remaining: Decimal,
        tick: Decimal,
    },
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
