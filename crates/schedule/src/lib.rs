//! Hermes Scheduling Engine
//!
//! Splits a parent order into child orders placed over time:
//! - **Bucket partitioning**: carves the execution horizon into time
//!   buckets whose width follows the parent-order duration, optionally
//!   jittered.
//! - **Volume splitting**: exact decimal arithmetic dividing quantities
//!   into near-equal tick-sized parts.
//! - **Timelines**: the merged, de-duplicated sequence of decision and
//!   bucket-boundary timestamps for an episode, sampled once and shared
//!   between tracks.
//! - **Schedules**: the TWAP benchmark plan and the adaptive plan filled
//!   in online by a decision-making agent.

pub mod bucket;
pub mod error;
pub mod event;
pub mod schedule;
pub mod split;
pub mod timeline;

// Re-export main types
pub use bucket::BucketSet;
pub use error::{Result, ScheduleError};
pub use event::{EventKind, ExecutionEvent};
pub use schedule::{Schedule, ScheduleKind};
pub use split::split_even;
pub use timeline::{PlacementFn, Timeline, default_placement};
