//! Hermes Ports
//!
//! Port definitions (traits) for the Hermes execution simulator.
//! These define the boundaries between the scheduling engine and
//! infrastructure such as the market-data replay.

mod error;
mod feed;

pub use error::{FeedError, FeedResult};
pub use feed::DataFeed;
