//! Hermes Broker
//!
//! The broker sits between the schedules and the market-data replay. It
//! turns schedule events into orders, simulates their fills against the
//! replayed book, keeps one append-only trade log per track and computes
//! volume-weighted average prices from those logs.
//!
//! The crate also ships [`ReplayFeed`], the in-memory [`hermes_ports::DataFeed`]
//! implementation the simulator runs against.

pub mod broker;
pub mod error;
pub mod feed;

pub use broker::{Broker, vwap_over};
pub use error::{BrokerError, Result};
pub use feed::ReplayFeed;
