//! Broker errors

use hermes_ports::FeedError;
use hermes_schedule::ScheduleError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),
}

pub type Result<T> = std::result::Result<T, BrokerError>;
