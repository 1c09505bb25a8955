use thiserror::Error;

/// Errors raised by a market-data replay feed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("Feed holds no snapshots")]
    Empty,

    #[error("Replay exhausted: no snapshot at or after the cursor")]
    EndOfHistory,
}

pub type FeedResult<T> = std::result::Result<T, FeedError>;
