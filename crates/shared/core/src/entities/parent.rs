use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;

/// The parent order to be worked over the episode's horizon.
/// Immutable once constructed for an episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentOrder {
    pub direction: Side,
    pub volume: Decimal,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl ParentOrder {
    pub fn new(
        direction: Side,
        volume: Decimal,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            direction,
            volume,
            start_time,
            end_time,
        }
    }

    /// Total execution horizon
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}
