use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;

/// A realized execution, appended to a track's trade log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub timestamp: DateTime<Utc>,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
}

impl Fill {
    pub fn new(timestamp: DateTime<Utc>, side: Side, price: Decimal, quantity: Decimal) -> Self {
        Self {
            timestamp,
            side,
            price,
            quantity,
        }
    }

    /// Returns the notional value of the fill (price * quantity)
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }
}
