use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Side;

/// Unique identifier for an order
pub type OrderId = Uuid;

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// Resting order at a fixed price
    Limit,
    /// Marketable order, executes against the opposite book
    Market,
}

/// A child order generated by a schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    /// Required for Limit orders
    pub price: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

impl Order {
    /// Create a resting limit order
    pub fn limit(side: Side, quantity: Decimal, price: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            timestamp,
        }
    }

    /// Create a marketable order
    pub fn market(side: Side, quantity: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            timestamp,
        }
    }

    /// Validate the order based on order type requirements
    pub fn validate(&self) -> bool {
        match self.order_type {
            OrderType::Market => true,
            OrderType::Limit => self.price.is_some(),
        }
    }
}
