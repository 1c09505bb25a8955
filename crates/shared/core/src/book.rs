//! Order Book Snapshot
//!
//! A point-in-time view of the limit order book, as replayed by the data
//! feed. Uses BTreeMap for price levels to maintain sorted order: bids are
//! read in descending order (highest first), asks in ascending order
//! (lowest first).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of the limit order book at one replay timestamp
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// Bid levels: price -> quantity (sorted ascending, read back-to-front)
    bids: BTreeMap<Decimal, Decimal>,
    /// Ask levels: price -> quantity (sorted ascending)
    asks: BTreeMap<Decimal, Decimal>,
}

impl BookSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from (price, quantity) levels; zero-quantity levels
    /// are skipped
    pub fn from_levels(bids: &[(Decimal, Decimal)], asks: &[(Decimal, Decimal)]) -> Self {
        let mut snapshot = Self::new();
        for &(price, quantity) in bids {
            if !quantity.is_zero() {
                snapshot.bids.insert(price, quantity);
            }
        }
        for &(price, quantity) in asks {
            if !quantity.is_zero() {
                snapshot.asks.insert(price, quantity);
            }
        }
        snapshot
    }

    // === Price Queries ===

    /// Get best bid price and quantity
    pub fn best_bid(&self) -> Option<(Decimal, Decimal)> {
        self.bids.iter().next_back().map(|(p, q)| (*p, *q))
    }

    /// Get best ask price and quantity
    pub fn best_ask(&self) -> Option<(Decimal, Decimal)> {
        self.asks.iter().next().map(|(p, q)| (*p, *q))
    }

    /// Get mid price (average of best bid and ask)
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    /// Get spread (ask - bid)
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(ask - bid),
            _ => None,
        }
    }

    // === Level Queries ===

    /// Get top N bid levels (highest prices first)
    pub fn top_bids(&self, n: usize) -> Vec<(Decimal, Decimal)> {
        self.bids
            .iter()
            .rev()
            .take(n)
            .map(|(p, q)| (*p, *q))
            .collect()
    }

    /// Get top N ask levels (lowest prices first)
    pub fn top_asks(&self, n: usize) -> Vec<(Decimal, Decimal)> {
        self.asks.iter().take(n).map(|(p, q)| (*p, *q)).collect()
    }

    /// True if either side of the book is empty
    pub fn is_one_sided(&self) -> bool {
        self.bids.is_empty() || self.asks.is_empty()
    }

    /// Smallest tradable volume increment implied by the precision of the
    /// best-bid level quantity: `1 / 10^scale`. This is how the tick size of
    /// a replayed market is recovered from its first snapshot.
    pub fn volume_tick(&self) -> Option<Decimal> {
        self.best_bid().map(|(_, q)| Decimal::new(1, q.scale()))
    }
}
