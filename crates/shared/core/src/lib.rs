//! Hermes Core Domain
//!
//! Pure domain types for the Hermes execution simulator.
//! This crate contains no I/O, no randomness, and is 100% unit testable.

pub mod book;
pub mod entities;

// Re-export commonly used types at crate root
pub use book::BookSnapshot;
pub use entities::{Fill, Order, OrderId, OrderType, ParentOrder, Side};
