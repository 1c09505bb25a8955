//! Hermes Episode Coordinator
//!
//! Runs one episode of dual-track execution: a TWAP benchmark schedule and
//! an adaptive schedule advance in lockstep against a shared order-book
//! replay. The coordinator converts agent decisions into quantized volume
//! instructions for the adaptive track, enforces the synchronization
//! invariants between the tracks, and derives a reward from the difference
//! in realized execution quality.
//!
//! ## Episode flow
//!
//! ```text
//!             reset ──► sample episode params ──► build TWAP benchmark
//!                                                       │
//!                                  adaptive copies its timeline & buckets
//!                                                       │
//!  step(action) ──► volume for current (bucket, slice) cell
//!        │
//!        ├─► advance benchmark:  place order ─► replay ─► [bucket sweep]
//!        ├─► advance adaptive:   place order ─► replay ─► [bucket sweep]
//!        │
//!        ├─► assert identical event timestamps & done flags
//!        ├─► reward over the elapsed trade-log window
//!        └─► next observation (or episode VWAPs when terminal)
//! ```

pub mod action;
pub mod config;
pub mod env;
pub mod episode;
pub mod error;
pub mod observation;
pub mod reward;

// Re-export main types
pub use action::{Action, ActionMapping};
pub use config::{
    ConfigError, EnvConfig, ExecConfig, ObsConfig, ResetConfig, StartWindowConfig, TradeConfig,
};
pub use env::{ExecutionEnv, StepResult};
pub use episode::EpisodeParams;
pub use error::{Result, SimError};
pub use reward::{RewardContext, RewardPolicy};
