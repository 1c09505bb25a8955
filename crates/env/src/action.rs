//! Action Mappings
//!
//! Converts an externally supplied agent action into the scaling factor
//! applied to the benchmark's default slice volume. The mapping variant is
//! fixed at construction time; feeding it the wrong action kind or an
//! out-of-range discrete code is an error, never a silent default.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// An agent decision, as handed to `step`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Continuous(f64),
    Discrete(usize),
}

/// How an action becomes a volume scaling factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActionMapping {
    /// Use the continuous action as the factor unchanged
    Raw,
    /// Rescale the action from `[low, high]` into `[0.8, 1.2]`
    BoundedContinuous { low: f64, high: f64 },
    /// Codes 0, 1, 2 map to factors 0.8, 1.0, 1.2
    Discrete,
    /// Scale the action by 0.1 (a 0-20 action range covers factors 0-2);
    /// NaN falls back to an even `1 / no_of_slices` share
    DollarScaled,
}

impl ActionMapping {
    /// Convert an action into the factor on the default slice volume
    pub fn scaling_factor(&self, action: Action, no_of_slices: usize) -> Result<f64> {
        match (self, action) {
            (ActionMapping::Raw, Action::Continuous(a)) => Ok(a),
            (ActionMapping::BoundedContinuous { low, high }, Action::Continuous(a)) => {
                let rescaled = (a - low) / (high - low);
                Ok(0.8 + rescaled * 0.4)
            }
            (ActionMapping::Discrete, Action::Discrete(code)) => match code {
                0 => Ok(0.8),
                1 => Ok(1.0),
                2 => Ok(1.2),
                other => Err(SimError::InvalidAction(other)),
            },
            (ActionMapping::DollarScaled, Action::Continuous(a)) => {
                if a.is_nan() {
                    Ok(1.0 / no_of_slices as f64)
                } else {
                    Ok(a * 0.1)
                }
            }
            _ => Err(SimError::ActionMismatch),
        }
    }
}
