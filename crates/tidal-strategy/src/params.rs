//! Strategy parameters.

use serde::{Deserialize, Serialize};

use crate::{Result, StrategyError};

/// Tunables of the trigger engine. All durations are in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyParams {
    /// Maximum quiet time before a time trigger fires.
    pub cooldown: u32,
    /// Spacing of samples within a fetch window.
    pub period_length: u32,
    /// Window of the TWAP comparison.
    pub twap_length: u32,
    /// Largest tolerated `oracle_tick - pool_tick`.
    pub upper_twap_threshold: i32,
    /// Smallest tolerated `oracle_tick - pool_tick`.
    pub lower_twap_threshold: i32,
}

impl StrategyParams {
    /// Check the parameter invariants.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::WrongSetting`] naming the first violated bound.
    pub fn validate(&self) -> Result<()> {
        if self.period_length == 0 {
            return Err(StrategyError::WrongSetting("period length must be positive"));
        }
        if self.period_length >= self.cooldown {
            return Err(StrategyError::WrongSetting(
                "period length must be shorter than cooldown",
            ));
        }
        if self.twap_length < self.period_length {
            return Err(StrategyError::WrongSetting(
                "twap length must not be shorter than period length",
            ));
        }
        if self.twap_length > self.cooldown {
            return Err(StrategyError::WrongSetting(
                "twap length must not exceed cooldown",
            ));
        }
        if self.upper_twap_threshold < 0 || self.lower_twap_threshold > 0 {
            return Err(StrategyError::WrongSetting(
                "twap thresholds must bracket zero",
            ));
        }
        Ok(())
    }
}
