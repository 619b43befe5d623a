//! Reasons the trigger engine can give for acting.

use serde::{Deserialize, Serialize};

/// Why a sample/relay cycle is justified.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    /// Nothing justifies acting.
    #[default]
    None,
    /// The cooldown since the last observation has elapsed.
    Time,
    /// The oracle-implied price drifted outside the configured thresholds.
    Twap,
}

impl TriggerReason {
    pub fn is_none(&self) -> bool {
        matches!(self, TriggerReason::None)
    }
}

impl std::fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TriggerReason::None => "none",
            TriggerReason::Time => "time",
            TriggerReason::Twap => "twap",
        };
        f.write_str(label)
    }
}
