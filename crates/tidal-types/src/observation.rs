//! The observation datum exchanged across the bridge.

use serde::{Deserialize, Serialize};

/// One bridged observation: the mean tick that held over an interval, keyed
/// by the interval's start timestamp.
///
/// A list of these ordered by increasing timestamp is the unit committed on
/// the source ledger, carried by the transport and appended to a sidechain
/// oracle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObservationData {
    pub block_timestamp: u32,
    pub arithmetic_mean_tick: i32,
}

impl ObservationData {
    pub fn new(block_timestamp: u32, arithmetic_mean_tick: i32) -> Self {
        Self {
            block_timestamp,
            arithmetic_mean_tick,
        }
    }

    /// Canonical byte encoding: `BE32(timestamp) || BE32(tick)`.
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&self.block_timestamp.to_be_bytes());
        out[4..].copy_from_slice(&self.arithmetic_mean_tick.to_be_bytes());
        out
    }
}

/// Whether timestamps in `observations` strictly increase.
pub fn is_strictly_ascending(observations: &[ObservationData]) -> bool {
    observations
        .windows(2)
        .all(|pair| pair[0].block_timestamp < pair[1].block_timestamp)
}
