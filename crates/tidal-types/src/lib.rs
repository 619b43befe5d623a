//! # tidal-types
//!
//! Shared domain types used across the Tidal workspace: identities, pool
//! keys, the observation wire datum, source-side pool snapshots, trigger
//! reasons and the event log every component writes to.

pub mod events;
pub mod observation;
pub mod pool;
pub mod trigger;

pub use events::{Event, EventLog};
pub use observation::ObservationData;
pub use pool::{PoolKey, PoolState};
pub use trigger::TriggerReason;

/// Identity of any account or component on a ledger.
pub type Address = [u8; 32];

/// Content hash of a sorted token pair and fee tier.
pub type PoolSalt = [u8; 32];

/// Destination ledger identifier used by the source side.
pub type ChainId = u32;

/// Transport-level domain of a ledger.
pub type DomainId = u32;

/// Opaque handle returned by the message transport for a dispatch.
pub type TransferId = [u8; 32];

/// The all-zero address, meaning "unset".
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// Smallest tick a price pool can report.
pub const MIN_TICK: i32 = -887_272;

/// Largest tick a price pool can report.
pub const MAX_TICK: i32 = 887_272;

/// Error returned when a textual identity cannot be parsed.
#[derive(Debug, thiserror::Error)]
#[error("invalid address: {0}")]
pub struct ParseAddressError(pub String);

/// Parse an address from hex, with or without a `0x` prefix.
///
/// # Errors
///
/// Returns [`ParseAddressError`] if the input is not 32 bytes of hex.
pub fn parse_address(input: &str) -> Result<Address, ParseAddressError> {
    tidal_crypto::from_hex(input).ok_or_else(|| ParseAddressError(input.to_string()))
}

/// Short hex rendering of an identity for log lines.
pub fn short_hex(bytes: &[u8; 32]) -> String {
    tidal_crypto::to_hex(bytes)[..12].to_string()
}
