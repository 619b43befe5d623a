//! # tidal-oracle
//!
//! Destination side of the Tidal oracle synchronization engine.
//!
//! Bridged observation lists land in a [`DataReceiver`], which resolves (or
//! deploys) the [`SidechainOracle`] of the pool through the
//! [`OracleRegistry`] and appends the list to its ring buffer. Readers query
//! the oracle exactly as they would a pool's native oracle.
//!
//! ## Modules
//!
//! - [`observation`]: Stored observation, slot0 and ring-buffer math
//! - [`oracle`]: [`SidechainOracle`]: write, observe, cardinality growth
//! - [`registry`]: [`OracleRegistry`]: deterministic addressing and deployment
//! - [`receiver`]: [`DataReceiver`]: adapter-gated entry point

pub mod observation;
pub mod oracle;
pub mod receiver;
pub mod registry;

pub use observation::{Observation, Slot0};
pub use oracle::SidechainOracle;
pub use receiver::DataReceiver;
pub use registry::OracleRegistry;

/// Error types for destination-side operations.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// Caller is not the governor.
    #[error("only governor")]
    OnlyGovernor,

    /// Caller is not the data receiver.
    #[error("only data receiver")]
    OnlyDataReceiver,

    /// Caller is not a whitelisted receiver adapter.
    #[error("unallowed adapter")]
    UnallowedAdapter,

    /// The oracle already holds its first observation.
    #[error("already initialized")]
    AlreadyInitialized,

    /// The oracle holds no observation yet.
    #[error("not initialized")]
    NotInitialized,

    /// The requested time precedes the oldest stored observation.
    #[error("observation too old: target {target}, oldest {oldest}")]
    ObservationTooOld {
        /// Requested timestamp.
        target: u32,
        /// Timestamp of the oldest stored observation.
        oldest: u32,
    },

    /// No oracle is deployed at the address.
    #[error("unknown oracle")]
    UnknownOracle,

    /// Checked arithmetic failed.
    #[error("arithmetic fault: {0}")]
    Arithmetic(&'static str),
}

/// Convenience result type for destination-side operations.
pub type Result<T> = std::result::Result<T, OracleError>;
