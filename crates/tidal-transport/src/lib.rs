//! # tidal-transport
//!
//! Cross-chain message plumbing for the Tidal oracle synchronization engine.
//!
//! The real message transport is an external collaborator; this crate fixes
//! the interface the relay adapters speak and the bytes they exchange:
//!
//! - **CBOR** encode/decode helpers in [`cbor`]
//! - **Wire envelope** and bridged payload via [`wire`]
//! - **Transport interface** and an in-process implementation via [`memory`]
//!
//! ## Architecture
//!
//! ```text
//! BridgeSenderAdapter
//!     |
//!     v
//! BridgedObservations (wire.rs) -- CBOR payload: observations, pool key, nonce
//!     |
//!     v
//! Envelope (wire.rs)            -- CBOR envelope: origin, destination, transfer id
//!     |
//!     v
//! MessageTransport (memory.rs)  -- asynchronous, at-least-once delivery
//!     |
//!     v
//! BridgeReceiverAdapter
//! ```

pub mod cbor;
pub mod memory;
pub mod wire;

pub use memory::{MemoryInbox, MemoryTransport, MessageTransport};
pub use wire::{BridgedObservations, Envelope};

/// Failures moving a message across the transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A value could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Received bytes did not decode.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// The envelope decoded but breaks the wire rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The far end of the transport is gone.
    #[error("connection error: {0}")]
    Connection(String),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, TransportError>;
