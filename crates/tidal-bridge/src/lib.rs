//! # tidal-bridge
//!
//! Relay adapters between the Tidal ledgers and the message transport.
//!
//! ```text
//! DataFeed --BridgeSender--> BridgeSenderAdapter --xcall--> MessageTransport
//!                                                                |
//! DataReceiver <--add_observations-- BridgeReceiverAdapter <-- Envelope
//! ```
//!
//! ## Modules
//!
//! - [`sender`]: Source-side adapter: feed-only, encodes and dispatches
//! - [`receiver`]: Destination-side adapter: authenticates and forwards

pub mod receiver;
pub mod sender;

pub use receiver::BridgeReceiverAdapter;
pub use sender::BridgeSenderAdapter;

use tidal_oracle::OracleError;
use tidal_transport::TransportError;

/// Error types for relay adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Caller is not the data feed.
    #[error("only data feed")]
    OnlyDataFeed,

    /// The envelope does not originate from the pinned source adapter.
    #[error("unauthorized caller")]
    UnauthorizedCaller,

    /// The envelope is addressed to another adapter.
    #[error("envelope addressed to another recipient")]
    WrongRecipient,

    /// Encoding, decoding or dispatch failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The data receiver rejected the call.
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// Convenience result type for relay adapter operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
