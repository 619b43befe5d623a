//! # tidal-feed
//!
//! Source-side Data Feed of the Tidal oracle synchronization engine.
//!
//! The feed samples a price pool's tick cumulatives, turns adjacent samples
//! into mean-tick observations, commits to every list it produces and later
//! lets anyone relay a committed list through a whitelisted bridge adapter.
//!
//! ## Modules
//!
//! - [`pool`]: Pool adapter interface and the schedule-driven stub pool
//! - [`math`]: Floor division and mean-tick derivation
//! - [`commitment`]: Observation commitment hash
//! - [`feed`]: The [`DataFeed`] ledger: pipelines, adapters, fetch and send

pub mod commitment;
pub mod feed;
pub mod math;
pub mod pool;

pub use feed::{BridgeSender, DataFeed, DispatchError};
pub use pool::{PoolAdapter, PoolError, StubPool};

/// Error types for data feed operations.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Caller is not the governor.
    #[error("only governor")]
    OnlyGovernor,

    /// Caller is not the configured strategy.
    #[error("only strategy")]
    OnlyStrategy,

    /// Pool has not been whitelisted for fetching.
    #[error("unallowed pool")]
    UnallowedPool,

    /// No adapter has been registered for the pool salt.
    #[error("unknown pool")]
    UnknownPool,

    /// Fewer than two sample offsets were supplied.
    #[error("invalid seconds agos: need at least 2 offsets, got {0}")]
    InvalidSecondsAgos(usize),

    /// The `(chain, pool)` pipeline has not been whitelisted.
    #[error("unallowed pipeline")]
    UnallowedPipeline,

    /// Nonce predates the pipeline's whitelisting.
    #[error("wrong nonce: {pool_nonce} < whitelisted {whitelisted_nonce}")]
    WrongNonce {
        /// Nonce presented by the sender.
        pool_nonce: u32,
        /// First nonce accepted on the pipeline.
        whitelisted_nonce: u32,
    },

    /// No fetch ever committed to this `(pool, nonce, observations)`.
    #[error("unknown hash")]
    UnknownHash,

    /// Bridge adapter is not whitelisted.
    #[error("unallowed adapter")]
    UnallowedAdapter,

    /// No destination domain configured for the adapter and chain.
    #[error("destination domain id not set")]
    DestinationDomainIdNotSet,

    /// No receiver configured for the adapter and destination domain.
    #[error("receiver not set")]
    ReceiverNotSet,

    /// Checked arithmetic failed.
    #[error("arithmetic fault: {0}")]
    Arithmetic(&'static str),

    /// The pool adapter failed to answer.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The bridge adapter failed to dispatch.
    #[error("dispatch failed: {0}")]
    Dispatch(#[source] DispatchError),
}

/// Convenience result type for data feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
