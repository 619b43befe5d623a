//! # tidal-strategy
//!
//! Trigger Engine: decides when a pool is due for a fetch and drives the
//! Data Feed when it is.
//!
//! A fetch is due when the pool has not been observed for a full cooldown
//! (time trigger) or when the price a destination oracle would extrapolate
//! has drifted from the pool's own TWAP beyond a threshold (TWAP trigger).
//!
//! ## Modules
//!
//! - [`params`]: Strategy parameters and their invariants
//! - [`window`]: Sample-offset window builder
//! - [`strategy`]: [`DataFeedStrategy`]: predicates and strategic fetch
//! - [`job`]: Keeper-gated [`StrategyJob`] with replay protection

pub mod job;
pub mod params;
pub mod strategy;
pub mod window;

pub use job::{KeeperSet, StrategyJob, WorkGate};
pub use params::StrategyParams;
pub use strategy::DataFeedStrategy;

use tidal_feed::{FeedError, PoolError};

/// Error types for trigger engine operations.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    /// Caller is not the governor.
    #[error("only governor")]
    OnlyGovernor,

    /// Parameters violate `0 < period < cooldown`, `period <= twap <= cooldown`
    /// or `upper >= 0 >= lower`.
    #[error("wrong setting: {0}")]
    WrongSetting(&'static str),

    /// The claimed trigger reason does not hold.
    #[error("not strategic")]
    NotStrategic,

    /// Caller is not a registered keeper.
    #[error("keeper not valid")]
    KeeperNotValid,

    /// The nonce is not the next one due for the pipeline.
    #[error("not workable")]
    NotWorkable,

    /// Checked arithmetic failed.
    #[error("arithmetic fault: {0}")]
    Arithmetic(&'static str),

    /// The data feed rejected the call.
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// The pool adapter failed to answer.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Convenience result type for trigger engine operations.
pub type Result<T> = std::result::Result<T, StrategyError>;
