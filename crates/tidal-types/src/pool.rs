//! Pool identities and source-side pool snapshots.

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::{Address, PoolSalt};

/// Identity of a price pool: an unordered token pair plus a fee tier.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub token_a: Address,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub token_b: Address,
    /// Fee tier in hundredths of a basis point.
    pub fee: u32,
}

impl PoolKey {
    pub fn new(token_a: Address, token_b: Address, fee: u32) -> Self {
        Self {
            token_a,
            token_b,
            fee,
        }
    }

    /// Return the token pair in ascending byte order.
    pub fn sorted_tokens(&self) -> (Address, Address) {
        if self.token_a <= self.token_b {
            (self.token_a, self.token_b)
        } else {
            (self.token_b, self.token_a)
        }
    }

    /// Derive the pool salt.
    ///
    /// `salt = BLAKE3::derive_key("Tidal v1 pool-salt", token0 || token1 || BE32(fee))`
    /// over the sorted pair, so both token orders name the same pool.
    pub fn salt(&self) -> PoolSalt {
        let (token0, token1) = self.sorted_tokens();
        let mut material = [0u8; 68];
        material[..32].copy_from_slice(&token0);
        material[32..64].copy_from_slice(&token1);
        material[64..].copy_from_slice(&self.fee.to_be_bytes());
        tidal_crypto::blake3::derive_key(tidal_crypto::blake3::contexts::POOL_SALT, &material)
    }
}

/// The most recently observed state of a pool on the source ledger.
///
/// A zero `block_timestamp` means the pool has never been observed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    /// Nonce of the last fetch; increases by exactly one per fetch.
    pub pool_nonce: u32,
    /// Timestamp of the newest sample taken.
    pub block_timestamp: u32,
    /// Pool tick cumulative at `block_timestamp`.
    pub tick_cumulative: i64,
    /// Mean tick of the newest interval.
    pub arithmetic_mean_tick: i32,
}

impl PoolState {
    /// Whether at least one fetch has produced this snapshot.
    pub fn is_observed(&self) -> bool {
        self.block_timestamp != 0
    }
}
