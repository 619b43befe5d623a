//! Observation commitments.
//!
//! ```text
//! commitment = BLAKE3::derive_fields("Tidal v1 observation-commitment",
//!     [pool_salt, BE32(pool_nonce), obs_0 || obs_1 || ...])
//! ```
//!
//! where each `obs_i` is the 8-byte canonical encoding of an
//! [`ObservationData`].

use tidal_crypto::blake3::{self, contexts};
use tidal_crypto::Digest;
use tidal_types::{ObservationData, PoolSalt};

/// Commitment over one fetch result.
pub fn observation_commitment(
    pool_salt: &PoolSalt,
    pool_nonce: u32,
    observations: &[ObservationData],
) -> Digest {
    let encoded: Vec<u8> = observations.iter().flat_map(|o| o.to_bytes()).collect();
    blake3::derive_fields(
        contexts::OBSERVATION_COMMITMENT,
        &[pool_salt.as_slice(), &pool_nonce.to_be_bytes(), encoded.as_slice()],
    )
}
