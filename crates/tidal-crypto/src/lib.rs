//! # tidal-crypto
//!
//! Hashing primitives for the Tidal oracle synchronization engine.
//!
//! Every identity derived in Tidal (pool salts, observation commitments,
//! deterministic oracle addresses) is a domain-separated BLAKE3 digest. The
//! suite is fixed; there is no algorithm negotiation.
//!
//! ## Modules
//!
//! - [`blake3`]: Domain-separated BLAKE3 hashing and registered contexts

pub mod blake3;

/// A 32-byte digest.
pub type Digest = [u8; 32];

/// Render a digest as lowercase hex, for logs and config files.
pub fn to_hex(digest: &Digest) -> String {
    hex::encode(digest)
}

/// Parse a 32-byte digest from hex, with or without a `0x` prefix.
///
/// Returns `None` if the input is not exactly 32 bytes of valid hex.
pub fn from_hex(input: &str) -> Option<Digest> {
    let trimmed = input.strip_prefix("0x").unwrap_or(input);
    let bytes = hex::decode(trimmed).ok()?;
    bytes.try_into().ok()
}
