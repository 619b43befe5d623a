//! Domain-separated BLAKE3 hashing.
//!
//! Tidal derives several independent identities from BLAKE3. Cross-domain
//! collisions are prevented by running every derivation in BLAKE3's
//! key-derivation mode under a registered context string.
//!
//! ## Modes
//!
//! - [`hash`]: Pure hashing
//! - [`derive_key`]: Single-input derivation under a context
//! - [`derive_fields`]: Multi-field derivation with length-prefixed framing

/// Registered BLAKE3 context strings. Using an unregistered context is a
/// protocol violation.
pub mod contexts {
    /// Pool identity: sorted token pair and fee tier.
    pub const POOL_SALT: &str = "Tidal v1 pool-salt";
    /// Commitment over `(pool_salt, pool_nonce, observations)`.
    pub const OBSERVATION_COMMITMENT: &str = "Tidal v1 observation-commitment";
    /// Deterministic sidechain oracle address.
    pub const ORACLE_ADDRESS: &str = "Tidal v1 oracle-address";
    /// Creation template identifier of the sidechain oracle.
    pub const ORACLE_TEMPLATE: &str = "Tidal v1 oracle-template";

    /// All registered context strings. Used for validation.
    pub const ALL_CONTEXTS: &[&str] = &[
        POOL_SALT,
        OBSERVATION_COMMITMENT,
        ORACLE_ADDRESS,
        ORACLE_TEMPLATE,
    ];
}

/// Compute the BLAKE3 hash of the input data.
pub fn hash(data: &[u8]) -> [u8; 32] {
    *::blake3::hash(data).as_bytes()
}

/// Derive a 32-byte value using BLAKE3's key derivation mode.
///
/// # Arguments
///
/// * `context` - A registered context string from [`contexts`]
/// * `material` - The input material
pub fn derive_key(context: &str, material: &[u8]) -> [u8; 32] {
    debug_assert!(is_registered_context(context), "unregistered context: {context}");
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(material);
    *hasher.finalize().as_bytes()
}

/// Derive a 32-byte value from several fields without concatenation
/// ambiguity.
///
/// Each field is framed as `LE32(len) || field` before being fed to the
/// hasher, so `["ab", "c"]` and `["a", "bc"]` never collide.
pub fn derive_fields(context: &str, fields: &[&[u8]]) -> [u8; 32] {
    debug_assert!(is_registered_context(context), "unregistered context: {context}");
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    for field in fields {
        hasher.update(&(field.len() as u32).to_le_bytes());
        hasher.update(field);
    }
    *hasher.finalize().as_bytes()
}

/// Verify that a context string is registered.
pub fn is_registered_context(context: &str) -> bool {
    contexts::ALL_CONTEXTS.contains(&context)
}
