//! Wire envelope and bridged payload.
//!
//! ## Wire format
//!
//! ```text
//! Envelope {
//!     version:            u8,        // Wire version (1)
//!     transfer_id:        [u8; 32],  // Random handle returned to the sender
//!     origin_domain:      u32,       // Domain of the sending ledger
//!     origin_sender:      [u8; 32],  // Sender adapter address
//!     destination_domain: u32,
//!     recipient:          [u8; 32],  // Receiver adapter address
//!     value:              u128,      // Native value forwarded with the call
//!     payload:            Vec<u8>,   // CBOR-encoded BridgedObservations
//! }
//! ```

use serde::{Deserialize, Serialize};
use tidal_types::{Address, DomainId, ObservationData, PoolKey, TransferId};

use crate::cbor;
use crate::TransportError;

/// Current wire version.
pub const WIRE_VERSION: u8 = 1;

/// Largest accepted payload, in bytes.
pub const MAX_PAYLOAD_SIZE: usize = 65536;

/// The application payload relayed from a data feed to a data receiver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgedObservations {
    pub observations: Vec<ObservationData>,
    pub pool_key: PoolKey,
    pub pool_nonce: u32,
}

impl BridgedObservations {
    /// Encode as CBOR for placement in an [`Envelope`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Serialization`] if encoding fails.
    pub fn encode(&self) -> Result<Vec<u8>, TransportError> {
        cbor::to_vec(self)
    }

    /// Decode from envelope payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Deserialization`] if the bytes do not match
    /// the payload schema.
    pub fn decode(data: &[u8]) -> Result<Self, TransportError> {
        cbor::from_slice(data)
    }
}

/// Transport envelope carrying one cross-domain call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub version: u8,
    pub transfer_id: TransferId,
    pub origin_domain: DomainId,
    pub origin_sender: Address,
    pub destination_domain: DomainId,
    pub recipient: Address,
    pub value: u128,
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Build an envelope with a fresh random transfer id.
    pub fn new(
        origin_domain: DomainId,
        origin_sender: Address,
        destination_domain: DomainId,
        recipient: Address,
        value: u128,
        payload: Vec<u8>,
    ) -> Self {
        let mut transfer_id = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut transfer_id);
        Self {
            version: WIRE_VERSION,
            transfer_id,
            origin_domain,
            origin_sender,
            destination_domain,
            recipient,
            value,
            payload,
        }
    }

    /// Serialize this envelope to CBOR bytes for transmission.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Serialization`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransportError> {
        cbor::to_vec(self)
    }

    /// Deserialize and validate an envelope received from the wire.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Deserialization`] for malformed bytes and
    /// [`TransportError::ProtocolViolation`] for an unsupported version or an
    /// oversized payload.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TransportError> {
        let envelope: Self = cbor::from_slice(data)?;
        envelope.validate()?;
        Ok(envelope)
    }

    /// Validate the envelope header.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ProtocolViolation`] if the version is unsupported
    /// or the payload is too large.
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.version != WIRE_VERSION {
            return Err(TransportError::ProtocolViolation(format!(
                "unsupported wire version {}, expected {WIRE_VERSION}",
                self.version
            )));
        }
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(TransportError::ProtocolViolation(format!(
                "payload too large: {} bytes, max {MAX_PAYLOAD_SIZE}",
                self.payload.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> BridgedObservations {
        BridgedObservations {
            observations: vec![ObservationData::new(1_000, 100), ObservationData::new(1_020, -101)],
            pool_key: PoolKey::new([0x0A; 32], [0x0B; 32], 3000),
            pool_nonce: 3,
        }
    }

    #[test]
    fn test_envelope_carries_payload() {
        let payload = sample_payload().encode().expect("encode payload");
        let envelope = Envelope::new(1, [0x01; 32], 2, [0x02; 32], 5, payload);
        assert_eq!(envelope.version, WIRE_VERSION);

        let bytes = envelope.to_bytes().expect("serialize");
        let restored = Envelope::from_bytes(&bytes).expect("deserialize");
        assert_eq!(restored, envelope);

        let decoded = BridgedObservations::decode(&restored.payload).expect("decode payload");
        assert_eq!(decoded, sample_payload());
    }

    #[test]
    fn test_invalid_version_rejected() {
        let mut envelope = Envelope::new(1, [0x01; 32], 2, [0x02; 32], 0, Vec::new());
        envelope.version = 99;
        let bytes = cbor::to_vec(&envelope).expect("serialize");
        let err = Envelope::from_bytes(&bytes).expect_err("version mismatch");
        assert!(matches!(err, TransportError::ProtocolViolation(_)));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let envelope = Envelope::new(1, [0x01; 32], 2, [0x02; 32], 0, vec![0u8; MAX_PAYLOAD_SIZE + 1]);
        assert!(envelope.validate().is_err());
    }

    #[test]
    fn test_transfer_id_is_random() {
        let a = Envelope::new(1, [0x01; 32], 2, [0x02; 32], 0, Vec::new());
        let b = Envelope::new(1, [0x01; 32], 2, [0x02; 32], 0, Vec::new());
        assert_ne!(a.transfer_id, b.transfer_id);
    }
}
