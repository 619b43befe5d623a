//! Destination-side relay adapter.

use tidal_oracle::DataReceiver;
use tidal_transport::{BridgedObservations, Envelope};
use tidal_types::{short_hex, Address, DomainId};

use crate::{BridgeError, Result};

/// Accepts envelopes from one pinned source adapter and forwards them to a
/// data receiver.
#[derive(Clone, Debug)]
pub struct BridgeReceiverAdapter {
    address: Address,
    source_sender: Address,
    source_domain: DomainId,
}

impl BridgeReceiverAdapter {
    /// # Arguments
    ///
    /// * `address` - Identity of this adapter, whitelisted on the receiver
    /// * `source_sender` - The only sender adapter accepted
    /// * `source_domain` - Domain the sender adapter lives on
    pub fn new(address: Address, source_sender: Address, source_domain: DomainId) -> Self {
        Self {
            address,
            source_sender,
            source_domain,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Authenticate, decode and forward one envelope.
    ///
    /// Returns whatever the receiver returns: `false` for a list the oracle
    /// dropped as non-advancing.
    pub fn receive(&self, envelope: &Envelope, receiver: &mut DataReceiver) -> Result<bool> {
        if envelope.origin_sender != self.source_sender
            || envelope.origin_domain != self.source_domain
        {
            tracing::warn!(
                origin_sender = %short_hex(&envelope.origin_sender),
                origin_domain = envelope.origin_domain,
                "envelope from unauthorized caller"
            );
            return Err(BridgeError::UnauthorizedCaller);
        }
        if envelope.recipient != self.address {
            return Err(BridgeError::WrongRecipient);
        }

        let payload = BridgedObservations::decode(&envelope.payload)?;
        let written = receiver.add_observations(
            self.address,
            &payload.observations,
            payload.pool_key,
            payload.pool_nonce,
        )?;
        tracing::debug!(
            transfer_id = %short_hex(&envelope.transfer_id),
            pool_nonce = payload.pool_nonce,
            written,
            "envelope received"
        );
        Ok(written)
    }
}
