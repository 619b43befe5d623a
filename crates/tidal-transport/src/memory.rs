//! Transport interface and an in-process implementation.
//!
//! [`MemoryTransport`] moves CBOR-encoded envelopes from one origin domain to
//! an inbox over an unbounded Tokio channel. Delivery is asynchronous and
//! may be repeated by the consumer; nothing here deduplicates.

use tidal_types::{short_hex, Address, DomainId, TransferId};
use tokio::sync::mpsc;

use crate::wire::Envelope;
use crate::{Result, TransportError};

/// The message transport a sender adapter dispatches through.
pub trait MessageTransport: Send + Sync {
    /// Domain of the ledger this transport sends from.
    fn origin_domain(&self) -> DomainId;

    /// Dispatch `payload` to `recipient` on `destination_domain`.
    ///
    /// `origin_sender` is the identity of the calling adapter; the far side
    /// uses it to authenticate the call.
    fn xcall(
        &self,
        origin_sender: Address,
        destination_domain: DomainId,
        recipient: Address,
        payload: Vec<u8>,
        value: u128,
    ) -> Result<TransferId>;
}

/// In-process transport from a single origin domain.
#[derive(Clone, Debug)]
pub struct MemoryTransport {
    origin_domain: DomainId,
    sender: mpsc::UnboundedSender<Vec<u8>>,
}

/// Receiving end of a [`MemoryTransport`].
#[derive(Debug)]
pub struct MemoryInbox {
    receiver: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemoryTransport {
    /// Create a connected transport/inbox pair for `origin_domain`.
    pub fn channel(origin_domain: DomainId) -> (Self, MemoryInbox) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                origin_domain,
                sender,
            },
            MemoryInbox { receiver },
        )
    }
}

impl MessageTransport for MemoryTransport {
    fn origin_domain(&self) -> DomainId {
        self.origin_domain
    }

    fn xcall(
        &self,
        origin_sender: Address,
        destination_domain: DomainId,
        recipient: Address,
        payload: Vec<u8>,
        value: u128,
    ) -> Result<TransferId> {
        let envelope = Envelope::new(
            self.origin_domain,
            origin_sender,
            destination_domain,
            recipient,
            value,
            payload,
        );
        envelope.validate()?;
        let transfer_id = envelope.transfer_id;
        let bytes = envelope.to_bytes()?;

        self.sender
            .send(bytes)
            .map_err(|_| TransportError::Connection("inbox closed".to_string()))?;

        tracing::debug!(
            transfer_id = %short_hex(&transfer_id),
            origin_domain = self.origin_domain,
            destination_domain,
            "xcall dispatched"
        );
        Ok(transfer_id)
    }
}

impl MemoryInbox {
    /// Wait for the next envelope. Returns `None` once every transport
    /// handle is dropped and the queue is empty.
    pub async fn recv(&mut self) -> Option<Result<Envelope>> {
        let bytes = self.receiver.recv().await?;
        Some(Envelope::from_bytes(&bytes))
    }

    /// Take the next envelope if one is queued.
    pub fn try_recv(&mut self) -> Option<Result<Envelope>> {
        let bytes = self.receiver.try_recv().ok()?;
        Some(Envelope::from_bytes(&bytes))
    }
}
