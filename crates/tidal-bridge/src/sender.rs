//! Source-side relay adapter.

use std::sync::Arc;

use tidal_feed::{BridgeSender, DispatchError};
use tidal_transport::{BridgedObservations, MessageTransport};
use tidal_types::{short_hex, Address, DomainId, ObservationData, PoolKey, TransferId};

use crate::{BridgeError, Result};

/// Relays committed observation lists from one data feed onto a transport.
pub struct BridgeSenderAdapter {
    address: Address,
    data_feed: Address,
    transport: Arc<dyn MessageTransport>,
}

impl std::fmt::Debug for BridgeSenderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeSenderAdapter")
            .field("address", &short_hex(&self.address))
            .field("data_feed", &short_hex(&self.data_feed))
            .field("origin_domain", &self.transport.origin_domain())
            .finish()
    }
}

impl BridgeSenderAdapter {
    pub fn new(address: Address, data_feed: Address, transport: Arc<dyn MessageTransport>) -> Self {
        Self {
            address,
            data_feed,
            transport,
        }
    }

    pub fn data_feed(&self) -> Address {
        self.data_feed
    }

    /// Encode and dispatch one list.
    #[allow(clippy::too_many_arguments)]
    pub fn dispatch(
        &self,
        caller: Address,
        destination_domain: DomainId,
        receiver: Address,
        observations: &[ObservationData],
        pool_key: PoolKey,
        pool_nonce: u32,
        value: u128,
    ) -> Result<TransferId> {
        if caller != self.data_feed {
            return Err(BridgeError::OnlyDataFeed);
        }
        let payload = BridgedObservations {
            observations: observations.to_vec(),
            pool_key,
            pool_nonce,
        }
        .encode()?;

        let transfer_id =
            self.transport
                .xcall(self.address, destination_domain, receiver, payload, value)?;
        tracing::debug!(
            transfer_id = %short_hex(&transfer_id),
            destination_domain,
            pool_nonce,
            "observations dispatched"
        );
        Ok(transfer_id)
    }
}

impl BridgeSender for BridgeSenderAdapter {
    fn address(&self) -> Address {
        self.address
    }

    fn bridge_observations(
        &self,
        caller: Address,
        destination_domain: DomainId,
        receiver: Address,
        observations: &[ObservationData],
        pool_key: PoolKey,
        pool_nonce: u32,
        value: u128,
    ) -> std::result::Result<TransferId, DispatchError> {
        self.dispatch(
            caller,
            destination_domain,
            receiver,
            observations,
            pool_key,
            pool_nonce,
            value,
        )
        .map_err(Into::into)
    }
}
