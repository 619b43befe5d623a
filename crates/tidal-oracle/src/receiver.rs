//! The data receiver.

use std::collections::HashSet;

use tidal_types::{short_hex, Address, Event, EventLog, ObservationData, PoolKey};

use crate::registry::OracleRegistry;
use crate::{OracleError, Result};

/// Destination-side entry point for bridged observation lists.
#[derive(Debug)]
pub struct DataReceiver {
    address: Address,
    governor: Address,
    registry: OracleRegistry,
    adapters: HashSet<Address>,
    events: EventLog,
}

impl DataReceiver {
    /// Create a receiver together with the registry it deploys through.
    pub fn new(
        address: Address,
        governor: Address,
        registry_address: Address,
        initial_cardinality: u16,
    ) -> Self {
        Self {
            address,
            governor,
            registry: OracleRegistry::new(registry_address, governor, address, initial_cardinality),
            adapters: HashSet::new(),
            events: EventLog::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn registry(&self) -> &OracleRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut OracleRegistry {
        &mut self.registry
    }

    pub fn is_whitelisted_adapter(&self, adapter: &Address) -> bool {
        self.adapters.contains(adapter)
    }

    /// Allow or revoke a receiver adapter.
    pub fn whitelist_adapter(
        &mut self,
        caller: Address,
        adapter: Address,
        is_whitelisted: bool,
    ) -> Result<()> {
        if caller != self.governor {
            return Err(OracleError::OnlyGovernor);
        }
        if is_whitelisted {
            self.adapters.insert(adapter);
        } else {
            self.adapters.remove(&adapter);
        }
        tracing::warn!(adapter = %short_hex(&adapter), is_whitelisted, "adapter whitelist changed");
        self.events.emit(Event::AdapterWhitelisted {
            adapter,
            is_whitelisted,
        });
        Ok(())
    }

    /// Append a bridged list to the pool's oracle, deploying it if needed.
    ///
    /// Returns `Ok(false)` when the oracle dropped the list as non-advancing.
    pub fn add_observations(
        &mut self,
        caller: Address,
        observations: &[ObservationData],
        pool_key: PoolKey,
        pool_nonce: u32,
    ) -> Result<bool> {
        if !self.adapters.contains(&caller) {
            return Err(OracleError::UnallowedAdapter);
        }

        let pool_salt = pool_key.salt();
        let oracle_address = self
            .registry
            .deploy_oracle(self.address, pool_key, pool_nonce)?;
        let oracle = self
            .registry
            .oracle_mut(&oracle_address)
            .ok_or(OracleError::UnknownOracle)?;

        if !oracle.write(self.address, observations)? {
            tracing::debug!(
                pool_salt = %short_hex(&pool_salt),
                pool_nonce,
                "observations not written"
            );
            return Ok(false);
        }

        tracing::info!(
            pool_salt = %short_hex(&pool_salt),
            pool_nonce,
            adapter = %short_hex(&caller),
            "observations added"
        );
        self.events.emit(Event::ObservationsAdded {
            pool_salt,
            pool_nonce,
            adapter: caller,
        });
        Ok(true)
    }

    /// Take every event emitted by the receiver, its registry and oracles.
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut events = self.events.drain();
        events.extend(self.registry.drain_events());
        events
    }
}
