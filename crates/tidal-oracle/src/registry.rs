//! The oracle registry.
//!
//! Oracle addresses are derived, not assigned:
//!
//! ```text
//! address = BLAKE3::derive_fields("Tidal v1 oracle-address",
//!     [registry_address, pool_salt, ORACLE_TEMPLATE_HASH])
//! ```
//!
//! so any party can compute where a pool's oracle lives before it exists,
//! and the address never depends on which nonce first deployed it.

use std::collections::HashMap;

use tidal_crypto::blake3::{self, contexts};
use tidal_crypto::Digest;
use tidal_types::{short_hex, Address, Event, EventLog, PoolKey, PoolSalt};

use crate::oracle::SidechainOracle;
use crate::{OracleError, Result};

/// Identifier of the oracle creation template.
pub fn oracle_template_hash() -> Digest {
    blake3::derive_key(contexts::ORACLE_TEMPLATE, b"SidechainOracle")
}

/// Deploys and tracks the sidechain oracles of one destination ledger.
#[derive(Debug)]
pub struct OracleRegistry {
    address: Address,
    governor: Address,
    data_receiver: Address,
    initial_cardinality: u16,
    template_hash: Digest,
    oracles: HashMap<Address, SidechainOracle>,
    events: EventLog,
}

impl OracleRegistry {
    pub fn new(
        address: Address,
        governor: Address,
        data_receiver: Address,
        initial_cardinality: u16,
    ) -> Self {
        Self {
            address,
            governor,
            data_receiver,
            initial_cardinality,
            template_hash: oracle_template_hash(),
            oracles: HashMap::new(),
            events: EventLog::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn data_receiver(&self) -> Address {
        self.data_receiver
    }

    pub fn initial_cardinality(&self) -> u16 {
        self.initial_cardinality
    }

    /// Deterministic address of the oracle for `pool_salt`.
    pub fn compute_oracle_address(&self, pool_salt: &PoolSalt) -> Address {
        blake3::derive_fields(
            contexts::ORACLE_ADDRESS,
            &[&self.address, pool_salt, &self.template_hash],
        )
    }

    /// Deploy the oracle for `pool_key`, or return the existing one.
    pub fn deploy_oracle(
        &mut self,
        caller: Address,
        pool_key: PoolKey,
        pool_nonce: u32,
    ) -> Result<Address> {
        if caller != self.data_receiver {
            return Err(OracleError::OnlyDataReceiver);
        }
        let pool_salt = pool_key.salt();
        let oracle_address = self.compute_oracle_address(&pool_salt);
        if self.oracles.contains_key(&oracle_address) {
            return Ok(oracle_address);
        }

        let mut oracle = SidechainOracle::new(oracle_address, pool_key, self.data_receiver);
        oracle.increase_observation_cardinality_next(self.initial_cardinality)?;
        self.oracles.insert(oracle_address, oracle);

        tracing::info!(
            oracle = %short_hex(&oracle_address),
            pool_salt = %short_hex(&pool_salt),
            pool_nonce,
            "oracle deployed"
        );
        self.events.emit(Event::OracleDeployed {
            oracle: oracle_address,
            pool_salt,
            pool_nonce,
        });
        Ok(oracle_address)
    }

    fn only_governor(&self, caller: Address) -> Result<()> {
        if caller != self.governor {
            return Err(OracleError::OnlyGovernor);
        }
        Ok(())
    }

    /// Replace the identity allowed to deploy and write.
    ///
    /// Oracles deployed earlier keep their writer.
    pub fn set_data_receiver(&mut self, caller: Address, data_receiver: Address) -> Result<()> {
        self.only_governor(caller)?;
        tracing::warn!(data_receiver = %short_hex(&data_receiver), "data receiver changed");
        self.data_receiver = data_receiver;
        Ok(())
    }

    /// Slots allocated for newly deployed oracles.
    pub fn set_initial_cardinality(&mut self, caller: Address, cardinality: u16) -> Result<()> {
        self.only_governor(caller)?;
        tracing::warn!(cardinality, "initial cardinality changed");
        self.initial_cardinality = cardinality;
        Ok(())
    }

    /// Grow a deployed oracle's buffer.
    pub fn increase_oracle_cardinality(
        &mut self,
        caller: Address,
        pool_salt: &PoolSalt,
        cardinality_next: u16,
    ) -> Result<()> {
        self.only_governor(caller)?;
        let address = self.compute_oracle_address(pool_salt);
        self.oracles
            .get_mut(&address)
            .ok_or(OracleError::UnknownOracle)?
            .increase_observation_cardinality_next(cardinality_next)
    }

    pub fn oracle(&self, address: &Address) -> Option<&SidechainOracle> {
        self.oracles.get(address)
    }

    pub fn oracle_mut(&mut self, address: &Address) -> Option<&mut SidechainOracle> {
        self.oracles.get_mut(address)
    }

    /// The deployed oracle for `pool_salt`, if any.
    pub fn oracle_for(&self, pool_salt: &PoolSalt) -> Option<&SidechainOracle> {
        self.oracles.get(&self.compute_oracle_address(pool_salt))
    }

    pub fn is_deployed(&self, pool_salt: &PoolSalt) -> bool {
        self.oracle_for(pool_salt).is_some()
    }

    /// Take every event emitted by the registry and its oracles.
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut events = self.events.drain();
        for oracle in self.oracles.values_mut() {
            events.extend(oracle.drain_events());
        }
        events
    }
}
