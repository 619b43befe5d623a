//! Events emitted by Tidal components.
//!
//! Every component appends to its own [`EventLog`] as it transitions state.
//! Hosts drain the log after each call and forward the events wherever they
//! need to go (the daemon pushes them onto its broadcast bus).

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::{Address, ChainId, DomainId, ObservationData, PoolSalt, TransferId, TriggerReason};

/// A state transition worth reporting outside the component.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // Source ledger: data feed
    PoolObserved {
        #[serde_as(as = "serde_with::hex::Hex")]
        pool_salt: PoolSalt,
        pool_nonce: u32,
        observations: Vec<ObservationData>,
    },
    DataBroadcast {
        #[serde_as(as = "serde_with::hex::Hex")]
        pool_salt: PoolSalt,
        pool_nonce: u32,
        chain_id: ChainId,
        destination_domain: DomainId,
        #[serde_as(as = "serde_with::hex::Hex")]
        receiver: Address,
        #[serde_as(as = "serde_with::hex::Hex")]
        transfer_id: TransferId,
    },
    PipelineWhitelisted {
        chain_id: ChainId,
        #[serde_as(as = "serde_with::hex::Hex")]
        pool_salt: PoolSalt,
        whitelisted_nonce: u32,
    },
    AdapterWhitelisted {
        #[serde_as(as = "serde_with::hex::Hex")]
        adapter: Address,
        is_whitelisted: bool,
    },
    DestinationDomainIdSet {
        #[serde_as(as = "serde_with::hex::Hex")]
        adapter: Address,
        chain_id: ChainId,
        destination_domain: DomainId,
    },
    ReceiverSet {
        #[serde_as(as = "serde_with::hex::Hex")]
        adapter: Address,
        destination_domain: DomainId,
        #[serde_as(as = "serde_with::hex::Hex")]
        receiver: Address,
    },

    // Source ledger: trigger engine
    StrategicFetch {
        #[serde_as(as = "serde_with::hex::Hex")]
        pool_salt: PoolSalt,
        reason: TriggerReason,
    },
    ForcedFetch {
        #[serde_as(as = "serde_with::hex::Hex")]
        pool_salt: PoolSalt,
        from_timestamp: u32,
    },
    StrategyParamsSet {
        cooldown: u32,
        period_length: u32,
        twap_length: u32,
        upper_twap_threshold: i32,
        lower_twap_threshold: i32,
    },
    KeeperWorked {
        #[serde_as(as = "serde_with::hex::Hex")]
        keeper: Address,
        #[serde_as(as = "serde_with::hex::Hex")]
        pool_salt: PoolSalt,
        pool_nonce: u32,
    },

    // Destination ledger
    OracleDeployed {
        #[serde_as(as = "serde_with::hex::Hex")]
        oracle: Address,
        #[serde_as(as = "serde_with::hex::Hex")]
        pool_salt: PoolSalt,
        pool_nonce: u32,
    },
    ObservationWritten {
        #[serde_as(as = "serde_with::hex::Hex")]
        pool_salt: PoolSalt,
        block_timestamp: u32,
        tick_cumulative: i64,
    },
    CardinalityIncreased {
        #[serde_as(as = "serde_with::hex::Hex")]
        pool_salt: PoolSalt,
        old_cardinality_next: u16,
        new_cardinality_next: u16,
    },
    ObservationsAdded {
        #[serde_as(as = "serde_with::hex::Hex")]
        pool_salt: PoolSalt,
        pool_nonce: u32,
        #[serde_as(as = "serde_with::hex::Hex")]
        adapter: Address,
    },
}

impl Event {
    /// Snake-case event name, as used in the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Event::PoolObserved { .. } => "pool_observed",
            Event::DataBroadcast { .. } => "data_broadcast",
            Event::PipelineWhitelisted { .. } => "pipeline_whitelisted",
            Event::AdapterWhitelisted { .. } => "adapter_whitelisted",
            Event::DestinationDomainIdSet { .. } => "destination_domain_id_set",
            Event::ReceiverSet { .. } => "receiver_set",
            Event::StrategicFetch { .. } => "strategic_fetch",
            Event::ForcedFetch { .. } => "forced_fetch",
            Event::StrategyParamsSet { .. } => "strategy_params_set",
            Event::KeeperWorked { .. } => "keeper_worked",
            Event::OracleDeployed { .. } => "oracle_deployed",
            Event::ObservationWritten { .. } => "observation_written",
            Event::CardinalityIncreased { .. } => "cardinality_increased",
            Event::ObservationsAdded { .. } => "observations_added",
        }
    }
}

/// Append-only buffer of events awaiting collection by the host.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Take every pending event, leaving the log empty.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn pending(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
