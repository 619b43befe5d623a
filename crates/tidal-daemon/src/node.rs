//! Ledger wiring.
//!
//! Builds one source ledger (data feed, keeper job, stub pools, sender
//! adapter) and one destination ledger (data receiver, receiver adapter)
//! joined by an in-memory transport, and runs a keeper round on demand.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;
use tidal_bridge::{BridgeError, BridgeReceiverAdapter, BridgeSenderAdapter};
use tidal_feed::{DataFeed, StubPool};
use tidal_oracle::DataReceiver;
use tidal_strategy::{DataFeedStrategy, KeeperSet, StrategyJob};
use tidal_transport::{Envelope, MemoryInbox, MemoryTransport};
use tidal_types::{
    short_hex, Address, ChainId, Event, ObservationData, PoolSalt, TriggerReason, MAX_TICK,
    MIN_TICK,
};
use tracing::{debug, info, warn};

use crate::config::DaemonConfig;

/// Identities of every component, derived from fixed labels.
#[derive(Debug, Clone, Copy)]
pub struct Roles {
    pub governor: Address,
    pub feed: Address,
    pub strategy: Address,
    pub keeper: Address,
    pub sender_adapter: Address,
    pub receiver_adapter: Address,
    pub data_receiver: Address,
    pub registry: Address,
}

impl Roles {
    pub fn derive() -> Self {
        let role = |label: &str| tidal_crypto::blake3::hash(label.as_bytes());
        Self {
            governor: role("tidal/governor"),
            feed: role("tidal/data-feed"),
            strategy: role("tidal/strategy"),
            keeper: role("tidal/keeper"),
            sender_adapter: role("tidal/sender-adapter"),
            receiver_adapter: role("tidal/receiver-adapter"),
            data_receiver: role("tidal/data-receiver"),
            registry: role("tidal/oracle-registry"),
        }
    }
}

struct ManagedPool {
    salt: PoolSalt,
    pool: Arc<StubPool>,
    tick_drift: i32,
    /// Fetched lists not yet bridged, by nonce.
    pending: BTreeMap<u32, Vec<ObservationData>>,
}

/// The source ledger and its keeper.
pub struct SourceLedger {
    feed: DataFeed,
    job: StrategyJob<KeeperSet>,
    keeper: Address,
    chain_id: ChainId,
    pools: Vec<ManagedPool>,
}

/// The destination ledger and its inbound adapter.
#[derive(Debug)]
pub struct DestinationLedger {
    receiver: DataReceiver,
    adapter: BridgeReceiverAdapter,
}

/// Build both ledgers. Stub pools are given `cooldown` seconds of history
/// before `now`.
pub fn build(
    config: &DaemonConfig,
    now: u32,
) -> anyhow::Result<(SourceLedger, DestinationLedger, MemoryInbox)> {
    let roles = Roles::derive();
    let chain_id = config.destination.chain_id;
    let destination_domain = config.destination.domain;

    let (transport, inbox) = MemoryTransport::channel(config.source.domain);

    let strategy = DataFeedStrategy::new(roles.strategy, roles.governor, config.strategy.params())?;
    let mut keepers = KeeperSet::new();
    keepers.add_keeper(roles.keeper);
    let job = StrategyJob::new(strategy, keepers, roles.sender_adapter);

    let mut feed = DataFeed::new(roles.feed, roles.governor, roles.strategy);
    let sender = BridgeSenderAdapter::new(roles.sender_adapter, roles.feed, Arc::new(transport));
    feed.whitelist_adapter(roles.governor, Arc::new(sender), true)?;
    feed.set_destination_domain_id(
        roles.governor,
        roles.sender_adapter,
        chain_id,
        destination_domain,
    )?;
    feed.set_receiver(
        roles.governor,
        roles.sender_adapter,
        destination_domain,
        roles.receiver_adapter,
    )?;

    let genesis = now.saturating_sub(config.strategy.cooldown);
    let mut pools = Vec::with_capacity(config.pools.len());
    for pool_config in &config.pools {
        let pool = Arc::new(StubPool::new(genesis, pool_config.initial_tick));
        let salt = feed.register_pool(roles.governor, pool_config.key()?, pool.clone())?;
        feed.whitelist_pipeline(roles.governor, chain_id, salt)?;
        info!(pool_salt = %hex::encode(salt), fee = pool_config.fee, "pool configured");
        pools.push(ManagedPool {
            salt,
            pool,
            tick_drift: pool_config.tick_drift,
            pending: BTreeMap::new(),
        });
    }

    let mut receiver = DataReceiver::new(
        roles.data_receiver,
        roles.governor,
        roles.registry,
        config.destination.initial_cardinality,
    );
    receiver.whitelist_adapter(roles.governor, roles.receiver_adapter, true)?;
    let adapter = BridgeReceiverAdapter::new(
        roles.receiver_adapter,
        roles.sender_adapter,
        config.source.domain,
    );

    let source = SourceLedger {
        feed,
        job,
        keeper: roles.keeper,
        chain_id,
        pools,
    };
    Ok((source, DestinationLedger { receiver, adapter }, inbox))
}

impl SourceLedger {
    pub fn feed(&self) -> &DataFeed {
        &self.feed
    }

    pub fn pool_salts(&self) -> Vec<PoolSalt> {
        self.pools.iter().map(|p| p.salt).collect()
    }

    /// Move every drifting stub pool by a random tick step from `now` on,
    /// then drop pool history no fetch or trigger check can reach any more.
    pub fn drift_prices(&mut self, now: u32, rng: &mut impl Rng) {
        for managed in self.pools.iter().filter(|p| p.tick_drift > 0) {
            let step = rng.gen_range(-managed.tick_drift..=managed.tick_drift);
            let tick = managed
                .pool
                .tick_at(now)
                .saturating_add(step)
                .clamp(MIN_TICK, MAX_TICK);
            managed.pool.set_tick(now, tick);
        }
        self.prune_history(now);
    }

    /// Earliest timestamp a keeper round at `now` or later may sample.
    fn history_horizon(&self, salt: &PoolSalt, now: u32) -> u32 {
        let twap_start = now.saturating_sub(self.job.strategy().params().twap_length);
        let last = self.feed.last_pool_state_observed(salt);
        if last.is_observed() {
            twap_start.min(last.block_timestamp)
        } else {
            twap_start
        }
    }

    fn prune_history(&self, now: u32) {
        for managed in &self.pools {
            let horizon = self.history_horizon(&managed.salt, now);
            match managed.pool.prune_before(horizon) {
                Ok(0) => {}
                Ok(dropped) => {
                    debug!(pool_salt = %short_hex(&managed.salt), horizon, dropped, "pool history pruned")
                }
                Err(e) => warn!(pool_salt = %short_hex(&managed.salt), error = %e, "pool prune failed"),
            }
        }
    }

    /// One keeper round: fetch every strategic pool, then bridge every due
    /// nonce in order. Returns the events emitted.
    pub fn run_keeper(&mut self, now: u32) -> Vec<Event> {
        let Self {
            feed,
            job,
            keeper,
            chain_id,
            pools,
        } = self;

        for managed in pools.iter_mut() {
            let salt = managed.salt;
            match job.workable_fetch(feed, salt, now) {
                Ok(TriggerReason::None) => {}
                Ok(reason) => match job.work_fetch(*keeper, feed, salt, reason, now) {
                    Ok(observations) => {
                        let nonce = feed.last_pool_state_observed(&salt).pool_nonce;
                        managed.pending.insert(nonce, observations);
                    }
                    Err(e) => warn!(pool_salt = %short_hex(&salt), error = %e, "fetch failed"),
                },
                Err(e) => {
                    warn!(pool_salt = %short_hex(&salt), error = %e, "strategic check failed")
                }
            }

            loop {
                let due = managed
                    .pending
                    .iter()
                    .find(|(nonce, _)| job.workable_send(feed, *chain_id, salt, **nonce))
                    .map(|(nonce, observations)| (*nonce, observations.clone()));
                let Some((nonce, observations)) = due else {
                    break;
                };
                match job.work_send(*keeper, feed, *chain_id, salt, nonce, &observations) {
                    Ok(_) => managed.pending.retain(|pending, _| *pending > nonce),
                    Err(e) => {
                        warn!(pool_salt = %short_hex(&salt), nonce, error = %e, "send failed");
                        break;
                    }
                }
            }
        }

        let mut events = feed.drain_events();
        events.extend(job.drain_events());
        events
    }
}

impl DestinationLedger {
    pub fn receiver(&self) -> &DataReceiver {
        &self.receiver
    }

    /// Hand one envelope to the receiver adapter.
    pub fn deliver(&mut self, envelope: &Envelope) -> Result<bool, BridgeError> {
        self.adapter.receive(envelope, &mut self.receiver)
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.receiver.drain_events()
    }
}
