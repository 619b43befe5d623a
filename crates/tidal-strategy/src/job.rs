//! Keeper-gated strategy job.
//!
//! [`StrategyJob`] wraps a [`DataFeedStrategy`] so that fetches and sends are
//! performed by registered keepers and reported to a work gate. It also
//! guards the bridge against replays: per pipeline, the first nonce bridged
//! is the latest one observed and every later one is exactly the next.

use std::collections::{HashMap, HashSet};

use tidal_feed::DataFeed;
use tidal_types::{
    short_hex, Address, ChainId, Event, EventLog, ObservationData, PoolSalt, TransferId,
    TriggerReason,
};

use crate::strategy::DataFeedStrategy;
use crate::{Result, StrategyError};

/// Registry of keepers and their work.
pub trait WorkGate: Send {
    /// Whether `keeper` may perform work.
    fn is_keeper(&self, keeper: &Address) -> bool;

    /// Record one unit of work by `keeper`.
    fn worked(&mut self, keeper: &Address);
}

/// In-memory [`WorkGate`].
#[derive(Clone, Debug, Default)]
pub struct KeeperSet {
    keepers: HashSet<Address>,
    work: HashMap<Address, u64>,
}

impl KeeperSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_keeper(&mut self, keeper: Address) {
        self.keepers.insert(keeper);
    }

    pub fn remove_keeper(&mut self, keeper: &Address) {
        self.keepers.remove(keeper);
    }

    /// Units of work recorded for `keeper`.
    pub fn work_count(&self, keeper: &Address) -> u64 {
        self.work.get(keeper).copied().unwrap_or_default()
    }
}

impl WorkGate for KeeperSet {
    fn is_keeper(&self, keeper: &Address) -> bool {
        self.keepers.contains(keeper)
    }

    fn worked(&mut self, keeper: &Address) {
        *self.work.entry(*keeper).or_default() += 1;
    }
}

/// A strategy driven by keepers.
#[derive(Debug)]
pub struct StrategyJob<G: WorkGate> {
    strategy: DataFeedStrategy,
    gate: G,
    default_adapter: Address,
    last_bridged: HashMap<(ChainId, PoolSalt), u32>,
    events: EventLog,
}

impl<G: WorkGate> StrategyJob<G> {
    /// Wrap `strategy`, sending through `default_adapter`.
    pub fn new(strategy: DataFeedStrategy, gate: G, default_adapter: Address) -> Self {
        Self {
            strategy,
            gate,
            default_adapter,
            last_bridged: HashMap::new(),
            events: EventLog::new(),
        }
    }

    pub fn strategy(&self) -> &DataFeedStrategy {
        &self.strategy
    }

    pub fn strategy_mut(&mut self) -> &mut DataFeedStrategy {
        &mut self.strategy
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    pub fn gate_mut(&mut self) -> &mut G {
        &mut self.gate
    }

    pub fn default_adapter(&self) -> Address {
        self.default_adapter
    }

    /// Last nonce this job bridged on the pipeline.
    pub fn last_bridged_nonce(&self, chain_id: ChainId, pool_salt: &PoolSalt) -> Option<u32> {
        self.last_bridged.get(&(chain_id, *pool_salt)).copied()
    }

    /// Replace the adapter sends are routed through.
    pub fn set_default_bridge_sender_adapter(
        &mut self,
        caller: Address,
        adapter: Address,
    ) -> Result<()> {
        if caller != self.strategy.governor() {
            return Err(StrategyError::OnlyGovernor);
        }
        tracing::warn!(adapter = %short_hex(&adapter), "default bridge adapter changed");
        self.default_adapter = adapter;
        Ok(())
    }

    /// Trigger reason a keeper could act on now.
    pub fn workable_fetch(
        &self,
        feed: &DataFeed,
        pool_salt: PoolSalt,
        now: u32,
    ) -> Result<TriggerReason> {
        self.strategy.is_strategic(feed, pool_salt, now)
    }

    /// Whether `pool_nonce` is the next nonce due on the pipeline.
    pub fn workable_send(
        &self,
        feed: &DataFeed,
        chain_id: ChainId,
        pool_salt: PoolSalt,
        pool_nonce: u32,
    ) -> bool {
        feed.whitelisted_nonce(chain_id, &pool_salt) != 0
            && self.is_next_nonce(feed, chain_id, &pool_salt, pool_nonce)
    }

    fn is_next_nonce(
        &self,
        feed: &DataFeed,
        chain_id: ChainId,
        pool_salt: &PoolSalt,
        pool_nonce: u32,
    ) -> bool {
        match self.last_bridged_nonce(chain_id, pool_salt) {
            None => pool_nonce == feed.last_pool_state_observed(pool_salt).pool_nonce,
            Some(last) => last.checked_add(1) == Some(pool_nonce),
        }
    }

    fn only_keeper(&self, keeper: &Address) -> Result<()> {
        if !self.gate.is_keeper(keeper) {
            return Err(StrategyError::KeeperNotValid);
        }
        Ok(())
    }

    /// Perform a strategic fetch on behalf of `keeper`.
    pub fn work_fetch(
        &mut self,
        keeper: Address,
        feed: &mut DataFeed,
        pool_salt: PoolSalt,
        reason: TriggerReason,
        now: u32,
    ) -> Result<Vec<ObservationData>> {
        self.only_keeper(&keeper)?;
        let observations = self
            .strategy
            .strategic_fetch_observations(feed, pool_salt, reason, now)?;
        let pool_nonce = feed.last_pool_state_observed(&pool_salt).pool_nonce;
        self.record_work(keeper, pool_salt, pool_nonce);
        Ok(observations)
    }

    /// Bridge the next due nonce on behalf of `keeper`.
    ///
    /// # Errors
    ///
    /// [`StrategyError::KeeperNotValid`] for an unregistered keeper,
    /// [`StrategyError::NotWorkable`] for a nonce out of sequence; feed errors
    /// are wrapped.
    pub fn work_send(
        &mut self,
        keeper: Address,
        feed: &mut DataFeed,
        chain_id: ChainId,
        pool_salt: PoolSalt,
        pool_nonce: u32,
        observations: &[ObservationData],
    ) -> Result<TransferId> {
        self.only_keeper(&keeper)?;
        if !self.is_next_nonce(feed, chain_id, &pool_salt, pool_nonce) {
            tracing::debug!(
                chain_id,
                pool_salt = %short_hex(&pool_salt),
                pool_nonce,
                "nonce out of sequence"
            );
            return Err(StrategyError::NotWorkable);
        }

        let transfer_id = feed.send_observations(
            self.default_adapter,
            chain_id,
            pool_salt,
            pool_nonce,
            observations,
            0,
        )?;
        self.last_bridged.insert((chain_id, pool_salt), pool_nonce);
        self.record_work(keeper, pool_salt, pool_nonce);
        Ok(transfer_id)
    }

    fn record_work(&mut self, keeper: Address, pool_salt: PoolSalt, pool_nonce: u32) {
        self.gate.worked(&keeper);
        tracing::info!(
            keeper = %short_hex(&keeper),
            pool_salt = %short_hex(&pool_salt),
            pool_nonce,
            "keeper worked"
        );
        self.events.emit(Event::KeeperWorked {
            keeper,
            pool_salt,
            pool_nonce,
        });
    }

    /// Take every event emitted by the job and its strategy since the last
    /// drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut events = self.strategy.drain_events();
        events.extend(self.events.drain());
        events
    }
}
