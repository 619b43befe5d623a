//! The Data Feed ledger.
//!
//! ## Fetch
//!
//! ```text
//! seconds_agos  [s0, s1, ..., sn]          (strictly decreasing)
//! pool          [c0, c1, ..., cn]          (cumulative at now - si)
//! observations  [(now - s(i-1), floor((ci - c(i-1)) / (s(i-1) - si)))]
//! ```
//!
//! When the pool was observed before, a bridging observation is prepended
//! that starts at the previous snapshot and runs to the first new sample, so
//! consecutive fetches tile time without gaps.
//!
//! ## Send
//!
//! A committed list may be relayed by anyone, any number of times, through a
//! whitelisted adapter that has a destination domain and receiver wired for
//! the target chain.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tidal_crypto::Digest;
use tidal_types::{
    short_hex, Address, ChainId, DomainId, Event, EventLog, ObservationData, PoolKey, PoolSalt,
    PoolState, TransferId,
};

use crate::commitment::observation_commitment;
use crate::math::mean_tick;
use crate::pool::PoolAdapter;
use crate::{FeedError, Result};

/// Error surfaced by a bridge adapter.
pub type DispatchError = Box<dyn std::error::Error + Send + Sync>;

/// A sender-side relay adapter.
pub trait BridgeSender: Send + Sync {
    /// Identity the feed whitelists and routes by.
    fn address(&self) -> Address;

    /// Relay a committed observation list to `receiver` on
    /// `destination_domain`, forwarding `value` to the transport.
    ///
    /// `caller` is the identity of the invoking feed.
    #[allow(clippy::too_many_arguments)]
    fn bridge_observations(
        &self,
        caller: Address,
        destination_domain: DomainId,
        receiver: Address,
        observations: &[ObservationData],
        pool_key: PoolKey,
        pool_nonce: u32,
        value: u128,
    ) -> std::result::Result<TransferId, DispatchError>;
}

struct RegisteredPool {
    key: PoolKey,
    adapter: Arc<dyn PoolAdapter>,
}

/// Source-side ledger state of the Data Feed.
pub struct DataFeed {
    address: Address,
    governor: Address,
    strategy: Address,
    pools: HashMap<PoolSalt, RegisteredPool>,
    whitelisted_pools: HashSet<PoolSalt>,
    whitelisted_nonces: HashMap<(ChainId, PoolSalt), u32>,
    pool_states: HashMap<PoolSalt, PoolState>,
    commitments: HashSet<Digest>,
    adapters: HashMap<Address, Arc<dyn BridgeSender>>,
    destination_domains: HashMap<(Address, ChainId), DomainId>,
    receivers: HashMap<(Address, DomainId), Address>,
    events: EventLog,
}

impl std::fmt::Debug for DataFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFeed")
            .field("address", &short_hex(&self.address))
            .field("pools", &self.pools.len())
            .field("commitments", &self.commitments.len())
            .field("adapters", &self.adapters.len())
            .finish_non_exhaustive()
    }
}

impl DataFeed {
    /// Create an empty feed.
    ///
    /// # Arguments
    ///
    /// * `address` - Identity of the feed itself, presented to bridge adapters
    /// * `governor` - The single privileged role
    /// * `strategy` - The only identity allowed to fetch
    pub fn new(address: Address, governor: Address, strategy: Address) -> Self {
        Self {
            address,
            governor,
            strategy,
            pools: HashMap::new(),
            whitelisted_pools: HashSet::new(),
            whitelisted_nonces: HashMap::new(),
            pool_states: HashMap::new(),
            commitments: HashSet::new(),
            adapters: HashMap::new(),
            destination_domains: HashMap::new(),
            receivers: HashMap::new(),
            events: EventLog::new(),
        }
    }

    fn only_governor(&self, caller: Address) -> Result<()> {
        if caller != self.governor {
            return Err(FeedError::OnlyGovernor);
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Governance
    // ---------------------------------------------------------------

    /// Register the adapter that answers for `key`. Returns the pool salt.
    pub fn register_pool(
        &mut self,
        caller: Address,
        key: PoolKey,
        adapter: Arc<dyn PoolAdapter>,
    ) -> Result<PoolSalt> {
        self.only_governor(caller)?;
        let salt = key.salt();
        self.pools.insert(salt, RegisteredPool { key, adapter });
        tracing::warn!(pool_salt = %short_hex(&salt), fee = key.fee, "pool registered");
        Ok(salt)
    }

    /// Open the `(chain_id, pool_salt)` pipeline from the next nonce onward.
    ///
    /// Also whitelists the pool for fetching.
    pub fn whitelist_pipeline(
        &mut self,
        caller: Address,
        chain_id: ChainId,
        pool_salt: PoolSalt,
    ) -> Result<()> {
        self.only_governor(caller)?;
        self.open_pipeline(chain_id, pool_salt)
    }

    /// Whitelist several pipelines. Either all are opened or none.
    pub fn whitelist_pipelines(
        &mut self,
        caller: Address,
        pipelines: &[(ChainId, PoolSalt)],
    ) -> Result<()> {
        self.only_governor(caller)?;
        if pipelines
            .iter()
            .any(|(_, salt)| !self.pools.contains_key(salt))
        {
            return Err(FeedError::UnknownPool);
        }
        for (chain_id, pool_salt) in pipelines {
            self.open_pipeline(*chain_id, *pool_salt)?;
        }
        Ok(())
    }

    fn open_pipeline(&mut self, chain_id: ChainId, pool_salt: PoolSalt) -> Result<()> {
        if !self.pools.contains_key(&pool_salt) {
            return Err(FeedError::UnknownPool);
        }
        let whitelisted_nonce = self
            .last_pool_state_observed(&pool_salt)
            .pool_nonce
            .checked_add(1)
            .ok_or(FeedError::Arithmetic("pool nonce overflow"))?;

        self.whitelisted_nonces
            .insert((chain_id, pool_salt), whitelisted_nonce);
        self.whitelisted_pools.insert(pool_salt);

        tracing::warn!(
            chain_id,
            pool_salt = %short_hex(&pool_salt),
            whitelisted_nonce,
            "pipeline whitelisted"
        );
        self.events.emit(Event::PipelineWhitelisted {
            chain_id,
            pool_salt,
            whitelisted_nonce,
        });
        Ok(())
    }

    /// Whitelist or remove a bridge adapter.
    pub fn whitelist_adapter(
        &mut self,
        caller: Address,
        adapter: Arc<dyn BridgeSender>,
        is_whitelisted: bool,
    ) -> Result<()> {
        self.only_governor(caller)?;
        let address = adapter.address();
        if is_whitelisted {
            self.adapters.insert(address, adapter);
        } else {
            self.adapters.remove(&address);
        }
        tracing::warn!(adapter = %short_hex(&address), is_whitelisted, "adapter whitelist changed");
        self.events.emit(Event::AdapterWhitelisted {
            adapter: address,
            is_whitelisted,
        });
        Ok(())
    }

    /// Map `(adapter, chain_id)` to a transport domain.
    pub fn set_destination_domain_id(
        &mut self,
        caller: Address,
        adapter: Address,
        chain_id: ChainId,
        destination_domain: DomainId,
    ) -> Result<()> {
        self.only_governor(caller)?;
        self.destination_domains
            .insert((adapter, chain_id), destination_domain);
        tracing::warn!(
            adapter = %short_hex(&adapter),
            chain_id,
            destination_domain,
            "destination domain set"
        );
        self.events.emit(Event::DestinationDomainIdSet {
            adapter,
            chain_id,
            destination_domain,
        });
        Ok(())
    }

    /// Map `(adapter, destination_domain)` to the receiving adapter there.
    pub fn set_receiver(
        &mut self,
        caller: Address,
        adapter: Address,
        destination_domain: DomainId,
        receiver: Address,
    ) -> Result<()> {
        self.only_governor(caller)?;
        self.receivers
            .insert((adapter, destination_domain), receiver);
        tracing::warn!(
            adapter = %short_hex(&adapter),
            destination_domain,
            receiver = %short_hex(&receiver),
            "receiver set"
        );
        self.events.emit(Event::ReceiverSet {
            adapter,
            destination_domain,
            receiver,
        });
        Ok(())
    }

    /// Replace the identity allowed to fetch.
    pub fn set_strategy(&mut self, caller: Address, strategy: Address) -> Result<()> {
        self.only_governor(caller)?;
        tracing::warn!(strategy = %short_hex(&strategy), "strategy changed");
        self.strategy = strategy;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Fetch
    // ---------------------------------------------------------------

    /// Sample the pool at `now - seconds_agos[i]` and commit to the derived
    /// observations.
    ///
    /// Offsets must strictly decrease. Each returned observation is keyed by
    /// the start of the interval it averages.
    ///
    /// # Errors
    ///
    /// [`FeedError::OnlyStrategy`], [`FeedError::UnallowedPool`] and
    /// [`FeedError::InvalidSecondsAgos`] are checked in that order. Pool
    /// failures are wrapped; unordered offsets or ticks out of range yield
    /// [`FeedError::Arithmetic`].
    pub fn fetch_observations(
        &mut self,
        caller: Address,
        pool_salt: PoolSalt,
        seconds_agos: &[u32],
        now: u32,
    ) -> Result<Vec<ObservationData>> {
        if caller != self.strategy {
            return Err(FeedError::OnlyStrategy);
        }
        if !self.whitelisted_pools.contains(&pool_salt) {
            return Err(FeedError::UnallowedPool);
        }
        if seconds_agos.len() < 2 {
            return Err(FeedError::InvalidSecondsAgos(seconds_agos.len()));
        }
        let pool = self.pools.get(&pool_salt).ok_or(FeedError::UnknownPool)?;

        let cumulatives = pool.adapter.observe(now, seconds_agos)?;
        if cumulatives.len() != seconds_agos.len() {
            return Err(FeedError::Arithmetic("pool returned wrong sample count"));
        }

        let timestamps = seconds_agos
            .iter()
            .map(|s| now.checked_sub(*s))
            .collect::<Option<Vec<u32>>>()
            .ok_or(FeedError::Arithmetic("seconds ago exceeds now"))?;

        let last_state = self.last_pool_state_observed(&pool_salt);
        let mut observations = Vec::with_capacity(seconds_agos.len());

        if last_state.is_observed() {
            let tick = interval_mean(
                last_state.block_timestamp,
                timestamps[0],
                last_state.tick_cumulative,
                cumulatives[0],
            )?;
            observations.push(ObservationData::new(last_state.block_timestamp, tick));
        }

        for i in 1..timestamps.len() {
            let tick = interval_mean(
                timestamps[i - 1],
                timestamps[i],
                cumulatives[i - 1],
                cumulatives[i],
            )?;
            observations.push(ObservationData::new(timestamps[i - 1], tick));
        }

        let pool_nonce = last_state
            .pool_nonce
            .checked_add(1)
            .ok_or(FeedError::Arithmetic("pool nonce overflow"))?;
        let last_index = timestamps.len() - 1;
        let arithmetic_mean_tick = observations
            .last()
            .map(|o| o.arithmetic_mean_tick)
            .unwrap_or_default();

        self.pool_states.insert(
            pool_salt,
            PoolState {
                pool_nonce,
                block_timestamp: timestamps[last_index],
                tick_cumulative: cumulatives[last_index],
                arithmetic_mean_tick,
            },
        );
        self.commitments
            .insert(observation_commitment(&pool_salt, pool_nonce, &observations));

        tracing::info!(
            pool_salt = %short_hex(&pool_salt),
            pool_nonce,
            count = observations.len(),
            "pool observed"
        );
        self.events.emit(Event::PoolObserved {
            pool_salt,
            pool_nonce,
            observations: observations.clone(),
        });

        Ok(observations)
    }

    // ---------------------------------------------------------------
    // Send
    // ---------------------------------------------------------------

    /// Relay a committed observation list to `chain_id` through `adapter`.
    ///
    /// Permissionless: the commitment check is the authorization.
    ///
    /// # Errors
    ///
    /// Checked in order: [`FeedError::UnallowedPipeline`],
    /// [`FeedError::WrongNonce`], [`FeedError::UnknownHash`],
    /// [`FeedError::UnallowedAdapter`], [`FeedError::DestinationDomainIdNotSet`],
    /// [`FeedError::ReceiverNotSet`]. Adapter failures are wrapped in
    /// [`FeedError::Dispatch`].
    pub fn send_observations(
        &mut self,
        adapter: Address,
        chain_id: ChainId,
        pool_salt: PoolSalt,
        pool_nonce: u32,
        observations: &[ObservationData],
        value: u128,
    ) -> Result<TransferId> {
        let whitelisted_nonce = self.whitelisted_nonce(chain_id, &pool_salt);
        if whitelisted_nonce == 0 {
            return Err(FeedError::UnallowedPipeline);
        }
        if pool_nonce < whitelisted_nonce {
            return Err(FeedError::WrongNonce {
                pool_nonce,
                whitelisted_nonce,
            });
        }
        let commitment = observation_commitment(&pool_salt, pool_nonce, observations);
        if !self.commitments.contains(&commitment) {
            return Err(FeedError::UnknownHash);
        }

        let sender = self
            .adapters
            .get(&adapter)
            .ok_or(FeedError::UnallowedAdapter)?;
        let destination_domain = *self
            .destination_domains
            .get(&(adapter, chain_id))
            .ok_or(FeedError::DestinationDomainIdNotSet)?;
        let receiver = *self
            .receivers
            .get(&(adapter, destination_domain))
            .ok_or(FeedError::ReceiverNotSet)?;
        let pool_key = self.pool_key(&pool_salt).ok_or(FeedError::UnknownPool)?;

        let transfer_id = sender
            .bridge_observations(
                self.address,
                destination_domain,
                receiver,
                observations,
                pool_key,
                pool_nonce,
                value,
            )
            .map_err(FeedError::Dispatch)?;

        tracing::info!(
            pool_salt = %short_hex(&pool_salt),
            pool_nonce,
            chain_id,
            destination_domain,
            transfer_id = %short_hex(&transfer_id),
            "data broadcast"
        );
        self.events.emit(Event::DataBroadcast {
            pool_salt,
            pool_nonce,
            chain_id,
            destination_domain,
            receiver,
            transfer_id,
        });

        Ok(transfer_id)
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn governor(&self) -> Address {
        self.governor
    }

    pub fn strategy(&self) -> Address {
        self.strategy
    }

    /// Latest snapshot for the pool; all-zero if never observed.
    pub fn last_pool_state_observed(&self, pool_salt: &PoolSalt) -> PoolState {
        self.pool_states
            .get(pool_salt)
            .copied()
            .unwrap_or_default()
    }

    /// First nonce accepted on the pipeline; zero if not whitelisted.
    pub fn whitelisted_nonce(&self, chain_id: ChainId, pool_salt: &PoolSalt) -> u32 {
        self.whitelisted_nonces
            .get(&(chain_id, *pool_salt))
            .copied()
            .unwrap_or_default()
    }

    pub fn is_whitelisted_pool(&self, pool_salt: &PoolSalt) -> bool {
        self.whitelisted_pools.contains(pool_salt)
    }

    pub fn is_whitelisted_adapter(&self, adapter: &Address) -> bool {
        self.adapters.contains_key(adapter)
    }

    pub fn is_known_commitment(&self, commitment: &Digest) -> bool {
        self.commitments.contains(commitment)
    }

    /// The adapter answering for a registered pool.
    pub fn pool(&self, pool_salt: &PoolSalt) -> Option<Arc<dyn PoolAdapter>> {
        self.pools.get(pool_salt).map(|p| Arc::clone(&p.adapter))
    }

    pub fn pool_key(&self, pool_salt: &PoolSalt) -> Option<PoolKey> {
        self.pools.get(pool_salt).map(|p| p.key)
    }

    pub fn destination_domain_id(&self, adapter: &Address, chain_id: ChainId) -> Option<DomainId> {
        self.destination_domains.get(&(*adapter, chain_id)).copied()
    }

    pub fn receiver(&self, adapter: &Address, destination_domain: DomainId) -> Option<Address> {
        self.receivers.get(&(*adapter, destination_domain)).copied()
    }

    /// Take every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }
}

/// Mean tick of the interval `[start, end)`.
fn interval_mean(start: u32, end: u32, cumulative_start: i64, cumulative_end: i64) -> Result<i32> {
    let delta_t = end
        .checked_sub(start)
        .filter(|dt| *dt > 0)
        .ok_or(FeedError::Arithmetic("sample timestamps must strictly increase"))?;
    let delta_cumulative = cumulative_end
        .checked_sub(cumulative_start)
        .ok_or(FeedError::Arithmetic("tick cumulative delta overflow"))?;
    mean_tick(delta_cumulative, delta_t).ok_or(FeedError::Arithmetic("mean tick out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::StubPool;
    use crate::PoolError;
    use std::sync::Mutex;

    const GOVERNOR: Address = [0x60; 32];
    const STRATEGY: Address = [0x57; 32];
    const FEED: Address = [0xFE; 32];
    const ADAPTER: Address = [0xAD; 32];
    const RECEIVER: Address = [0xEC; 32];
    const CHAIN: ChainId = 10;
    const DOMAIN: DomainId = 1_000;
    const NOW: u32 = 1_000_000;

    /// Adapter that records every relay.
    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(Address, DomainId, Address, u32, u128)>>,
    }

    impl BridgeSender for RecordingSender {
        fn address(&self) -> Address {
            ADAPTER
        }

        fn bridge_observations(
            &self,
            caller: Address,
            destination_domain: DomainId,
            receiver: Address,
            _observations: &[ObservationData],
            _pool_key: PoolKey,
            pool_nonce: u32,
            value: u128,
        ) -> std::result::Result<TransferId, DispatchError> {
            let mut sent = self.sent.lock().expect("lock");
            sent.push((caller, destination_domain, receiver, pool_nonce, value));
            Ok([sent.len() as u8; 32])
        }
    }

    fn key() -> PoolKey {
        PoolKey::new([0x0A; 32], [0x0B; 32], 3000)
    }

    fn setup() -> (DataFeed, PoolSalt, Arc<StubPool>) {
        let mut feed = DataFeed::new(FEED, GOVERNOR, STRATEGY);
        let pool = Arc::new(StubPool::new(NOW - 60, 100));
        let salt = feed
            .register_pool(GOVERNOR, key(), pool.clone())
            .expect("register");
        feed.whitelist_pipeline(GOVERNOR, CHAIN, salt)
            .expect("whitelist");
        (feed, salt, pool)
    }

    fn wire_adapter(feed: &mut DataFeed) -> Arc<RecordingSender> {
        let sender = Arc::new(RecordingSender::default());
        feed.whitelist_adapter(GOVERNOR, sender.clone(), true)
            .expect("adapter");
        feed.set_destination_domain_id(GOVERNOR, ADAPTER, CHAIN, DOMAIN)
            .expect("domain");
        feed.set_receiver(GOVERNOR, ADAPTER, DOMAIN, RECEIVER)
            .expect("receiver");
        sender
    }

    #[test]
    fn test_first_fetch_has_no_bridging_point() {
        let (mut feed, salt, _) = setup();
        let obs = feed
            .fetch_observations(STRATEGY, salt, &[30, 10, 0], NOW)
            .expect("fetch");
        assert_eq!(
            obs,
            vec![
                ObservationData::new(NOW - 30, 100),
                ObservationData::new(NOW - 10, 100)
            ]
        );

        let state = feed.last_pool_state_observed(&salt);
        assert_eq!(state.pool_nonce, 1);
        assert_eq!(state.block_timestamp, NOW);
        assert_eq!(state.tick_cumulative, 6000);
        assert_eq!(state.arithmetic_mean_tick, 100);
    }

    #[test]
    fn test_second_fetch_bridges_from_snapshot() {
        let (mut feed, salt, pool) = setup();
        feed.fetch_observations(STRATEGY, salt, &[30, 10, 0], NOW)
            .expect("first");

        pool.set_tick(NOW, -50);
        let obs = feed
            .fetch_observations(STRATEGY, salt, &[10, 0], NOW + 20)
            .expect("second");
        assert_eq!(
            obs,
            vec![
                ObservationData::new(NOW, -50),
                ObservationData::new(NOW + 10, -50)
            ]
        );
        assert_eq!(feed.last_pool_state_observed(&salt).pool_nonce, 2);
    }

    #[test]
    fn test_negative_mean_rounds_down() {
        let mut feed = DataFeed::new(FEED, GOVERNOR, STRATEGY);
        let pool = Arc::new(StubPool::new(NOW - 100, 0));
        let salt = feed
            .register_pool(GOVERNOR, key(), pool.clone())
            .expect("register");
        feed.whitelist_pipeline(GOVERNOR, CHAIN, salt)
            .expect("whitelist");
        // -100 for 19s then -1 for 1s: cumulative delta -1901 over 20s
        pool.set_tick(NOW - 20, -100);
        pool.set_tick(NOW - 1, -1);
        let obs = feed
            .fetch_observations(STRATEGY, salt, &[20, 0], NOW)
            .expect("fetch");
        assert_eq!(obs[0].arithmetic_mean_tick, -96);
    }

    #[test]
    fn test_fetch_check_order() {
        let (mut feed, salt, _) = setup();
        assert!(matches!(
            feed.fetch_observations(GOVERNOR, [0x99; 32], &[1], NOW),
            Err(FeedError::OnlyStrategy)
        ));
        assert!(matches!(
            feed.fetch_observations(STRATEGY, [0x99; 32], &[1], NOW),
            Err(FeedError::UnallowedPool)
        ));
        assert!(matches!(
            feed.fetch_observations(STRATEGY, salt, &[1], NOW),
            Err(FeedError::InvalidSecondsAgos(1))
        ));
    }

    #[test]
    fn test_unordered_offsets_fault() {
        let (mut feed, salt, _) = setup();
        assert!(matches!(
            feed.fetch_observations(STRATEGY, salt, &[10, 10], NOW),
            Err(FeedError::Arithmetic(_))
        ));
        assert!(matches!(
            feed.fetch_observations(STRATEGY, salt, &[0, 10], NOW),
            Err(FeedError::Arithmetic(_))
        ));
        assert_eq!(feed.last_pool_state_observed(&salt).pool_nonce, 0);
        assert!(feed.drain_events().iter().all(|e| e.name() != "pool_observed"));
    }

    #[test]
    fn test_pool_error_wrapped() {
        let (mut feed, salt, _) = setup();
        let err = feed
            .fetch_observations(STRATEGY, salt, &[120, 0], NOW)
            .expect_err("too old");
        assert!(matches!(err, FeedError::Pool(PoolError::TooOld { .. })));
    }

    #[test]
    fn test_fetch_commits_and_emits() {
        let (mut feed, salt, _) = setup();
        feed.drain_events();
        let obs = feed
            .fetch_observations(STRATEGY, salt, &[30, 10, 0], NOW)
            .expect("fetch");
        assert!(feed.is_known_commitment(&observation_commitment(&salt, 1, &obs)));

        let events = feed.drain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            Event::PoolObserved { pool_nonce: 1, observations, .. } if *observations == obs
        ));
    }

    #[test]
    fn test_send_relays_committed_list() {
        let (mut feed, salt, _) = setup();
        let sender = wire_adapter(&mut feed);
        let obs = feed
            .fetch_observations(STRATEGY, salt, &[30, 10, 0], NOW)
            .expect("fetch");

        let transfer_id = feed
            .send_observations(ADAPTER, CHAIN, salt, 1, &obs, 7)
            .expect("send");
        assert_eq!(transfer_id, [1u8; 32]);

        let sent = sender.sent.lock().expect("lock");
        assert_eq!(sent.as_slice(), &[(FEED, DOMAIN, RECEIVER, 1, 7)]);
    }

    #[test]
    fn test_send_is_repeatable() {
        let (mut feed, salt, _) = setup();
        let sender = wire_adapter(&mut feed);
        let obs = feed
            .fetch_observations(STRATEGY, salt, &[30, 10, 0], NOW)
            .expect("fetch");
        feed.send_observations(ADAPTER, CHAIN, salt, 1, &obs, 0)
            .expect("first");
        feed.send_observations(ADAPTER, CHAIN, salt, 1, &obs, 0)
            .expect("second");
        assert_eq!(sender.sent.lock().expect("lock").len(), 2);
    }

    #[test]
    fn test_send_rejects_uncommitted() {
        let (mut feed, salt, _) = setup();
        wire_adapter(&mut feed);
        let mut obs = feed
            .fetch_observations(STRATEGY, salt, &[30, 10, 0], NOW)
            .expect("fetch");
        obs[0].arithmetic_mean_tick += 1;
        assert!(matches!(
            feed.send_observations(ADAPTER, CHAIN, salt, 1, &obs, 0),
            Err(FeedError::UnknownHash)
        ));
    }

    #[test]
    fn test_send_check_order() {
        let (mut feed, salt, _) = setup();
        let obs = feed
            .fetch_observations(STRATEGY, salt, &[30, 10, 0], NOW)
            .expect("fetch");

        assert!(matches!(
            feed.send_observations(ADAPTER, CHAIN + 1, salt, 1, &obs, 0),
            Err(FeedError::UnallowedPipeline)
        ));
        assert!(matches!(
            feed.send_observations(ADAPTER, CHAIN, salt, 0, &obs, 0),
            Err(FeedError::WrongNonce {
                pool_nonce: 0,
                whitelisted_nonce: 1
            })
        ));
        assert!(matches!(
            feed.send_observations(ADAPTER, CHAIN, salt, 2, &obs, 0),
            Err(FeedError::UnknownHash)
        ));
        assert!(matches!(
            feed.send_observations(ADAPTER, CHAIN, salt, 1, &obs, 0),
            Err(FeedError::UnallowedAdapter)
        ));

        feed.whitelist_adapter(GOVERNOR, Arc::new(RecordingSender::default()), true)
            .expect("adapter");
        assert!(matches!(
            feed.send_observations(ADAPTER, CHAIN, salt, 1, &obs, 0),
            Err(FeedError::DestinationDomainIdNotSet)
        ));

        feed.set_destination_domain_id(GOVERNOR, ADAPTER, CHAIN, DOMAIN)
            .expect("domain");
        assert!(matches!(
            feed.send_observations(ADAPTER, CHAIN, salt, 1, &obs, 0),
            Err(FeedError::ReceiverNotSet)
        ));
    }

    #[test]
    fn test_whitelist_after_fetch_skips_old_nonces() {
        let (mut feed, salt, _) = setup();
        wire_adapter(&mut feed);
        let first = feed
            .fetch_observations(STRATEGY, salt, &[30, 10, 0], NOW)
            .expect("fetch");

        feed.whitelist_pipeline(GOVERNOR, CHAIN + 1, salt)
            .expect("late pipeline");
        assert_eq!(feed.whitelisted_nonce(CHAIN + 1, &salt), 2);
        assert!(matches!(
            feed.send_observations(ADAPTER, CHAIN + 1, salt, 1, &first, 0),
            Err(FeedError::WrongNonce { .. })
        ));
    }

    #[test]
    fn test_governance_requires_governor() {
        let (mut feed, salt, _) = setup();
        assert!(matches!(
            feed.whitelist_pipeline(STRATEGY, CHAIN, salt),
            Err(FeedError::OnlyGovernor)
        ));
        assert!(matches!(
            feed.set_receiver(STRATEGY, ADAPTER, DOMAIN, RECEIVER),
            Err(FeedError::OnlyGovernor)
        ));
        assert!(matches!(
            feed.set_strategy(STRATEGY, STRATEGY),
            Err(FeedError::OnlyGovernor)
        ));
    }

    #[test]
    fn test_whitelist_pipelines_is_atomic() {
        let (mut feed, salt, _) = setup();
        let result = feed.whitelist_pipelines(GOVERNOR, &[(20, salt), (21, [0x42; 32])]);
        assert!(matches!(result, Err(FeedError::UnknownPool)));
        assert_eq!(feed.whitelisted_nonce(20, &salt), 0);

        feed.whitelist_pipelines(GOVERNOR, &[(20, salt), (21, salt)])
            .expect("batch");
        assert_eq!(feed.whitelisted_nonce(20, &salt), 1);
        assert_eq!(feed.whitelisted_nonce(21, &salt), 1);
    }

    #[test]
    fn test_adapter_removal() {
        let (mut feed, _, _) = setup();
        wire_adapter(&mut feed);
        assert!(feed.is_whitelisted_adapter(&ADAPTER));
        feed.whitelist_adapter(GOVERNOR, Arc::new(RecordingSender::default()), false)
            .expect("remove");
        assert!(!feed.is_whitelisted_adapter(&ADAPTER));
    }
}
