//! Integration test: fetch, commit, send and deliver one observation list.
//!
//! 1. Open the pool through a first pipeline and fetch twice (nonce 2)
//! 2. Whitelist a second pipeline: its first accepted nonce is 3
//! 3. Fetch `[30, 10, 0]` over cumulatives `[3000, 5000, 6000]`
//! 4. Send nonce 3 through the sender adapter and the in-memory transport
//! 5. Deliver the envelope through the receiver adapter into the oracle
//! 6. Check `WrongNonce` for nonce 2 and `UnknownHash` for a mutated list

use std::sync::Arc;

use tidal_bridge::{BridgeError, BridgeReceiverAdapter, BridgeSenderAdapter};
use tidal_feed::commitment::observation_commitment;
use tidal_feed::{DataFeed, FeedError, PoolAdapter, StubPool};
use tidal_oracle::DataReceiver;
use tidal_transport::{BridgedObservations, MemoryTransport};
use tidal_types::{Address, ObservationData, PoolKey};

const GOVERNOR: Address = [0x60; 32];
const STRATEGY: Address = [0x57; 32];
const FEED: Address = [0xFE; 32];
const SENDER: Address = [0xA1; 32];
const RECEIVER_ADAPTER: Address = [0xA2; 32];
const DATA_RECEIVER: Address = [0xDA; 32];
const REGISTRY: Address = [0x4E; 32];
const OPENING_CHAIN: u32 = 1;
const CHAIN: u32 = 10;
const SOURCE_DOMAIN: u32 = 100;
const DESTINATION_DOMAIN: u32 = 200;
const NOW: u32 = 1_700_000_000;

fn pool_key() -> PoolKey {
    PoolKey::new([0x0A; 32], [0x0B; 32], 3000)
}

#[tokio::test]
async fn test_end_to_end_pipeline() {
    let (transport, mut inbox) = MemoryTransport::channel(SOURCE_DOMAIN);
    let mut feed = DataFeed::new(FEED, GOVERNOR, STRATEGY);

    // Tick 100 since NOW - 60: cumulative is 100 * (t - genesis).
    let pool = Arc::new(StubPool::new(NOW - 60, 100));
    let salt = feed
        .register_pool(GOVERNOR, pool_key(), pool.clone())
        .expect("register pool");
    assert_eq!(
        pool.observe(NOW, &[30, 10, 0]).expect("pool"),
        vec![3000, 5000, 6000]
    );

    // 1. Reach pool nonce 2 through an earlier pipeline.
    feed.whitelist_pipeline(GOVERNOR, OPENING_CHAIN, salt)
        .expect("opening pipeline");
    let first = feed
        .fetch_observations(STRATEGY, salt, &[10, 0], NOW - 50)
        .expect("fetch 1");
    let second = feed
        .fetch_observations(STRATEGY, salt, &[5, 0], NOW - 40)
        .expect("fetch 2");
    assert_eq!(first, vec![ObservationData::new(NOW - 60, 100)]);
    assert_eq!(second.len(), 2);
    assert_eq!(feed.last_pool_state_observed(&salt).pool_nonce, 2);

    // 2. The new pipeline starts after the current nonce.
    feed.whitelist_pipeline(GOVERNOR, CHAIN, salt)
        .expect("pipeline");
    assert_eq!(feed.whitelisted_nonce(CHAIN, &salt), 3);

    // 3. Fetch: bridging point from the snapshot, then the two intervals.
    let observations = feed
        .fetch_observations(STRATEGY, salt, &[30, 10, 0], NOW)
        .expect("fetch 3");
    assert_eq!(
        observations,
        vec![
            ObservationData::new(NOW - 40, 100),
            ObservationData::new(NOW - 30, 100),
            ObservationData::new(NOW - 10, 100),
        ]
    );
    let state = feed.last_pool_state_observed(&salt);
    assert_eq!(state.pool_nonce, 3);
    assert_eq!(state.tick_cumulative, 6000);
    assert!(feed.is_known_commitment(&observation_commitment(&salt, 3, &observations)));

    // 4. Wire the sender adapter and send nonce 3.
    let sender = BridgeSenderAdapter::new(SENDER, FEED, Arc::new(transport));
    feed.whitelist_adapter(GOVERNOR, Arc::new(sender), true)
        .expect("adapter");
    feed.set_destination_domain_id(GOVERNOR, SENDER, CHAIN, DESTINATION_DOMAIN)
        .expect("domain");
    feed.set_receiver(GOVERNOR, SENDER, DESTINATION_DOMAIN, RECEIVER_ADAPTER)
        .expect("receiver");

    let transfer_id = feed
        .send_observations(SENDER, CHAIN, salt, 3, &observations, 0)
        .expect("send");

    // 5. Deliver.
    let envelope = inbox.recv().await.expect("delivered").expect("decoded");
    assert_eq!(envelope.transfer_id, transfer_id);
    assert_eq!(envelope.destination_domain, DESTINATION_DOMAIN);
    let payload = BridgedObservations::decode(&envelope.payload).expect("payload");
    assert_eq!(payload.pool_nonce, 3);
    assert_eq!(payload.observations, observations);

    let mut receiver = DataReceiver::new(DATA_RECEIVER, GOVERNOR, REGISTRY, 8);
    receiver
        .whitelist_adapter(GOVERNOR, RECEIVER_ADAPTER, true)
        .expect("receiver adapter");
    let adapter = BridgeReceiverAdapter::new(RECEIVER_ADAPTER, SENDER, SOURCE_DOMAIN);
    assert!(adapter.receive(&envelope, &mut receiver).expect("receive"));

    let oracle = receiver.registry().oracle_for(&salt).expect("oracle deployed");
    assert_eq!(oracle.pool_key(), pool_key());
    let latest = oracle.latest_observation().expect("latest");
    assert_eq!(latest.block_timestamp, NOW - 10);
    assert_eq!(latest.tick_cumulative, 100 * 30);
    let (ticks, _) = oracle.observe(NOW, &[30, 10, 0]).expect("observe");
    assert_eq!(ticks, vec![1000, 3000, 4000]);

    // 6. Rejections.
    assert!(matches!(
        feed.send_observations(SENDER, CHAIN, salt, 2, &second, 0),
        Err(FeedError::WrongNonce {
            pool_nonce: 2,
            whitelisted_nonce: 3
        })
    ));
    let mut mutated = observations.clone();
    mutated[2].arithmetic_mean_tick = 101;
    assert!(matches!(
        feed.send_observations(SENDER, CHAIN, salt, 3, &mutated, 0),
        Err(FeedError::UnknownHash)
    ));
    assert!(inbox.try_recv().is_none());
}

#[test]
fn test_first_fetch_yields_interval_means() {
    let mut feed = DataFeed::new(FEED, GOVERNOR, STRATEGY);
    let salt = feed
        .register_pool(GOVERNOR, pool_key(), Arc::new(StubPool::new(NOW - 60, 100)))
        .expect("register pool");
    feed.whitelist_pipeline(GOVERNOR, CHAIN, salt)
        .expect("pipeline");

    let observations = feed
        .fetch_observations(STRATEGY, salt, &[30, 10, 0], NOW)
        .expect("fetch");
    assert_eq!(
        observations
            .iter()
            .map(|o| o.arithmetic_mean_tick)
            .collect::<Vec<_>>(),
        vec![100, 100]
    );
    assert_eq!(feed.last_pool_state_observed(&salt).pool_nonce, 1);
}

#[test]
fn test_unpinned_sender_cannot_deliver() {
    let (transport, mut inbox) = MemoryTransport::channel(SOURCE_DOMAIN);
    let rogue = BridgeSenderAdapter::new([0x66; 32], FEED, Arc::new(transport));
    rogue
        .dispatch(
            FEED,
            DESTINATION_DOMAIN,
            RECEIVER_ADAPTER,
            &[ObservationData::new(NOW, 1)],
            pool_key(),
            1,
            0,
        )
        .expect("dispatch");
    let envelope = inbox.try_recv().expect("queued").expect("decoded");

    let mut receiver = DataReceiver::new(DATA_RECEIVER, GOVERNOR, REGISTRY, 8);
    receiver
        .whitelist_adapter(GOVERNOR, RECEIVER_ADAPTER, true)
        .expect("receiver adapter");
    let adapter = BridgeReceiverAdapter::new(RECEIVER_ADAPTER, SENDER, SOURCE_DOMAIN);
    assert!(matches!(
        adapter.receive(&envelope, &mut receiver),
        Err(BridgeError::UnauthorizedCaller)
    ));
    assert!(!receiver.registry().is_deployed(&pool_key().salt()));
}
