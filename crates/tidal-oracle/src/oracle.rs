//! The sidechain oracle.
//!
//! A per-pool ring buffer of tick cumulatives rebuilt from bridged mean
//! ticks. Each bridged datum says "from `block_timestamp` on, the mean tick
//! was `arithmetic_mean_tick`". The tick is not known to have ended until
//! the next datum arrives, so a write accumulates the *previous* mean tick
//! over the gap and then remembers the new one for extrapolation.

use ethnum::U256;
use tidal_types::{observation::is_strictly_ascending, short_hex};
use tidal_types::{Address, Event, EventLog, ObservationData, PoolKey, PoolSalt};

use crate::observation::{self, Observation, Slot0};
use crate::{OracleError, Result};

/// Replicated oracle for one pool.
#[derive(Debug)]
pub struct SidechainOracle {
    address: Address,
    pool_key: PoolKey,
    pool_salt: PoolSalt,
    writer: Address,
    slot0: Slot0,
    observations: Vec<Observation>,
    last_mean_tick: i32,
    events: EventLog,
}

impl SidechainOracle {
    /// Create an uninitialized oracle that accepts writes from `writer`.
    pub fn new(address: Address, pool_key: PoolKey, writer: Address) -> Self {
        Self {
            address,
            pool_key,
            pool_salt: pool_key.salt(),
            writer,
            slot0: Slot0::default(),
            observations: Vec::new(),
            last_mean_tick: 0,
            events: EventLog::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn pool_key(&self) -> PoolKey {
        self.pool_key
    }

    pub fn pool_salt(&self) -> PoolSalt {
        self.pool_salt
    }

    pub fn slot0(&self) -> Slot0 {
        self.slot0
    }

    /// Mean tick of the newest bridged datum.
    pub fn last_mean_tick(&self) -> i32 {
        self.last_mean_tick
    }

    pub fn is_initialized(&self) -> bool {
        self.slot0.observation_cardinality > 0
    }

    /// Stored entry at slot `index`.
    pub fn observation(&self, index: usize) -> Option<Observation> {
        self.observations.get(index).copied()
    }

    /// Newest stored entry.
    pub fn latest_observation(&self) -> Option<Observation> {
        if !self.is_initialized() {
            return None;
        }
        self.observation(usize::from(self.slot0.observation_index))
    }

    /// Seed the buffer with the first bridged datum.
    pub fn initialize(&mut self, caller: Address, first: ObservationData) -> Result<()> {
        self.only_writer(caller)?;
        if self.is_initialized() {
            return Err(OracleError::AlreadyInitialized);
        }
        self.seed(first);
        Ok(())
    }

    fn seed(&mut self, first: ObservationData) {
        if self.observations.is_empty() {
            self.observations.push(Observation::default());
        }
        self.observations[0] = Observation::first(first.block_timestamp);
        self.slot0 = Slot0 {
            observation_index: 0,
            observation_cardinality: 1,
            observation_cardinality_next: self.slot0.observation_cardinality_next.max(1),
        };
        self.last_mean_tick = first.arithmetic_mean_tick;
        self.emit_written(Observation::first(first.block_timestamp));
    }

    fn only_writer(&self, caller: Address) -> Result<()> {
        if caller != self.writer {
            return Err(OracleError::OnlyDataReceiver);
        }
        Ok(())
    }

    /// Append a bridged list.
    ///
    /// Returns `Ok(false)` without touching state when the list is empty, not
    /// strictly ascending, or does not start after the newest stored entry.
    /// An uninitialized oracle seeds itself from the first element.
    pub fn write(&mut self, caller: Address, observations: &[ObservationData]) -> Result<bool> {
        self.only_writer(caller)?;

        let Some(first) = observations.first() else {
            return Ok(false);
        };
        let advances = self
            .latest_observation()
            .map_or(true, |latest| first.block_timestamp > latest.block_timestamp);
        if !advances || !is_strictly_ascending(observations) {
            tracing::debug!(
                pool_salt = %short_hex(&self.pool_salt),
                first_timestamp = first.block_timestamp,
                "non-advancing batch dropped"
            );
            return Ok(false);
        }

        let rest = if self.is_initialized() {
            observations
        } else {
            self.seed(*first);
            &observations[1..]
        };

        for datum in rest {
            self.append(*datum);
        }

        tracing::info!(
            pool_salt = %short_hex(&self.pool_salt),
            count = observations.len(),
            index = self.slot0.observation_index,
            cardinality = self.slot0.observation_cardinality,
            "observations written"
        );
        Ok(true)
    }

    fn append(&mut self, datum: ObservationData) {
        let index = usize::from(self.slot0.observation_index);
        let next = self.observations[index].transform(datum.block_timestamp, self.last_mean_tick);
        let (index_updated, cardinality_updated) = self.slot0.advance();

        self.observations[usize::from(index_updated)] = next;
        self.slot0.observation_index = index_updated;
        self.slot0.observation_cardinality = cardinality_updated;
        self.last_mean_tick = datum.arithmetic_mean_tick;
        self.emit_written(next);
    }

    fn emit_written(&mut self, entry: Observation) {
        self.events.emit(Event::ObservationWritten {
            pool_salt: self.pool_salt,
            block_timestamp: entry.block_timestamp,
            tick_cumulative: entry.tick_cumulative,
        });
    }

    /// Cumulatives at `now - seconds_ago` for each offset.
    ///
    /// # Errors
    ///
    /// [`OracleError::NotInitialized`] on an empty buffer,
    /// [`OracleError::Arithmetic`] when an offset exceeds `now`,
    /// [`OracleError::ObservationTooOld`] when a target precedes the oldest
    /// entry.
    pub fn observe(&self, now: u32, seconds_agos: &[u32]) -> Result<(Vec<i64>, Vec<U256>)> {
        let mut tick_cumulatives = Vec::with_capacity(seconds_agos.len());
        let mut seconds_per_liquidity = Vec::with_capacity(seconds_agos.len());
        for &seconds_ago in seconds_agos {
            let entry = self.observe_single(now, seconds_ago)?;
            tick_cumulatives.push(entry.tick_cumulative);
            seconds_per_liquidity.push(entry.seconds_per_liquidity_cumulative_x128);
        }
        Ok((tick_cumulatives, seconds_per_liquidity))
    }

    fn observe_single(&self, now: u32, seconds_ago: u32) -> Result<Observation> {
        let latest = self.latest_observation().ok_or(OracleError::NotInitialized)?;
        let target = now
            .checked_sub(seconds_ago)
            .ok_or(OracleError::Arithmetic("seconds ago exceeds now"))?;

        if target >= latest.block_timestamp {
            return Ok(if target == latest.block_timestamp {
                latest
            } else {
                latest.transform(target, self.last_mean_tick)
            });
        }

        let oldest = observation::oldest(&self.observations, &self.slot0);
        if target < oldest.block_timestamp {
            return Err(OracleError::ObservationTooOld {
                target,
                oldest: oldest.block_timestamp,
            });
        }

        let (before, after) = observation::binary_search(&self.observations, &self.slot0, target)?;
        if target == before.block_timestamp {
            Ok(before)
        } else if target == after.block_timestamp {
            Ok(after)
        } else {
            before.interpolate(&after, target)
        }
    }

    /// Allocate slots up to `next`. Smaller values are ignored.
    pub fn increase_observation_cardinality_next(&mut self, next: u16) -> Result<()> {
        let old = self.slot0.observation_cardinality_next;
        if next <= old {
            return Ok(());
        }
        self.observations
            .resize(usize::from(next), Observation::default());
        self.slot0.observation_cardinality_next = next;

        tracing::info!(
            pool_salt = %short_hex(&self.pool_salt),
            old_cardinality_next = old,
            new_cardinality_next = next,
            "cardinality increased"
        );
        self.events.emit(Event::CardinalityIncreased {
            pool_salt: self.pool_salt,
            old_cardinality_next: old,
            new_cardinality_next: next,
        });
        Ok(())
    }

    /// Take every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRITER: Address = [0xDA; 32];

    fn oracle() -> SidechainOracle {
        SidechainOracle::new([0x0C; 32], PoolKey::new([1; 32], [2; 32], 500), WRITER)
    }

    fn obs(ts: u32, tick: i32) -> ObservationData {
        ObservationData::new(ts, tick)
    }

    #[test]
    fn test_initialize_once() {
        let mut oracle = oracle();
        oracle.initialize(WRITER, obs(100, 7)).expect("init");
        assert_eq!(oracle.last_mean_tick(), 7);
        assert_eq!(oracle.slot0().observation_cardinality, 1);
        assert!(matches!(
            oracle.initialize(WRITER, obs(200, 7)),
            Err(OracleError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_only_writer() {
        let mut oracle = oracle();
        assert!(matches!(
            oracle.write([0x01; 32], &[obs(100, 1)]),
            Err(OracleError::OnlyDataReceiver)
        ));
    }

    #[test]
    fn test_write_self_initializes() {
        let mut oracle = oracle();
        assert!(oracle
            .write(WRITER, &[obs(100, 10), obs(110, 20)])
            .expect("write"));

        let latest = oracle.latest_observation().expect("latest");
        assert_eq!(latest.block_timestamp, 110);
        assert_eq!(latest.tick_cumulative, 100);
        assert_eq!(oracle.last_mean_tick(), 20);
    }

    #[test]
    fn test_non_advancing_batch_dropped() {
        let mut oracle = oracle();
        oracle.write(WRITER, &[obs(100, 10)]).expect("write");
        oracle.drain_events();

        assert!(!oracle.write(WRITER, &[obs(100, 5)]).expect("same ts"));
        assert!(!oracle.write(WRITER, &[obs(90, 5)]).expect("older"));
        assert!(!oracle
            .write(WRITER, &[obs(120, 5), obs(120, 6)])
            .expect("duplicate"));
        assert!(!oracle.write(WRITER, &[]).expect("empty"));

        assert_eq!(oracle.last_mean_tick(), 10);
        assert!(oracle.drain_events().is_empty());
    }

    #[test]
    fn test_observe_now_matches_latest() {
        let mut oracle = oracle();
        oracle
            .write(WRITER, &[obs(100, 10), obs(110, -20)])
            .expect("write");
        let (ticks, spl) = oracle.observe(110, &[0]).expect("observe");
        let latest = oracle.latest_observation().expect("latest");
        assert_eq!(ticks, vec![latest.tick_cumulative]);
        assert_eq!(spl, vec![latest.seconds_per_liquidity_cumulative_x128]);
    }

    #[test]
    fn test_observe_extrapolates_with_last_mean() {
        let mut oracle = oracle();
        oracle
            .write(WRITER, &[obs(100, 10), obs(110, -20)])
            .expect("write");
        let (ticks, _) = oracle.observe(130, &[0, 10]).expect("observe");
        assert_eq!(ticks, vec![100 - 400, 100 - 200]);
    }

    #[test]
    fn test_observe_interpolates() {
        let mut oracle = oracle();
        oracle.increase_observation_cardinality_next(4).expect("grow");
        oracle
            .write(WRITER, &[obs(100, 10), obs(110, 30), obs(120, 0)])
            .expect("write");
        let (ticks, _) = oracle.observe(120, &[15, 5]).expect("observe");
        assert_eq!(ticks, vec![50, 250]);
    }

    #[test]
    fn test_observe_errors() {
        let mut oracle = oracle();
        assert!(matches!(
            oracle.observe(100, &[0]),
            Err(OracleError::NotInitialized)
        ));
        oracle.write(WRITER, &[obs(100, 10)]).expect("write");
        assert!(matches!(
            oracle.observe(110, &[20]),
            Err(OracleError::ObservationTooOld {
                target: 90,
                oldest: 100
            })
        ));
        assert!(matches!(
            oracle.observe(10, &[20]),
            Err(OracleError::Arithmetic(_))
        ));
    }

    #[test]
    fn test_ring_overwrites_without_growth() {
        let mut oracle = oracle();
        oracle
            .write(WRITER, &[obs(100, 1), obs(110, 1), obs(120, 1)])
            .expect("write");
        assert_eq!(oracle.slot0().observation_cardinality, 1);
        assert!(matches!(
            oracle.observe(120, &[10]),
            Err(OracleError::ObservationTooOld { .. })
        ));
    }

    #[test]
    fn test_growth_applies_on_wrap() {
        let mut oracle = oracle();
        oracle.write(WRITER, &[obs(100, 1)]).expect("init");
        oracle.increase_observation_cardinality_next(3).expect("grow");
        assert_eq!(oracle.slot0().observation_cardinality, 1);

        oracle
            .write(WRITER, &[obs(110, 1), obs(120, 1), obs(130, 1)])
            .expect("write");
        let slot0 = oracle.slot0();
        assert_eq!(slot0.observation_cardinality, 3);
        assert_eq!(slot0.observation_index, 0);
        assert_eq!(oracle.observation(0).expect("slot 0").block_timestamp, 130);

        let (ticks, _) = oracle.observe(130, &[20]).expect("oldest");
        assert_eq!(ticks, vec![10]);
    }

    #[test]
    fn test_cardinality_growth_only_upward() {
        let mut oracle = oracle();
        oracle.increase_observation_cardinality_next(5).expect("grow");
        oracle.increase_observation_cardinality_next(2).expect("ignored");
        assert_eq!(oracle.slot0().observation_cardinality_next, 5);
        assert_eq!(oracle.drain_events().len(), 1);

        oracle.write(WRITER, &[obs(100, 1)]).expect("init");
        assert_eq!(oracle.slot0().observation_cardinality_next, 5);
    }
}
