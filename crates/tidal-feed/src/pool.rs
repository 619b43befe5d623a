//! Pool adapters.
//!
//! A pool adapter answers one question: what was the pool's tick cumulative
//! `seconds_ago` seconds before `now`, for each requested offset. The feed
//! queries the adapter exactly once per fetch.
//!
//! [`StubPool`] is the development implementation. It integrates a
//! piecewise-constant tick schedule from a genesis timestamp, so tests and
//! the daemon can drive price movements deterministically.

use std::sync::RwLock;

/// Error types for pool queries.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// A requested sample lies before the pool's earliest history.
    #[error("observation too old: requested {requested}, oldest available {oldest}")]
    TooOld {
        /// Timestamp the caller asked for.
        requested: u32,
        /// Earliest timestamp the pool can answer for.
        oldest: u32,
    },

    /// A requested offset reaches back past timestamp zero.
    #[error("seconds ago {seconds_ago} exceeds current time {now}")]
    BeforeEpoch {
        /// Offending offset.
        seconds_ago: u32,
        /// Query time.
        now: u32,
    },

    /// The cumulative overflowed its representation.
    #[error("tick cumulative overflow")]
    Overflow,
}

/// Source of tick cumulatives for a single pool.
pub trait PoolAdapter: Send + Sync {
    /// Tick cumulative at `now - seconds_agos[i]` for every `i`.
    fn observe(&self, now: u32, seconds_agos: &[u32]) -> Result<Vec<i64>, PoolError>;
}

/// A pool whose tick follows a schedule of constant segments.
///
/// The first segment starts at the oldest answerable timestamp. Each later
/// segment takes over at its own start timestamp and holds until the next
/// one. History before the oldest timestamp is folded into a base
/// cumulative by [`StubPool::prune_before`].
#[derive(Debug)]
pub struct StubPool {
    schedule: RwLock<Schedule>,
}

#[derive(Debug)]
struct Schedule {
    oldest: u32,
    /// Tick cumulative at `oldest`.
    base_cumulative: i64,
    /// `(start, tick)` sorted by start; the first starts at `oldest`.
    segments: Vec<(u32, i32)>,
}

impl Schedule {
    fn cumulative_at(&self, timestamp: u32) -> Result<i64, PoolError> {
        if timestamp < self.oldest {
            return Err(PoolError::TooOld {
                requested: timestamp,
                oldest: self.oldest,
            });
        }
        let mut cumulative = self.base_cumulative;
        for (i, (start, tick)) in self.segments.iter().enumerate() {
            if *start >= timestamp {
                break;
            }
            let end = self
                .segments
                .get(i + 1)
                .map_or(timestamp, |(next, _)| (*next).min(timestamp));
            let contribution = i64::from(*tick)
                .checked_mul(i64::from(end - start))
                .ok_or(PoolError::Overflow)?;
            cumulative = cumulative
                .checked_add(contribution)
                .ok_or(PoolError::Overflow)?;
        }
        Ok(cumulative)
    }
}

impl StubPool {
    /// Create a pool that has traded at `initial_tick` since `genesis`.
    pub fn new(genesis: u32, initial_tick: i32) -> Self {
        Self {
            schedule: RwLock::new(Schedule {
                oldest: genesis,
                base_cumulative: 0,
                segments: vec![(genesis, initial_tick)],
            }),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Schedule> {
        self.schedule.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Schedule> {
        self.schedule.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Earliest timestamp the pool can answer for.
    pub fn oldest(&self) -> u32 {
        self.read().oldest
    }

    /// Number of tick segments currently held.
    pub fn segment_count(&self) -> usize {
        self.read().segments.len()
    }

    /// Make the pool trade at `tick` from `from` onward (development/testing only).
    ///
    /// A segment starting at the same timestamp is replaced. Starts before
    /// the oldest answerable timestamp are clamped to it.
    pub fn set_tick(&self, from: u32, tick: i32) {
        let mut schedule = self.write();
        let from = from.max(schedule.oldest);
        schedule.segments.retain(|(start, _)| *start != from);
        schedule.segments.push((from, tick));
        schedule.segments.sort_by_key(|(start, _)| *start);
        tracing::debug!(from, tick, "stub pool: tick schedule changed (dev only)");
    }

    /// Forget history before `horizon`, keeping cumulatives from `horizon`
    /// on unchanged. Returns the number of segments dropped.
    ///
    /// # Errors
    ///
    /// [`PoolError::Overflow`] if the folded cumulative overflows; the
    /// schedule is left untouched.
    pub fn prune_before(&self, horizon: u32) -> Result<usize, PoolError> {
        let mut schedule = self.write();
        if horizon <= schedule.oldest {
            return Ok(0);
        }
        let base_cumulative = schedule.cumulative_at(horizon)?;
        let in_force = schedule
            .segments
            .iter()
            .take_while(|(start, _)| *start <= horizon)
            .count();
        let dropped = in_force.saturating_sub(1);
        schedule.segments.drain(..dropped);
        if let Some(first) = schedule.segments.first_mut() {
            first.0 = horizon;
        }
        schedule.oldest = horizon;
        schedule.base_cumulative = base_cumulative;
        Ok(dropped)
    }

    /// Tick in force at `timestamp`.
    pub fn tick_at(&self, timestamp: u32) -> i32 {
        let schedule = self.read();
        schedule
            .segments
            .iter()
            .take_while(|(start, _)| *start <= timestamp)
            .last()
            .or_else(|| schedule.segments.first())
            .map(|(_, tick)| *tick)
            .unwrap_or_default()
    }

    /// Tick cumulative at `timestamp`, integrated from genesis.
    pub fn cumulative_at(&self, timestamp: u32) -> Result<i64, PoolError> {
        self.read().cumulative_at(timestamp)
    }
}

impl PoolAdapter for StubPool {
    fn observe(&self, now: u32, seconds_agos: &[u32]) -> Result<Vec<i64>, PoolError> {
        seconds_agos
            .iter()
            .map(|&seconds_ago| {
                let target = now
                    .checked_sub(seconds_ago)
                    .ok_or(PoolError::BeforeEpoch { seconds_ago, now })?;
                self.cumulative_at(target)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_tick_cumulative() {
        let pool = StubPool::new(1_000, 100);
        let cumulatives = pool.observe(1_060, &[30, 10, 0]).expect("observe");
        assert_eq!(cumulatives, vec![3000, 5000, 6000]);
    }

    #[test]
    fn test_segments_integrate() {
        let pool = StubPool::new(0, 10);
        pool.set_tick(100, -20);
        assert_eq!(pool.cumulative_at(100).expect("at 100"), 1000);
        assert_eq!(pool.cumulative_at(150).expect("at 150"), 0);
        assert_eq!(pool.tick_at(99), 10);
        assert_eq!(pool.tick_at(100), -20);
    }

    #[test]
    fn test_set_tick_replaces_segment() {
        let pool = StubPool::new(0, 10);
        pool.set_tick(50, 20);
        pool.set_tick(50, 30);
        assert_eq!(pool.cumulative_at(60).expect("at 60"), 500 + 300);
    }

    #[test]
    fn test_prune_keeps_later_cumulatives() {
        let pool = StubPool::new(0, 10);
        for step in 1..=50u32 {
            pool.set_tick(step * 10, 10 + step as i32);
        }
        let before: Vec<i64> = (300..=600)
            .map(|t| pool.cumulative_at(t).expect("before prune"))
            .collect();

        let dropped = pool.prune_before(305).expect("prune");
        assert_eq!(dropped, 30);
        assert_eq!(pool.segment_count(), 21);
        assert_eq!(pool.oldest(), 305);
        assert_eq!(pool.tick_at(305), 40);

        let after: Vec<i64> = (305..=600)
            .map(|t| pool.cumulative_at(t).expect("after prune"))
            .collect();
        assert_eq!(after, before[5..].to_vec());
        assert!(matches!(
            pool.cumulative_at(300),
            Err(PoolError::TooOld {
                requested: 300,
                oldest: 305
            })
        ));
    }

    #[test]
    fn test_prune_at_or_before_oldest_is_noop() {
        let pool = StubPool::new(100, 5);
        pool.set_tick(150, 6);
        assert_eq!(pool.prune_before(100).expect("prune"), 0);
        assert_eq!(pool.prune_before(50).expect("prune"), 0);
        assert_eq!(pool.cumulative_at(200).expect("at 200"), 50 * 5 + 50 * 6);
    }

    #[test]
    fn test_set_tick_clamped_to_oldest() {
        let pool = StubPool::new(0, 1);
        pool.set_tick(100, 2);
        pool.prune_before(50).expect("prune");
        pool.set_tick(10, 3);
        assert_eq!(pool.tick_at(50), 3);
        assert_eq!(pool.segment_count(), 2);
    }

    #[test]
    fn test_query_before_genesis() {
        let pool = StubPool::new(1_000, 1);
        let err = pool.observe(1_010, &[20, 0]).expect_err("too old");
        assert!(matches!(
            err,
            PoolError::TooOld {
                requested: 990,
                oldest: 1_000
            }
        ));
    }

    #[test]
    fn test_offset_past_epoch() {
        let pool = StubPool::new(0, 1);
        let err = pool.observe(5, &[10]).expect_err("before epoch");
        assert!(matches!(err, PoolError::BeforeEpoch { .. }));
    }
}
