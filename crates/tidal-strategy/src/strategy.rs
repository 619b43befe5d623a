//! The data feed strategy.
//!
//! ## TWAP trigger
//!
//! ```text
//! [c_twap, c_now] = pool.observe(now, [twap_length, 0])
//! pool_tick       = floor((c_now - c_twap) / twap_length)
//! oracle_cum      = last.tick_cumulative + last.mean_tick * (now - last.timestamp)
//! oracle_tick     = floor((oracle_cum - c_twap) / twap_length)
//! fires iff oracle_tick - pool_tick > upper  or  < lower
//! ```
//!
//! `oracle_cum` is what a destination oracle extrapolates from the last
//! bridged mean tick; the trigger fires once that extrapolation drifts too far
//! from the live pool.

use tidal_feed::math::floor_div;
use tidal_feed::{DataFeed, FeedError};
use tidal_types::{short_hex, Address, Event, EventLog, ObservationData, PoolSalt, TriggerReason};

use crate::params::StrategyParams;
use crate::window::calculate_seconds_agos;
use crate::{Result, StrategyError};

/// Source-side trigger engine. Its address is the feed's strategy role.
#[derive(Debug)]
pub struct DataFeedStrategy {
    address: Address,
    governor: Address,
    params: StrategyParams,
    events: EventLog,
}

impl DataFeedStrategy {
    /// Create a strategy with validated parameters.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::WrongSetting`] if `params` are inconsistent.
    pub fn new(address: Address, governor: Address, params: StrategyParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            address,
            governor,
            params,
            events: EventLog::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn governor(&self) -> Address {
        self.governor
    }

    pub fn params(&self) -> StrategyParams {
        self.params
    }

    /// Which trigger, if any, currently holds for the pool.
    ///
    /// The time trigger takes precedence; the pool is only queried when the
    /// cooldown has not yet elapsed.
    pub fn is_strategic(
        &self,
        feed: &DataFeed,
        pool_salt: PoolSalt,
        now: u32,
    ) -> Result<TriggerReason> {
        let reason = if self.time_triggered(feed, &pool_salt, now) {
            TriggerReason::Time
        } else if self.twap_triggered(feed, &pool_salt, now)? {
            TriggerReason::Twap
        } else {
            TriggerReason::None
        };
        tracing::debug!(pool_salt = %short_hex(&pool_salt), %reason, "strategic check");
        Ok(reason)
    }

    /// Whether `reason` holds for the pool right now.
    pub fn is_strategic_for(
        &self,
        feed: &DataFeed,
        pool_salt: PoolSalt,
        reason: TriggerReason,
        now: u32,
    ) -> Result<bool> {
        match reason {
            TriggerReason::None => Ok(false),
            TriggerReason::Time => Ok(self.time_triggered(feed, &pool_salt, now)),
            TriggerReason::Twap => self.twap_triggered(feed, &pool_salt, now),
        }
    }

    fn time_triggered(&self, feed: &DataFeed, pool_salt: &PoolSalt, now: u32) -> bool {
        let last = feed.last_pool_state_observed(pool_salt);
        now.saturating_sub(last.block_timestamp) >= self.params.cooldown
    }

    fn twap_triggered(&self, feed: &DataFeed, pool_salt: &PoolSalt, now: u32) -> Result<bool> {
        let pool = feed.pool(pool_salt).ok_or(FeedError::UnknownPool)?;
        let twap_length = self.params.twap_length;
        let cumulatives = pool.observe(now, &[twap_length, 0])?;
        let (start, end) = match cumulatives.as_slice() {
            [start, end] => (*start, *end),
            _ => return Err(StrategyError::Arithmetic("pool returned wrong sample count")),
        };

        let window = i64::from(twap_length);
        let pool_tick = end
            .checked_sub(start)
            .and_then(|delta| floor_div(delta, window))
            .ok_or(StrategyError::Arithmetic("pool tick"))?;

        let last = feed.last_pool_state_observed(pool_salt);
        let elapsed = i64::from(now.saturating_sub(last.block_timestamp));
        let oracle_tick = i64::from(last.arithmetic_mean_tick)
            .checked_mul(elapsed)
            .and_then(|growth| last.tick_cumulative.checked_add(growth))
            .and_then(|oracle_cumulative| oracle_cumulative.checked_sub(start))
            .and_then(|delta| floor_div(delta, window))
            .ok_or(StrategyError::Arithmetic("oracle tick"))?;

        let deviation = oracle_tick
            .checked_sub(pool_tick)
            .ok_or(StrategyError::Arithmetic("tick deviation"))?;
        Ok(deviation > i64::from(self.params.upper_twap_threshold)
            || deviation < i64::from(self.params.lower_twap_threshold))
    }

    /// Fetch the pool if `reason` holds.
    ///
    /// The window starts at the last observation, or `twap_length` seconds
    /// ago for a pool that was never observed.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::NotStrategic`] if `reason` does not hold; feed
    /// errors are wrapped.
    pub fn strategic_fetch_observations(
        &mut self,
        feed: &mut DataFeed,
        pool_salt: PoolSalt,
        reason: TriggerReason,
        now: u32,
    ) -> Result<Vec<ObservationData>> {
        if !self.is_strategic_for(feed, pool_salt, reason, now)? {
            return Err(StrategyError::NotStrategic);
        }

        let last = feed.last_pool_state_observed(&pool_salt);
        let from = if last.is_observed() {
            last.block_timestamp
        } else {
            now.saturating_sub(self.params.twap_length)
        };
        let seconds_agos = calculate_seconds_agos(self.params.period_length, from, now);
        let observations = feed.fetch_observations(self.address, pool_salt, &seconds_agos, now)?;

        tracing::info!(pool_salt = %short_hex(&pool_salt), %reason, "strategic fetch");
        self.events.emit(Event::StrategicFetch { pool_salt, reason });
        Ok(observations)
    }

    /// Fetch the pool from `from_timestamp` regardless of triggers.
    pub fn force_fetch_observations(
        &mut self,
        caller: Address,
        feed: &mut DataFeed,
        pool_salt: PoolSalt,
        from_timestamp: u32,
        now: u32,
    ) -> Result<Vec<ObservationData>> {
        self.only_governor(caller)?;
        let seconds_agos = calculate_seconds_agos(self.params.period_length, from_timestamp, now);
        let observations = feed.fetch_observations(self.address, pool_salt, &seconds_agos, now)?;
        tracing::warn!(pool_salt = %short_hex(&pool_salt), from_timestamp, "forced fetch");
        self.events.emit(Event::ForcedFetch { pool_salt, from_timestamp });
        Ok(observations)
    }

    // ---------------------------------------------------------------
    // Governance
    // ---------------------------------------------------------------

    fn only_governor(&self, caller: Address) -> Result<()> {
        if caller != self.governor {
            return Err(StrategyError::OnlyGovernor);
        }
        Ok(())
    }

    fn apply(&mut self, caller: Address, params: StrategyParams) -> Result<()> {
        self.only_governor(caller)?;
        params.validate()?;
        self.params = params;
        tracing::warn!(
            cooldown = params.cooldown,
            period_length = params.period_length,
            twap_length = params.twap_length,
            upper_twap_threshold = params.upper_twap_threshold,
            lower_twap_threshold = params.lower_twap_threshold,
            "strategy parameters changed"
        );
        self.events.emit(Event::StrategyParamsSet {
            cooldown: params.cooldown,
            period_length: params.period_length,
            twap_length: params.twap_length,
            upper_twap_threshold: params.upper_twap_threshold,
            lower_twap_threshold: params.lower_twap_threshold,
        });
        Ok(())
    }

    pub fn set_strategy_cooldown(&mut self, caller: Address, cooldown: u32) -> Result<()> {
        self.apply(caller, StrategyParams { cooldown, ..self.params })
    }

    pub fn set_period_length(&mut self, caller: Address, period_length: u32) -> Result<()> {
        self.apply(
            caller,
            StrategyParams {
                period_length,
                ..self.params
            },
        )
    }

    pub fn set_twap_length(&mut self, caller: Address, twap_length: u32) -> Result<()> {
        self.apply(
            caller,
            StrategyParams {
                twap_length,
                ..self.params
            },
        )
    }

    pub fn set_twap_thresholds(&mut self, caller: Address, upper: i32, lower: i32) -> Result<()> {
        self.apply(
            caller,
            StrategyParams {
                upper_twap_threshold: upper,
                lower_twap_threshold: lower,
                ..self.params
            },
        )
    }

    /// Take every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }
}
