//! Stored observations and ring-buffer math.
//!
//! The buffer holds `cardinality` live slots out of `cardinality_next`
//! allocated ones. `index` points at the newest entry; the oldest is the slot
//! after it, or slot 0 while the buffer has not yet wrapped.

use ethnum::U256;

use crate::{OracleError, Result};

/// Mask keeping the low 160 bits of a liquidity accumulator.
pub const SECONDS_PER_LIQUIDITY_MASK: U256 = U256::from_words(u32::MAX as u128, u128::MAX);

/// One stored oracle entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Observation {
    pub block_timestamp: u32,
    /// Sum of `tick × seconds` since initialization, wrapping on overflow.
    pub tick_cumulative: i64,
    /// Sum of `seconds << 128`, truncated to 160 bits.
    pub seconds_per_liquidity_cumulative_x128: U256,
    pub initialized: bool,
}

impl Observation {
    /// First entry of a freshly initialized buffer.
    pub fn first(block_timestamp: u32) -> Self {
        Self {
            block_timestamp,
            tick_cumulative: 0,
            seconds_per_liquidity_cumulative_x128: U256::ZERO,
            initialized: true,
        }
    }

    /// The entry that follows `self` at `block_timestamp` when `tick` held
    /// over the whole gap.
    ///
    /// `block_timestamp` must not precede `self.block_timestamp`.
    pub fn transform(&self, block_timestamp: u32, tick: i32) -> Self {
        let delta = block_timestamp.saturating_sub(self.block_timestamp);
        Self {
            block_timestamp,
            tick_cumulative: self
                .tick_cumulative
                .wrapping_add(i64::from(tick).wrapping_mul(i64::from(delta))),
            seconds_per_liquidity_cumulative_x128: self
                .seconds_per_liquidity_cumulative_x128
                .wrapping_add(U256::from(delta) << 128)
                & SECONDS_PER_LIQUIDITY_MASK,
            initialized: true,
        }
    }

    /// Linear interpolation between `self` and a later entry `after` at
    /// `target`, which lies strictly between the two.
    pub fn interpolate(&self, after: &Self, target: u32) -> Result<Self> {
        let span = after
            .block_timestamp
            .checked_sub(self.block_timestamp)
            .filter(|span| *span > 0)
            .ok_or(OracleError::Arithmetic("interpolation span"))?;
        let elapsed = target
            .checked_sub(self.block_timestamp)
            .ok_or(OracleError::Arithmetic("interpolation target"))?;

        let tick_delta = i128::from(after.tick_cumulative.wrapping_sub(self.tick_cumulative));
        let tick_step = tick_delta * i128::from(elapsed) / i128::from(span);
        let tick_step =
            i64::try_from(tick_step).map_err(|_| OracleError::Arithmetic("tick interpolation"))?;

        let spl_delta = after
            .seconds_per_liquidity_cumulative_x128
            .wrapping_sub(self.seconds_per_liquidity_cumulative_x128)
            & SECONDS_PER_LIQUIDITY_MASK;
        let spl_step = spl_delta * U256::from(elapsed) / U256::from(span);

        Ok(Self {
            block_timestamp: target,
            tick_cumulative: self.tick_cumulative.wrapping_add(tick_step),
            seconds_per_liquidity_cumulative_x128: self
                .seconds_per_liquidity_cumulative_x128
                .wrapping_add(spl_step)
                & SECONDS_PER_LIQUIDITY_MASK,
            initialized: true,
        })
    }
}

/// Ring-buffer cursor of a sidechain oracle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Slot0 {
    /// Slot of the newest entry.
    pub observation_index: u16,
    /// Live slots.
    pub observation_cardinality: u16,
    /// Allocated slots; live slots grow to this on the next wrap.
    pub observation_cardinality_next: u16,
}

impl Slot0 {
    /// Slot the next write lands in, and the cardinality after that write.
    pub fn advance(&self) -> (u16, u16) {
        let cardinality = if self.observation_cardinality_next > self.observation_cardinality
            && self.observation_index == self.observation_cardinality.saturating_sub(1)
        {
            self.observation_cardinality_next
        } else {
            self.observation_cardinality
        };
        let index = (u32::from(self.observation_index) + 1) % u32::from(cardinality.max(1));
        (index as u16, cardinality)
    }
}

/// Oldest live entry of the buffer.
pub fn oldest(observations: &[Observation], slot0: &Slot0) -> Observation {
    let cardinality = usize::from(slot0.observation_cardinality.max(1));
    let candidate = observations[(usize::from(slot0.observation_index) + 1) % cardinality];
    if candidate.initialized {
        candidate
    } else {
        observations[0]
    }
}

/// Find the entries at or before and at or after `target`.
///
/// `target` must lie within `[oldest, newest]`.
pub fn binary_search(
    observations: &[Observation],
    slot0: &Slot0,
    target: u32,
) -> Result<(Observation, Observation)> {
    let cardinality = usize::from(slot0.observation_cardinality);
    if cardinality == 0 {
        return Err(OracleError::NotInitialized);
    }
    let mut left = (usize::from(slot0.observation_index) + 1) % cardinality;
    let mut right = left + cardinality - 1;

    while left <= right {
        let i = (left + right) / 2;
        let before = observations[i % cardinality];
        if !before.initialized {
            left = i + 1;
            continue;
        }
        let after = observations[(i + 1) % cardinality];
        let target_at_or_after = before.block_timestamp <= target;
        if target_at_or_after && target <= after.block_timestamp {
            return Ok((before, after));
        }
        if target_at_or_after {
            left = i + 1;
        } else {
            right = match i.checked_sub(1) {
                Some(r) => r,
                None => break,
            };
        }
    }
    Err(OracleError::Arithmetic("target outside stored range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ts: u32, tc: i64) -> Observation {
        Observation {
            block_timestamp: ts,
            tick_cumulative: tc,
            seconds_per_liquidity_cumulative_x128: U256::from(ts) << 128,
            initialized: true,
        }
    }

    #[test]
    fn test_mask_is_160_bits() {
        assert_eq!(SECONDS_PER_LIQUIDITY_MASK, (U256::ONE << 160) - U256::ONE);
    }

    #[test]
    fn test_transform_accumulates() {
        let next = Observation::first(100).transform(110, -7);
        assert_eq!(next.block_timestamp, 110);
        assert_eq!(next.tick_cumulative, -70);
        assert_eq!(
            next.seconds_per_liquidity_cumulative_x128,
            U256::from(10u32) << 128
        );
    }

    #[test]
    fn test_liquidity_accumulator_wraps_at_160_bits() {
        let near_limit = Observation {
            seconds_per_liquidity_cumulative_x128: SECONDS_PER_LIQUIDITY_MASK,
            ..Observation::first(0)
        };
        let next = near_limit.transform(1, 0);
        assert_eq!(
            next.seconds_per_liquidity_cumulative_x128,
            (U256::ONE << 128) - U256::ONE
        );
    }

    #[test]
    fn test_interpolate_midpoint() {
        let mid = entry(100, 1_000)
            .interpolate(&entry(110, 2_000), 104)
            .expect("interpolate");
        assert_eq!(mid.tick_cumulative, 1_400);
        assert_eq!(
            mid.seconds_per_liquidity_cumulative_x128,
            U256::from(104u32) << 128
        );
    }

    #[test]
    fn test_advance_grows_on_wrap() {
        let slot0 = Slot0 {
            observation_index: 0,
            observation_cardinality: 1,
            observation_cardinality_next: 3,
        };
        assert_eq!(slot0.advance(), (1, 3));

        let full = Slot0 {
            observation_index: 2,
            observation_cardinality: 3,
            observation_cardinality_next: 3,
        };
        assert_eq!(full.advance(), (0, 3));
    }

    #[test]
    fn test_binary_search_wrapped_buffer() {
        // Newest at index 1; oldest at index 2.
        let buffer = [entry(130, 30), entry(140, 40), entry(110, 10), entry(120, 20)];
        let slot0 = Slot0 {
            observation_index: 1,
            observation_cardinality: 4,
            observation_cardinality_next: 4,
        };
        assert_eq!(oldest(&buffer, &slot0).block_timestamp, 110);

        let (before, after) = binary_search(&buffer, &slot0, 125).expect("search");
        assert_eq!((before.block_timestamp, after.block_timestamp), (120, 130));

        let (before, _) = binary_search(&buffer, &slot0, 110).expect("search");
        assert_eq!(before.block_timestamp, 110);
    }

    #[test]
    fn test_oldest_before_wrap_is_slot_zero() {
        let buffer = [entry(100, 0), entry(110, 10), Observation::default()];
        let slot0 = Slot0 {
            observation_index: 1,
            observation_cardinality: 3,
            observation_cardinality_next: 3,
        };
        assert_eq!(oldest(&buffer, &slot0).block_timestamp, 100);
    }
}
