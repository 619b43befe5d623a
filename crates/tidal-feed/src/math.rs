//! Tick arithmetic.
//!
//! Mean ticks are derived from two tick cumulatives as
//! `floor((cum_end - cum_start) / Δt)`. The quotient rounds toward negative
//! infinity, so `-2001 / 20` is `-101`, not `-100`.

use tidal_types::{MAX_TICK, MIN_TICK};

/// Integer division rounding toward negative infinity.
///
/// Returns `None` for a zero divisor or on overflow.
pub fn floor_div(numerator: i64, denominator: i64) -> Option<i64> {
    let quotient = numerator.checked_div(denominator)?;
    let remainder = numerator.checked_rem(denominator)?;
    if remainder != 0 && ((remainder < 0) != (denominator < 0)) {
        quotient.checked_sub(1)
    } else {
        Some(quotient)
    }
}

/// Mean tick over an interval of `delta_t` seconds that advanced the tick
/// cumulative by `delta_cumulative`.
///
/// Returns `None` when `delta_t` is zero or the result falls outside
/// `[MIN_TICK, MAX_TICK]`.
pub fn mean_tick(delta_cumulative: i64, delta_t: u32) -> Option<i32> {
    let tick = floor_div(delta_cumulative, i64::from(delta_t))?;
    let tick = i32::try_from(tick).ok()?;
    (MIN_TICK..=MAX_TICK).contains(&tick).then_some(tick)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_div_rounds_down() {
        assert_eq!(floor_div(-2001, 20), Some(-101));
        assert_eq!(floor_div(-2000, 20), Some(-100));
        assert_eq!(floor_div(2001, 20), Some(100));
        assert_eq!(floor_div(2001, -20), Some(-101));
        assert_eq!(floor_div(-2001, -20), Some(100));
    }

    #[test]
    fn test_floor_div_faults() {
        assert_eq!(floor_div(1, 0), None);
        assert_eq!(floor_div(i64::MIN, -1), None);
    }

    #[test]
    fn test_mean_tick() {
        assert_eq!(mean_tick(2000, 20), Some(100));
        assert_eq!(mean_tick(-2001, 20), Some(-101));
        assert_eq!(mean_tick(0, 0), None);
    }

    #[test]
    fn test_mean_tick_out_of_range() {
        let limit = i64::from(MAX_TICK);
        assert_eq!(mean_tick(limit * 10, 10), Some(MAX_TICK));
        assert_eq!(mean_tick((limit + 1) * 10, 10), None);
        assert_eq!(mean_tick(-(limit + 1) * 10, 10), None);
    }
}
