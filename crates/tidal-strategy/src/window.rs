//! Sample-offset window builder.
//!
//! Given the time elapsed since the last observation `e = now - from` and a
//! period `p`, the window is
//!
//! ```text
//! e <  p : [0]
//! e >= p : [e - r, e - r - p, ..., p, 0]     r = e mod p, or p when e mod p == 0
//! ```
//!
//! which has exactly `ceil(e / p)` offsets. The first interval (from the last
//! observation to the first sample) absorbs the remainder; every later one is
//! exactly one period long.

/// Build the strictly decreasing offsets ending at `0`.
///
/// A `from` in the future is treated as no elapsed time.
pub fn calculate_seconds_agos(period_length: u32, from_timestamp: u32, now: u32) -> Vec<u32> {
    let elapsed = now.saturating_sub(from_timestamp);
    if period_length == 0 || elapsed < period_length {
        return vec![0];
    }

    let remainder = elapsed % period_length;
    let first = if remainder == 0 {
        elapsed - period_length
    } else {
        elapsed - remainder
    };

    let mut offsets = Vec::with_capacity((first / period_length) as usize + 1);
    let mut offset = first;
    loop {
        offsets.push(offset);
        if offset == 0 {
            break;
        }
        offset -= period_length;
    }
    offsets
}
