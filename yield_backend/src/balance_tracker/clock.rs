use crate::config;

/// Nanoseconds per day (24 * 60 * 60 * 1e9)
pub const NANOS_PER_DAY: u64 = 86_400_000_000_000;
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Whole unix days elapsed at a raw nanosecond timestamp.
pub fn unix_day(nanos: u64) -> u64 {
    nanos / NANOS_PER_DAY
}

/// Split a raw nanosecond timestamp into (tracker day index, seconds into day).
///
/// Day 0 is the genesis (activation) day, not the unix epoch. Timestamps
/// before genesis clamp to day 0 rather than going negative; the IC clock is
/// monotonic so this only matters for synthetic test inputs.
pub fn split_day_and_time(nanos: u64, genesis_day: u64) -> (u64, u64) {
    let day = unix_day(nanos).saturating_sub(genesis_day);
    let seconds_into_day = (nanos % NANOS_PER_DAY) / NANOS_PER_SECOND;
    (day, seconds_into_day)
}

/// Current (day index, seconds into day) from the IC clock.
pub fn current_day_and_time() -> (u64, u64) {
    split_day_and_time(ic_cdk::api::time(), config::genesis_day())
}
