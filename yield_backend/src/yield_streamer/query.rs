use super::{claims, schedule};
use candid::{CandidType, Deserialize};

/// Operational overview of the streamer, for dashboards and diagnostics.
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct StreamerStats {
    pub fee_rate: u64,
    pub accumulated_fees: u64,
    pub yield_rate_entries: u64,
    pub look_back_entries: u64,
    pub current_day: u64,
    pub seconds_into_day: u64,
}

pub fn get_streamer_stats() -> StreamerStats {
    let (current_day, seconds_into_day) = crate::balance_tracker::clock::current_day_and_time();
    StreamerStats {
        fee_rate: crate::config::fee_rate(),
        accumulated_fees: claims::get_accumulated_fees(),
        yield_rate_entries: schedule::get_yield_rates().len() as u64,
        look_back_entries: schedule::get_look_back_periods().len() as u64,
        current_day,
        seconds_into_day,
    }
}
