//! Yield accrual engine: consumes the balance history store plus the global
//! rate and look-back timelines, and computes/claims compounded daily yield
//! with sub-day streaming and an idempotent per-account claim cursor.

pub mod claims;
pub mod engine;
pub mod query;
pub mod schedule;
pub mod state;

#[cfg(test)]
mod tests;

pub use claims::{
    abandon_claim, claim, collect_fees, get_accumulated_fees, get_audit_log, get_claim_state,
    get_claim_status, preview_claim, retry_claim, start_claim_retry_timer,
    start_fee_collection_timer,
};
pub use query::{get_streamer_stats, StreamerStats};
pub use schedule::{add_look_back_period, add_yield_rate, get_look_back_periods, get_yield_rates};
pub use state::{ClaimPreview, ClaimState, ScheduleRecord};
