//! Central registry of stable memory IDs.
//!
//! Every stable structure in this canister gets its MemoryId from here so that
//! two modules can never collide on the same virtual memory region.

/// Per-account balance checkpoint logs (balance_tracker/store.rs)
pub const BALANCE_LOGS_MEMORY_ID: u8 = 10;

/// Per-account claim cursors (yield_streamer/claims.rs)
pub const CLAIM_STATES_MEMORY_ID: u8 = 11;

/// Global yield-rate timeline (yield_streamer/schedule.rs)
pub const YIELD_RATES_MEMORY_ID: u8 = 12;

/// Global look-back-period timeline (yield_streamer/schedule.rs)
pub const LOOK_BACK_PERIODS_MEMORY_ID: u8 = 13;

/// Parked claims awaiting transfer retry (yield_streamer/claims.rs)
pub const PENDING_CLAIMS_MEMORY_ID: u8 = 14;

/// Append-only audit / event log (types.rs, claims.rs)
pub const AUDIT_LOG_MEMORY_ID: u8 = 15;

/// Canister configuration cell (types.rs)
pub const CONFIG_MEMORY_ID: u8 = 16;

/// Accumulated, not-yet-collected claim fees (yield_streamer/claims.rs)
pub const ACCUMULATED_FEES_MEMORY_ID: u8 = 17;
