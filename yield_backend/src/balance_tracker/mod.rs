//! Balance history store: a per-account append-only log of daily balance
//! checkpoints, reconstructing "what was this balance on day D" for any day
//! since activation.

pub mod clock;
pub mod records;
pub mod store;

pub use records::{BalanceRecord, MAX_QUERY_RANGE_DAYS};
pub use store::{get_balance_on_day, get_daily_balances, notify_balance_change};
