use ic_cdk::{init, post_upgrade, pre_upgrade, query, update};
use ic_stable_structures::memory_manager::{MemoryManager, VirtualMemory};
use ic_stable_structures::DefaultMemoryImpl;
use std::cell::RefCell;

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

pub mod balance_tracker;
pub mod config;
pub mod guard;
pub mod memory_ids;
pub mod types;
pub mod yield_streamer;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use balance_tracker::BalanceRecord;
pub use types::{Config, InitArgs, StreamerError, TrackerError};
pub use yield_streamer::{ClaimPreview, ClaimState, ScheduleRecord};

// =============================================================================
// MEMORY MANAGEMENT
// =============================================================================

pub type Memory = VirtualMemory<DefaultMemoryImpl>;

thread_local! {
    pub static MEMORY_MANAGER: RefCell<MemoryManager<DefaultMemoryImpl>> =
        RefCell::new(MemoryManager::init(DefaultMemoryImpl::default()));
}

// =============================================================================
// LIFECYCLE HOOKS
// =============================================================================

#[init]
fn init(args: InitArgs) {
    let fee_rate = args.fee_rate.unwrap_or(0);
    if fee_rate as u128 > yield_streamer::engine::RATE_FACTOR {
        ic_cdk::trap("fee_rate above RATE_FACTOR (100%)");
    }

    config::set(Config {
        owner: ic_cdk::caller(),
        token_ledger: args.token_ledger,
        fee_receiver: args.fee_receiver,
        fee_rate,
        genesis_day: balance_tracker::clock::unix_day(ic_cdk::api::time()),
    });

    yield_streamer::start_fee_collection_timer();
    yield_streamer::start_claim_retry_timer();
    ic_cdk::println!("Yield streamer initialized; day 0 starts now");
}

#[pre_upgrade]
fn pre_upgrade() {
    // Note: stable structures persist automatically, no special handling needed
}

#[post_upgrade]
fn post_upgrade() {
    // Timers do not survive upgrades; genesis day and all logs do.
    yield_streamer::start_fee_collection_timer();
    yield_streamer::start_claim_retry_timer();
}

// =============================================================================
// BALANCE TRACKER ENDPOINTS
// =============================================================================

/// Balance-change hook, invoked by the token ledger after every mint, burn or
/// transfer affecting `account`.
#[update]
fn notify_balance_change(account: candid::Principal, new_balance: u64) -> Result<(), TrackerError> {
    balance_tracker::notify_balance_change(ic_cdk::caller(), account, new_balance)
}

#[query]
fn get_balance_on_day(account: candid::Principal, day: u64) -> u64 {
    balance_tracker::get_balance_on_day(account, day)
}

#[query]
fn get_daily_balances(
    account: candid::Principal,
    from_day: u64,
    to_day: u64,
) -> Result<Vec<u64>, TrackerError> {
    balance_tracker::get_daily_balances(account, from_day, to_day)
}

#[query]
fn current_day_and_time() -> (u64, u64) {
    balance_tracker::clock::current_day_and_time()
}

#[query]
fn get_balance_log(account: candid::Principal) -> Vec<BalanceRecord> {
    balance_tracker::store::get_log(account)
}

// =============================================================================
// YIELD STREAMER ENDPOINTS
// =============================================================================

#[query]
fn claim_all_preview(account: candid::Principal) -> Result<ClaimPreview, StreamerError> {
    yield_streamer::preview_claim(account, None)
}

#[query]
fn claim_preview(account: candid::Principal, amount: u64) -> Result<ClaimPreview, StreamerError> {
    yield_streamer::preview_claim(account, Some(amount))
}

#[update]
async fn claim_all() -> Result<ClaimPreview, StreamerError> {
    yield_streamer::claim(None).await
}

#[update]
async fn claim(amount: u64) -> Result<ClaimPreview, StreamerError> {
    yield_streamer::claim(Some(amount)).await
}

#[update]
async fn retry_claim() -> Result<u64, StreamerError> {
    yield_streamer::retry_claim().await
}

#[update]
fn abandon_claim() -> Result<u64, StreamerError> {
    yield_streamer::abandon_claim()
}

#[query]
fn get_claim_state(account: candid::Principal) -> ClaimState {
    yield_streamer::get_claim_state(account)
}

#[query]
fn get_my_claim_status() -> Option<types::PendingClaim> {
    yield_streamer::get_claim_status(ic_cdk::caller())
}

#[query]
fn get_yield_rates() -> Vec<ScheduleRecord> {
    yield_streamer::get_yield_rates()
}

#[query]
fn get_look_back_periods() -> Vec<ScheduleRecord> {
    yield_streamer::get_look_back_periods()
}

#[query]
fn get_accumulated_fees() -> u64 {
    yield_streamer::get_accumulated_fees()
}

#[query]
fn get_streamer_stats() -> yield_streamer::StreamerStats {
    yield_streamer::get_streamer_stats()
}

#[query]
fn get_audit_log(offset: u64, limit: u64) -> Vec<types::AuditEntry> {
    yield_streamer::get_audit_log(offset as usize, limit as usize)
}

// =============================================================================
// ADMINISTRATIVE ENDPOINTS
// =============================================================================

#[update]
fn add_yield_rate(effective_day: u64, rate: u64) -> Result<(), StreamerError> {
    config::ensure_owner(ic_cdk::caller())?;
    yield_streamer::add_yield_rate(effective_day, rate)?;
    yield_streamer::claims::log_audit(types::AuditEvent::YieldRateConfigured {
        effective_day,
        rate,
    });
    Ok(())
}

#[update]
fn add_look_back_period(effective_day: u64, period: u64) -> Result<(), StreamerError> {
    config::ensure_owner(ic_cdk::caller())?;
    yield_streamer::add_look_back_period(effective_day, period)?;
    yield_streamer::claims::log_audit(types::AuditEvent::LookBackPeriodConfigured {
        effective_day,
        period,
    });
    Ok(())
}

#[update]
fn set_fee_rate(rate: u64) -> Result<(), StreamerError> {
    config::ensure_owner(ic_cdk::caller())?;
    if rate as u128 > yield_streamer::engine::RATE_FACTOR {
        return Err(StreamerError::InvalidFeeRate {
            max: yield_streamer::engine::RATE_FACTOR as u64,
        });
    }
    config::update(|c| c.fee_rate = rate);
    Ok(())
}

#[update]
fn set_fee_receiver(receiver: candid::Principal) -> Result<(), StreamerError> {
    config::ensure_owner(ic_cdk::caller())?;
    config::update(|c| c.fee_receiver = receiver);
    Ok(())
}

#[update]
fn set_token_ledger(ledger: candid::Principal) -> Result<(), StreamerError> {
    config::ensure_owner(ic_cdk::caller())?;
    config::update(|c| c.token_ledger = ledger);
    Ok(())
}

#[update]
fn transfer_ownership(new_owner: candid::Principal) -> Result<(), StreamerError> {
    config::ensure_owner(ic_cdk::caller())?;
    config::update(|c| c.owner = new_owner);
    Ok(())
}

/// Ops/test tooling: wipe an account's balance log, claim cursor and any
/// parked claim.
#[update]
fn reset_account(account: candid::Principal) -> Result<(), StreamerError> {
    config::ensure_owner(ic_cdk::caller())?;
    balance_tracker::store::delete_log(account);
    yield_streamer::claims::delete_claim_state(account);
    yield_streamer::claims::log_audit(types::AuditEvent::AccountReset { account });
    Ok(())
}

/// Ops/test tooling: replace an account's balance log wholesale (e.g. to
/// seed a synthetic pre-tracking history).
#[update]
fn overwrite_balance_log(
    account: candid::Principal,
    records: Vec<BalanceRecord>,
) -> Result<(), TrackerError> {
    if config::ensure_owner(ic_cdk::caller()).is_err() {
        return Err(TrackerError::NotAuthorized);
    }
    let record_count = records.len() as u64;
    balance_tracker::store::overwrite_log(account, records)?;
    yield_streamer::claims::log_audit(types::AuditEvent::BalanceLogOverwritten {
        account,
        records: record_count,
    });
    Ok(())
}

#[update]
async fn collect_fees() -> Result<u64, StreamerError> {
    config::ensure_owner(ic_cdk::caller())?;
    yield_streamer::collect_fees().await
}

/// Emergency safety valve for a guard stuck by a trap mid-operation.
#[update]
fn admin_clear_guard(principal: candid::Principal) -> Result<bool, StreamerError> {
    config::ensure_owner(ic_cdk::caller())?;
    Ok(guard::clear_guard_for_principal(principal))
}

#[query]
fn get_config() -> Config {
    config::get()
}
