//! Stable storage and entry points for the balance history store.

use super::clock;
use super::records::{self, BalanceLog, BalanceRecord};
use crate::memory_ids::BALANCE_LOGS_MEMORY_ID;
use crate::types::TrackerError;
use crate::{config, Memory, MEMORY_MANAGER};
use candid::Principal;
use ic_stable_structures::memory_manager::MemoryId;
use ic_stable_structures::StableBTreeMap;
use std::cell::RefCell;

thread_local! {
    static BALANCE_LOGS: RefCell<StableBTreeMap<Principal, BalanceLog, Memory>> = RefCell::new(
        StableBTreeMap::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(BALANCE_LOGS_MEMORY_ID))),
        )
    );
}

/// Balance-change notification from the token ledger. Only the configured
/// ledger principal may call this; it is the sole writer of checkpoint logs.
pub fn notify_balance_change(
    caller: Principal,
    account: Principal,
    new_balance: u64,
) -> Result<(), TrackerError> {
    if caller != config::token_ledger() {
        return Err(TrackerError::NotAuthorized);
    }

    let (day, _) = clock::current_day_and_time();
    let day = u16::try_from(day).map_err(|_| TrackerError::DayOverflow { day })?;

    BALANCE_LOGS.with(|logs| {
        let mut log = logs.borrow().get(&account).unwrap_or_default();
        records::apply_change(&mut log.0, day, new_balance)?;
        logs.borrow_mut().insert(account, log);
        Ok(())
    })
}

pub fn get_balance_on_day(account: Principal, day: u64) -> u64 {
    BALANCE_LOGS.with(|logs| {
        logs.borrow()
            .get(&account)
            .map(|log| records::balance_on_day(&log.0, day))
            .unwrap_or(0)
    })
}

pub fn get_daily_balances(
    account: Principal,
    from_day: u64,
    to_day: u64,
) -> Result<Vec<u64>, TrackerError> {
    BALANCE_LOGS.with(|logs| {
        let log = logs.borrow().get(&account).unwrap_or_default();
        records::daily_balances(&log.0, from_day, to_day)
    })
}

/// Full checkpoint log for an account. Used by the accrual engine and the
/// diagnostic queries.
pub fn get_log(account: Principal) -> Vec<BalanceRecord> {
    BALANCE_LOGS.with(|logs| logs.borrow().get(&account).map(|log| log.0).unwrap_or_default())
}

/// Ops/test tooling: drop an account's entire checkpoint log.
pub fn delete_log(account: Principal) {
    BALANCE_LOGS.with(|logs| {
        logs.borrow_mut().remove(&account);
    });
}

/// Ops/test tooling: replace an account's checkpoint log wholesale.
/// The replacement must be strictly increasing in day.
pub fn overwrite_log(account: Principal, log: Vec<BalanceRecord>) -> Result<(), TrackerError> {
    records::validate_chronological(&log)?;
    BALANCE_LOGS.with(|logs| {
        logs.borrow_mut().insert(account, BalanceLog(log));
    });
    Ok(())
}
