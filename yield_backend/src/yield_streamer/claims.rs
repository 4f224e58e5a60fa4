//! Claim execution: preview, payout transfer, rollback and retry.
//!
//! The IC gives no free transaction atomicity across an inter-canister
//! transfer, so a claim is an explicit unit of work: the claim cursor is
//! advanced and the fee accrued BEFORE the transfer (reentrancy protection),
//! and rolled back if the ledger definitively rejects it. An uncertain
//! rejection parks the claim as pending; the caller retries or abandons it,
//! re-using the original `created_at` as the ledger idempotency key so a
//! retry can never double-pay.

use super::engine::{self, AccrualTables};
use super::schedule;
use super::state::{ClaimPreview, ClaimState};
use crate::balance_tracker::{clock, store};
use crate::guard::OperationGuard;
use crate::memory_ids::{
    ACCUMULATED_FEES_MEMORY_ID, AUDIT_LOG_MEMORY_ID, CLAIM_STATES_MEMORY_ID,
    PENDING_CLAIMS_MEMORY_ID,
};
use crate::types::{AuditEntry, AuditEvent, PendingClaim, StreamerError};
use crate::{config, Memory, MEMORY_MANAGER};
use candid::Principal;
use ic_cdk::api::call::RejectionCode;
use ic_ledger_types::{
    AccountIdentifier, BlockIndex, Memo, Timestamp, Tokens, TransferArgs, DEFAULT_SUBACCOUNT,
};
use ic_stable_structures::memory_manager::MemoryId;
use ic_stable_structures::{StableBTreeMap, StableCell, StableVec};
use std::cell::RefCell;
use std::time::Duration;

// Constants
const LEDGER_TRANSFER_FEE: u64 = 10_000; // e8s
/// Net payouts below this cannot meaningfully cover the ledger fee.
const MIN_CLAIM_PAYOUT: u64 = 2 * LEDGER_TRANSFER_FEE;
const MIN_FEE_COLLECTION: u64 = 10_000_000; // 0.1 token
const MAX_RETRIES: u8 = 10;
const FEE_COLLECTION_INTERVAL: Duration = Duration::from_secs(86_400);
const CLAIM_RETRY_INTERVAL: Duration = Duration::from_secs(300);

thread_local! {
    static CLAIM_STATES: RefCell<StableBTreeMap<Principal, ClaimState, Memory>> = RefCell::new(
        StableBTreeMap::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(CLAIM_STATES_MEMORY_ID))),
        )
    );

    static PENDING_CLAIMS: RefCell<StableBTreeMap<Principal, PendingClaim, Memory>> = RefCell::new(
        StableBTreeMap::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(PENDING_CLAIMS_MEMORY_ID))),
        )
    );

    // Audit trail doubling as the claim event stream (unbounded - monitor size)
    static AUDIT_LOG: RefCell<StableVec<AuditEntry, Memory>> = RefCell::new(
        StableVec::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(AUDIT_LOG_MEMORY_ID)))
        ).expect("Failed to init audit log")
    );

    static ACCUMULATED_FEES: RefCell<StableCell<u64, Memory>> = RefCell::new(
        StableCell::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(ACCUMULATED_FEES_MEMORY_ID))),
            0,
        ).expect("Failed to init fee accumulator")
    );

    static FEE_TIMER_ID: RefCell<Option<ic_cdk_timers::TimerId>> = RefCell::new(None);

    static RETRY_TIMER_ID: RefCell<Option<ic_cdk_timers::TimerId>> = RefCell::new(None);
}

enum TransferOutcome {
    Success(BlockIndex),
    DefiniteError(String),
    UncertainError(RejectionCode, String),
}

// =============================================================================
// AUDIT / EVENTS
// =============================================================================

pub fn log_audit(event: AuditEvent) {
    AUDIT_LOG.with(|log| {
        let entry = AuditEntry {
            timestamp: ic_cdk::api::time(),
            event: event.clone(),
        };
        if log.borrow_mut().push(&entry).is_err() {
            ic_cdk::println!("AUDIT LOG FULL! Failed to log event: {:?}", event);
        }
    });
}

pub fn get_audit_log(offset: usize, limit: usize) -> Vec<AuditEntry> {
    AUDIT_LOG.with(|log| log.borrow().iter().skip(offset).take(limit).collect())
}

// =============================================================================
// PREVIEW
// =============================================================================

/// Compute the current claim breakdown for `account` without mutating state.
/// `requested = None` previews a claim-all.
pub fn preview_claim(
    account: Principal,
    requested: Option<u64>,
) -> Result<ClaimPreview, StreamerError> {
    let log = store::get_log(account);
    let rates = schedule::get_yield_rates();
    let look_backs = schedule::get_look_back_periods();
    let tables = AccrualTables {
        rates: &rates,
        look_backs: &look_backs,
    };
    let state = get_claim_state(account);
    let (today, seconds) = clock::current_day_and_time();

    engine::calculate_claim(
        &log,
        &tables,
        &state,
        today,
        seconds,
        config::fee_rate(),
        requested,
    )
}

// =============================================================================
// CLAIM
// =============================================================================

/// Claim accrued yield for the caller. `requested = None` claims everything.
///
/// Over-asking pays what has accrued and reports the deficit in
/// `shortfall`; it never fails. A zero-accrual claim is a no-op: nothing
/// moves, no event is emitted.
pub async fn claim(requested: Option<u64>) -> Result<ClaimPreview, StreamerError> {
    let caller = ic_cdk::caller();
    let _guard = OperationGuard::acquire(caller)?;

    if PENDING_CLAIMS.with(|p| p.borrow().contains_key(&caller)) {
        return Err(StreamerError::ClaimAlreadyPending);
    }

    let preview = preview_claim(caller, requested)?;
    let next_day = u16::try_from(preview.next_claim_day).map_err(|_| StreamerError::DayOverflow {
        day: preview.next_claim_day,
    })?;

    if preview.claimed == 0 {
        // Nothing to pay, but zero-yield days still settle: persist the
        // advanced cursor so later claims do not re-walk the empty range.
        set_claim_state(
            caller,
            ClaimState {
                day: next_day,
                debit: preview.next_claim_debit,
            },
        );
        return Ok(preview);
    }

    // fee_rate is capped at RATE_FACTOR, so fee <= claimed.
    let net_amount = preview.claimed - preview.fee;
    if net_amount < MIN_CLAIM_PAYOUT {
        return Err(StreamerError::AmountTooSmall {
            minimum: MIN_CLAIM_PAYOUT,
        });
    }

    let prev_state = get_claim_state(caller);

    // ATOMIC (single message): advance cursor + accrue fee + park the claim,
    // all before the await point.
    set_claim_state(
        caller,
        ClaimState {
            day: next_day,
            debit: preview.next_claim_debit,
        },
    );
    add_accumulated_fees(preview.fee);

    let created_at = ic_cdk::api::time();
    let pending = PendingClaim {
        prev_day: prev_state.day,
        prev_debit: prev_state.debit,
        gross_amount: preview.claimed,
        net_amount,
        fee: preview.fee,
        created_at,
        retries: 0,
        last_error: None,
    };
    PENDING_CLAIMS.with(|p| p.borrow_mut().insert(caller, pending));
    log_audit(AuditEvent::ClaimInitiated {
        account: caller,
        amount: preview.claimed,
        fee: preview.fee,
    });

    match attempt_transfer(caller, net_amount, Some(created_at)).await {
        TransferOutcome::Success(block) => {
            PENDING_CLAIMS.with(|p| p.borrow_mut().remove(&caller));
            log_audit(AuditEvent::YieldClaimed {
                account: caller,
                amount: preview.claimed,
                fee: preview.fee,
            });
            ic_cdk::println!(
                "Claim paid: {} received {} e8s (fee {}) at block {}",
                caller,
                net_amount,
                preview.fee,
                block
            );
            Ok(preview)
        }
        TransferOutcome::DefiniteError(message) => {
            rollback_claim(caller)?;
            log_audit(AuditEvent::ClaimFailed {
                account: caller,
                amount: preview.claimed,
            });
            Err(StreamerError::TransferFailed { message })
        }
        TransferOutcome::UncertainError(code, message) => {
            update_pending_error(caller, format!("{:?}: {}", code, message));
            Err(StreamerError::TransferInFlight {
                message: format!("{:?}: {}", code, message),
            })
        }
    }
}

/// Re-attempt the parked transfer of an uncertain claim. Exceeding the retry
/// budget rolls the claim back so the yield becomes claimable again.
pub async fn retry_claim() -> Result<u64, StreamerError> {
    retry_claim_for(ic_cdk::caller()).await
}

/// Retry path shared by the user endpoint and the background sweep.
async fn retry_claim_for(account: Principal) -> Result<u64, StreamerError> {
    let _guard = OperationGuard::acquire(account)?;

    let pending = PENDING_CLAIMS
        .with(|p| p.borrow().get(&account))
        .ok_or(StreamerError::NoPendingClaim)?;

    if pending.retries >= MAX_RETRIES {
        rollback_claim(account)?;
        log_audit(AuditEvent::ClaimAbandoned {
            account,
            amount: pending.gross_amount,
        });
        return Err(StreamerError::TransferFailed {
            message: "Retry limit reached; claim rolled back".to_string(),
        });
    }

    match attempt_transfer(account, pending.net_amount, Some(pending.created_at)).await {
        TransferOutcome::Success(_) => {
            PENDING_CLAIMS.with(|p| p.borrow_mut().remove(&account));
            log_audit(AuditEvent::YieldClaimed {
                account,
                amount: pending.gross_amount,
                fee: pending.fee,
            });
            Ok(pending.net_amount)
        }
        TransferOutcome::DefiniteError(message) => {
            rollback_claim(account)?;
            log_audit(AuditEvent::ClaimFailed {
                account,
                amount: pending.gross_amount,
            });
            Err(StreamerError::TransferFailed { message })
        }
        TransferOutcome::UncertainError(code, message) => {
            PENDING_CLAIMS.with(|p| {
                let mut map = p.borrow_mut();
                if let Some(mut claim) = map.get(&account) {
                    claim.retries += 1;
                    claim.last_error = Some(format!("{:?}: {}", code, message));
                    map.insert(account, claim);
                }
            });
            Err(StreamerError::TransferInFlight {
                message: format!("{:?}: {}", code, message),
            })
        }
    }
}

/// One background pass over the parked claims. Accounts with an active guard
/// are skipped and picked up on the next pass; claims past the retry budget
/// are rolled back by the shared retry path.
async fn retry_pending_claims() {
    let accounts: Vec<Principal> =
        PENDING_CLAIMS.with(|p| p.borrow().iter().map(|(account, _)| account).collect());

    for account in accounts {
        match retry_claim_for(account).await {
            Ok(amount) => {
                ic_cdk::println!("Background retry paid {} e8s to {}", amount, account);
            }
            Err(StreamerError::OperationInProgress) | Err(StreamerError::NoPendingClaim) => {}
            Err(e) => {
                ic_cdk::println!("Background retry for {} failed: {:?}", account, e);
            }
        }
    }
}

/// Give up on a parked claim and restore the pre-claim cursor, making the
/// yield claimable again. Returns the gross amount restored.
pub fn abandon_claim() -> Result<u64, StreamerError> {
    let caller = ic_cdk::caller();
    let _guard = OperationGuard::acquire(caller)?;

    let pending = PENDING_CLAIMS
        .with(|p| p.borrow().get(&caller))
        .ok_or(StreamerError::NoPendingClaim)?;

    rollback_claim(caller)?;
    log_audit(AuditEvent::ClaimAbandoned {
        account: caller,
        amount: pending.gross_amount,
    });
    Ok(pending.gross_amount)
}

fn rollback_claim(account: Principal) -> Result<(), StreamerError> {
    let pending = PENDING_CLAIMS
        .with(|p| p.borrow().get(&account))
        .ok_or(StreamerError::NoPendingClaim)?;

    set_claim_state(
        account,
        ClaimState {
            day: pending.prev_day,
            debit: pending.prev_debit,
        },
    );
    sub_accumulated_fees(pending.fee);
    PENDING_CLAIMS.with(|p| p.borrow_mut().remove(&account));
    Ok(())
}

fn update_pending_error(account: Principal, error: String) {
    PENDING_CLAIMS.with(|p| {
        let mut map = p.borrow_mut();
        if let Some(mut claim) = map.get(&account) {
            claim.last_error = Some(error);
            map.insert(account, claim);
        }
    });
}

// =============================================================================
// LEDGER TRANSFER
// =============================================================================

async fn attempt_transfer(to: Principal, amount: u64, created_at: Option<u64>) -> TransferOutcome {
    let args = TransferArgs {
        memo: Memo(0),
        amount: Tokens::from_e8s(amount - LEDGER_TRANSFER_FEE),
        fee: Tokens::from_e8s(LEDGER_TRANSFER_FEE),
        from_subaccount: None,
        to: AccountIdentifier::new(&to, &DEFAULT_SUBACCOUNT),
        created_at_time: created_at.map(|timestamp_nanos| Timestamp { timestamp_nanos }),
    };

    match ic_ledger_types::transfer(config::token_ledger(), args).await {
        Ok(Ok(block)) => TransferOutcome::Success(block),
        Ok(Err(e)) => TransferOutcome::DefiniteError(format!("{:?}", e)),
        Err((code, msg)) => match code {
            RejectionCode::SysTransient | RejectionCode::Unknown => {
                TransferOutcome::UncertainError(code, msg)
            }
            _ => TransferOutcome::DefiniteError(format!("{:?}: {}", code, msg)),
        },
    }
}

// =============================================================================
// CLAIM STATE ACCESS
// =============================================================================

pub fn get_claim_state(account: Principal) -> ClaimState {
    CLAIM_STATES.with(|states| states.borrow().get(&account).unwrap_or_default())
}

fn set_claim_state(account: Principal, state: ClaimState) {
    CLAIM_STATES.with(|states| {
        states.borrow_mut().insert(account, state);
    });
}

pub fn get_claim_status(account: Principal) -> Option<PendingClaim> {
    PENDING_CLAIMS.with(|p| p.borrow().get(&account))
}

/// Ops/test tooling: drop an account's claim cursor (and any parked claim).
pub fn delete_claim_state(account: Principal) {
    CLAIM_STATES.with(|states| {
        states.borrow_mut().remove(&account);
    });
    PENDING_CLAIMS.with(|p| {
        p.borrow_mut().remove(&account);
    });
}

// =============================================================================
// FEES
// =============================================================================

pub fn get_accumulated_fees() -> u64 {
    ACCUMULATED_FEES.with(|cell| *cell.borrow().get())
}

fn add_accumulated_fees(amount: u64) {
    ACCUMULATED_FEES.with(|cell| {
        let current = *cell.borrow().get();
        cell.borrow_mut()
            .set(current.saturating_add(amount))
            .expect("Failed to write fee accumulator");
    });
}

fn sub_accumulated_fees(amount: u64) {
    ACCUMULATED_FEES.with(|cell| {
        let current = *cell.borrow().get();
        cell.borrow_mut()
            .set(current.saturating_sub(amount))
            .expect("Failed to write fee accumulator");
    });
}

/// Transfer accumulated claim fees to the fee receiver.
///
/// Fees are deducted before the transfer. A definite rejection restores
/// them; an uncertain one does not (the transfer may have landed, and
/// under-counting protocol fees beats double-paying them).
pub async fn collect_fees() -> Result<u64, StreamerError> {
    let amount = get_accumulated_fees();
    if amount < MIN_FEE_COLLECTION {
        return Err(StreamerError::AmountTooSmall {
            minimum: MIN_FEE_COLLECTION,
        });
    }

    sub_accumulated_fees(amount);

    match attempt_transfer(config::fee_receiver(), amount, None).await {
        TransferOutcome::Success(_) => {
            log_audit(AuditEvent::FeesCollected { amount });
            Ok(amount)
        }
        TransferOutcome::DefiniteError(message) => {
            add_accumulated_fees(amount);
            Err(StreamerError::TransferFailed { message })
        }
        TransferOutcome::UncertainError(code, message) => {
            ic_cdk::println!(
                "Fee collection uncertain ({} e8s): {:?} {}",
                amount,
                code,
                message
            );
            Err(StreamerError::TransferInFlight {
                message: format!("{:?}: {}", code, message),
            })
        }
    }
}

/// Daily timer sweeping accumulated fees to the fee receiver.
pub fn start_fee_collection_timer() {
    FEE_TIMER_ID.with(|id| {
        if id.borrow().is_some() {
            return;
        }
        let timer_id = ic_cdk_timers::set_timer_interval(FEE_COLLECTION_INTERVAL, || {
            ic_cdk::spawn(async {
                if get_accumulated_fees() >= MIN_FEE_COLLECTION {
                    let _ = collect_fees().await;
                }
            });
        });
        *id.borrow_mut() = Some(timer_id);
    });
}

/// Periodic timer re-attempting claims parked on an uncertain transfer, so a
/// payout stuck by a transient ledger outage completes without the user
/// calling `retry_claim` themselves.
pub fn start_claim_retry_timer() {
    RETRY_TIMER_ID.with(|id| {
        if id.borrow().is_some() {
            return;
        }
        let timer_id = ic_cdk_timers::set_timer_interval(CLAIM_RETRY_INTERVAL, || {
            if PENDING_CLAIMS.with(|p| !p.borrow().is_empty()) {
                ic_cdk::spawn(retry_pending_claims());
            }
        });
        *id.borrow_mut() = Some(timer_id);
    });
}
