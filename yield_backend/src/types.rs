use candid::{CandidType, Deserialize, Principal};
use ic_stable_structures::storable::Bound;
use ic_stable_structures::Storable;
use serde::Serialize;
use std::borrow::Cow;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors surfaced by the balance history store.
///
/// Candid-typed (rather than stringly-typed) so clients can distinguish a bad
/// query range from an overflow from an authorization failure.
#[derive(CandidType, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum TrackerError {
    /// `from_day > to_day` in a range query.
    InvalidRange { from_day: u64, to_day: u64 },
    /// Range query wider than the per-call work cap.
    RangeTooWide { days: u64, max: u64 },
    /// Day index does not fit the bounded record width.
    DayOverflow { day: u64 },
    /// Records supplied to an administrative overwrite are not strictly
    /// increasing in day.
    NonChronological { day: u64 },
    /// Caller is not allowed to perform this operation.
    NotAuthorized,
}

/// Errors surfaced by the yield accrual engine and the claim path.
#[derive(CandidType, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum StreamerError {
    NotAuthorized,
    /// Another operation by the same caller is still in progress.
    OperationInProgress,
    /// A previous claim transfer is still awaiting retry or abandon.
    ClaimAlreadyPending,
    /// retry/abandon called with nothing parked.
    NoPendingClaim,
    /// Net payout would not cover the ledger transfer fee.
    AmountTooSmall { minimum: u64 },
    /// Fee rate above 100% (RATE_FACTOR) rejected at configuration time.
    InvalidFeeRate { max: u64 },
    /// A product or sum exceeded the representable width. Never saturated.
    ArithmeticOverflow,
    /// Day index does not fit the bounded record width.
    DayOverflow { day: u64 },
    /// Schedule entry would break chronological ordering.
    NonChronological { day: u64 },
    /// The ledger definitively rejected the transfer; state was rolled back.
    TransferFailed { message: String },
    /// The ledger call was rejected with an uncertain code; the claim is
    /// parked and can be retried or abandoned.
    TransferInFlight { message: String },
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Canister-wide configuration, set at install and owner-mutable afterwards.
#[derive(CandidType, Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    /// Privileged principal for administrative operations.
    pub owner: Principal,
    /// The token ledger canister: sole authorized source of balance-change
    /// notifications and the ledger claim payouts are transferred on.
    pub token_ledger: Principal,
    /// Receiver of collected claim fees.
    pub fee_receiver: Principal,
    /// Claim fee rate, scaled by RATE_FACTOR (1e9). 0 disables fees.
    pub fee_rate: u64,
    /// Unix day (epoch nanos / day) of canister activation. Day index 0 of
    /// the tracker corresponds to this unix day.
    pub genesis_day: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            owner: Principal::anonymous(),
            token_ledger: Principal::anonymous(),
            fee_receiver: Principal::anonymous(),
            fee_rate: 0,
            genesis_day: 0,
        }
    }
}

impl Storable for Config {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        let serialized = serde_json::to_vec(self).expect(
            "CRITICAL: Failed to encode Config. \
             This should never happen unless there's a bug in serde serialization.",
        );
        Cow::Owned(serialized)
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        serde_json::from_slice(&bytes).expect(
            "CRITICAL: Failed to decode Config from stable storage. \
             This indicates storage corruption or an incompatible canister upgrade.",
        )
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: 512,
        is_fixed_size: false,
    };
}

/// Install-time arguments.
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct InitArgs {
    pub token_ledger: Principal,
    pub fee_receiver: Principal,
    /// Scaled by 1e9; defaults to 0 (no fee).
    pub fee_rate: Option<u64>,
}

// =============================================================================
// PENDING CLAIMS
// =============================================================================

/// A claim whose state update has been committed but whose ledger transfer
/// ended in an uncertain rejection. Parked until retried or abandoned.
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct PendingClaim {
    /// Claim cursor before this claim, for rollback.
    pub prev_day: u16,
    pub prev_debit: u64,
    /// Gross yield consumed by this claim (net payout + fee).
    pub gross_amount: u64,
    /// Amount still owed to the account (gross minus fee).
    pub net_amount: u64,
    /// Fee accrued into the collection pot by this claim.
    pub fee: u64,
    /// Ledger idempotency key: timestamp of the first transfer attempt.
    pub created_at: u64,
    pub retries: u8,
    pub last_error: Option<String>,
}

impl Storable for PendingClaim {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(candid::encode_one(self).expect(
            "CRITICAL: Failed to encode PendingClaim. \
             This should never happen unless there's a bug in candid serialization.",
        ))
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        candid::decode_one(&bytes).expect(
            "CRITICAL: Failed to decode PendingClaim from stable storage. \
             This indicates storage corruption or an incompatible canister upgrade. \
             Manual intervention required - check upgrade path and stable storage state.",
        )
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: 400,
        is_fixed_size: false,
    };
}

// =============================================================================
// AUDIT LOG
// =============================================================================

#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct AuditEntry {
    pub timestamp: u64,
    pub event: AuditEvent,
}

/// Persistent event stream. Claim events double as the user-visible
/// "YieldClaimed" events; the rest is an operational audit trail.
#[derive(CandidType, Deserialize, Clone, Debug)]
pub enum AuditEvent {
    ClaimInitiated { account: Principal, amount: u64, fee: u64 },
    YieldClaimed { account: Principal, amount: u64, fee: u64 },
    ClaimFailed { account: Principal, amount: u64 },
    ClaimAbandoned { account: Principal, amount: u64 },
    FeesCollected { amount: u64 },
    YieldRateConfigured { effective_day: u64, rate: u64 },
    LookBackPeriodConfigured { effective_day: u64, period: u64 },
    AccountReset { account: Principal },
    BalanceLogOverwritten { account: Principal, records: u64 },
}

impl Storable for AuditEntry {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(candid::encode_one(self).expect(
            "CRITICAL: Failed to encode AuditEntry. \
             This should never happen unless there's a bug in candid serialization. \
             Audit logging is failing - system integrity may be compromised.",
        ))
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        candid::decode_one(&bytes).expect(
            "CRITICAL: Failed to decode AuditEntry from stable storage. \
             This indicates audit log corruption or an incompatible upgrade. \
             Audit trail integrity cannot be guaranteed.",
        )
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: 500,
        is_fixed_size: false,
    };
}
