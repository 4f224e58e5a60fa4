//! Claim cursors, schedule timelines and the claim preview breakdown.

use candid::{CandidType, Deserialize};
use ic_stable_structures::storable::Bound;
use ic_stable_structures::Storable;
use std::borrow::Cow;

/// Per-account claim cursor.
///
/// `day` is the last fully settled day. `debit` is the portion already paid
/// out of the accrual that chronologically belongs to day `day + 1` — for a
/// caller who claimed earlier today, that is today's stream — so repeated
/// same-day claims never double count.
#[derive(CandidType, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClaimState {
    pub day: u16,
    pub debit: u64,
}

impl Storable for ClaimState {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(candid::encode_one(self).expect(
            "CRITICAL: Failed to encode ClaimState. \
             This should never happen unless there's a bug in candid serialization.",
        ))
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        candid::decode_one(&bytes).expect(
            "CRITICAL: Failed to decode ClaimState from stable storage. \
             This indicates storage corruption or an incompatible canister upgrade.",
        )
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: 64,
        is_fixed_size: false,
    };
}

/// One entry of a global effective-from timeline (yield rates, look-back
/// periods). A record's value applies from its day until superseded.
#[derive(CandidType, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleRecord {
    pub day: u16,
    pub value: u64,
}

impl Storable for ScheduleRecord {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(candid::encode_one(self).expect(
            "CRITICAL: Failed to encode ScheduleRecord. \
             This should never happen unless there's a bug in candid serialization.",
        ))
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        candid::decode_one(&bytes).expect(
            "CRITICAL: Failed to decode ScheduleRecord from stable storage. \
             This indicates storage corruption or an incompatible canister upgrade.",
        )
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: 32,
        is_fixed_size: false,
    };
}

/// The value in effect on `day`, or None if the timeline has no entry yet
/// (meaning: not configured, accrue nothing for that day).
pub fn effective_value(schedule: &[ScheduleRecord], day: u64) -> Option<u64> {
    let covering = schedule.partition_point(|r| (r.day as u64) <= day);
    if covering == 0 {
        None
    } else {
        Some(schedule[covering - 1].value)
    }
}

/// Full claim breakdown. Returned by the preview queries without mutating
/// anything, and by `claim` describing what it realized; `next_claim_day` /
/// `next_claim_debit` are the cursor a claim of `claimed` would leave behind.
#[derive(CandidType, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClaimPreview {
    pub next_claim_day: u64,
    pub next_claim_debit: u64,
    /// First day contributing whole-day yield to this claim.
    pub first_yield_day: u64,
    pub prev_claim_debit: u64,
    /// Whole-day yield net of the already-paid debit.
    pub primary_yield: u64,
    /// Prorated yield for the elapsed part of the current day.
    pub stream_yield: u64,
    /// Total payable right now: primary + stream.
    pub claimable: u64,
    /// What this claim pays out (gross, before the fee).
    pub claimed: u64,
    /// Deficit between the requested amount and `claimable`. Informational,
    /// never an error.
    pub shortfall: u64,
    /// Fee withheld from `claimed` for the fee receiver.
    pub fee: u64,
}
