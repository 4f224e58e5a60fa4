//! Pure yield accrual computation.
//!
//! Operates on plain slices (balance log, schedule timelines) and a claim
//! cursor, with no canister state, so the whole claim state machine is
//! testable off-canister. All token amounts are u64 base units; intermediate
//! products use u128 with floor division at every step, so the engine never
//! pays out more than actually accrued. Every multiplication chain and the
//! narrowing back to u64 are checked; overflow aborts the call.

use super::state::{effective_value, ClaimPreview, ClaimState, ScheduleRecord};
use crate::balance_tracker::clock::SECONDS_PER_DAY;
use crate::balance_tracker::records::{balance_on_day, BalanceRecord};
use crate::types::StreamerError;

/// Fixed-point scale for yield and fee rates: a rate of 1e9 is 100% per day.
pub const RATE_FACTOR: u128 = 1_000_000_000;

/// The global rate and look-back timelines the engine reads.
pub struct AccrualTables<'a> {
    pub rates: &'a [ScheduleRecord],
    pub look_backs: &'a [ScheduleRecord],
}

/// Full-day yield accrued for `day`: the balance from `day - lookback`
/// (clamped to activation day 0) times the rate in effect on `day`.
/// Days with no configured rate or look-back accrue nothing.
fn whole_day_yield(
    log: &[BalanceRecord],
    tables: &AccrualTables,
    day: u64,
) -> Result<u128, StreamerError> {
    let Some(period) = effective_value(tables.look_backs, day) else {
        return Ok(0);
    };
    let Some(rate) = effective_value(tables.rates, day) else {
        return Ok(0);
    };
    let balance = balance_on_day(log, day.saturating_sub(period));
    let raw = (balance as u128)
        .checked_mul(rate as u128)
        .ok_or(StreamerError::ArithmeticOverflow)?;
    Ok(raw / RATE_FACTOR)
}

/// Yield streamed so far for the partially elapsed current day: the full-day
/// formula prorated by seconds elapsed. Never exceeds the day's whole-day
/// yield because `seconds <= SECONDS_PER_DAY`.
fn stream_yield_so_far(
    log: &[BalanceRecord],
    tables: &AccrualTables,
    day: u64,
    seconds_into_day: u64,
) -> Result<u128, StreamerError> {
    let Some(period) = effective_value(tables.look_backs, day) else {
        return Ok(0);
    };
    let Some(rate) = effective_value(tables.rates, day) else {
        return Ok(0);
    };
    let balance = balance_on_day(log, day.saturating_sub(period));
    let seconds = seconds_into_day.min(SECONDS_PER_DAY);
    // balance * rate fits u128; the extra seconds factor can push it over,
    // so the whole chain is checked.
    let raw = (balance as u128)
        .checked_mul(rate as u128)
        .and_then(|v| v.checked_mul(seconds as u128))
        .ok_or(StreamerError::ArithmeticOverflow)?;
    Ok(raw / (RATE_FACTOR * SECONDS_PER_DAY as u128))
}

fn narrow(value: u128) -> Result<u64, StreamerError> {
    u64::try_from(value).map_err(|_| StreamerError::ArithmeticOverflow)
}

/// Compute what a claim of `requested` (None = everything) would pay and the
/// claim cursor it would leave behind. Pure: callers persist the cursor.
///
/// Whole days in `(state.day, today - 1]` accrue at full weight; `today`
/// contributes its stream. The previously paid debit is charged against the
/// first unsettled day's accrual before anything is payable. Requesting more
/// than has accrued is not an error: the preview caps `claimed` at
/// `claimable` and reports the deficit as `shortfall`.
pub fn calculate_claim(
    log: &[BalanceRecord],
    tables: &AccrualTables,
    state: &ClaimState,
    today: u64,
    seconds_into_day: u64,
    fee_rate: u64,
    requested: Option<u64>,
) -> Result<ClaimPreview, StreamerError> {
    let from = state.day as u64;

    // Whole accrual days strictly after the settled day and strictly before
    // today. Empty when the cursor already sits at yesterday (or the clock
    // reports an earlier day than the cursor, which only a manual state
    // overwrite can produce).
    let first_whole = from + 1;
    let whole_days = if today > 0 && first_whole < today {
        first_whole..today
    } else {
        first_whole..first_whole
    };

    let mut primary_raw: u128 = 0;
    for day in whole_days {
        primary_raw = primary_raw
            .checked_add(whole_day_yield(log, tables, day)?)
            .ok_or(StreamerError::ArithmeticOverflow)?;
    }
    let stream_raw = stream_yield_so_far(log, tables, today, seconds_into_day)?;

    let total_raw = primary_raw
        .checked_add(stream_raw)
        .ok_or(StreamerError::ArithmeticOverflow)?;
    // By the cursor invariant the stored debit never exceeds the first
    // unsettled day's accrual; the min() only matters after a manual reset
    // of schedules or logs out from under an existing cursor.
    let effective_debit = (state.debit as u128).min(total_raw);

    // The debit charges the earliest unsettled accrual first: whole days,
    // then the stream.
    let primary_yield = primary_raw.saturating_sub(effective_debit);
    let stream_yield = stream_raw - effective_debit.saturating_sub(primary_raw);
    let claimable = primary_yield + stream_yield;

    let (claimed, shortfall) = match requested {
        None => (claimable, 0),
        Some(amount) => {
            let amount = amount as u128;
            if amount > claimable {
                (claimable, amount - claimable)
            } else {
                (amount, 0)
            }
        }
    };
    let fee = claimed * fee_rate as u128 / RATE_FACTOR;

    // Advance the cursor through the gross amount this claim consumes,
    // settling whole days while they are fully covered; whatever is left
    // becomes the debit of the first day that is not.
    let mut remaining = claimed + effective_debit;
    let mut settled_day = from;
    if today > 0 {
        for day in (from + 1)..today {
            let day_yield = whole_day_yield(log, tables, day)?;
            if remaining < day_yield {
                break;
            }
            remaining -= day_yield;
            settled_day = day;
        }
    }

    Ok(ClaimPreview {
        next_claim_day: settled_day,
        next_claim_debit: narrow(remaining)?,
        first_yield_day: first_whole,
        prev_claim_debit: state.debit,
        primary_yield: narrow(primary_yield)?,
        stream_yield: narrow(stream_yield)?,
        claimable: narrow(claimable)?,
        claimed: narrow(claimed)?,
        shortfall: narrow(shortfall)?,
        fee: narrow(fee)?,
    })
}
