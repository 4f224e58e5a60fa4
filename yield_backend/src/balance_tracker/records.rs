//! Per-account balance checkpoint log.
//!
//! One record per day on which the balance changed; a record's value is in
//! effect from its day (inclusive) until superseded by the next record. The
//! log is append-only and strictly increasing in day: a second change on the
//! same day overwrites the last record in place, so the log never holds two
//! records for one day.
//!
//! Everything in this module is pure so the search and sweep logic is
//! testable off-canister; stable storage lives in store.rs.

use crate::types::TrackerError;
use candid::{CandidType, Deserialize};
use ic_stable_structures::storable::Bound;
use ic_stable_structures::Storable;
use std::borrow::Cow;

/// Work cap for a single range query. 10 years of daily balances.
pub const MAX_QUERY_RANGE_DAYS: u64 = 3_650;

/// One balance checkpoint. `day` is bounded to 16 bits (~179 years of daily
/// records); conversions into it are checked, never truncated.
#[derive(CandidType, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BalanceRecord {
    pub day: u16,
    pub value: u64,
}

/// An account's full checkpoint log, stored wholesale per account.
#[derive(CandidType, Deserialize, Clone, Debug, Default)]
pub struct BalanceLog(pub Vec<BalanceRecord>);

impl Storable for BalanceLog {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(candid::encode_one(self).expect(
            "CRITICAL: Failed to encode BalanceLog. \
             This should never happen unless there's a bug in candid serialization.",
        ))
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        candid::decode_one(&bytes).expect(
            "CRITICAL: Failed to decode BalanceLog from stable storage. \
             This indicates storage corruption or an incompatible canister upgrade.",
        )
    }

    const BOUND: Bound = Bound::Unbounded;
}

/// Record a balance change effective on `day`.
///
/// Appends a new record, or overwrites the last one if it already covers
/// `day`. Rejects days earlier than the last record: the clock never moves
/// backwards, so an out-of-order day means corrupted input.
pub fn apply_change(log: &mut Vec<BalanceRecord>, day: u16, value: u64) -> Result<(), TrackerError> {
    match log.last_mut() {
        Some(last) if last.day == day => {
            last.value = value;
        }
        Some(last) if last.day > day => {
            return Err(TrackerError::NonChronological { day: day as u64 });
        }
        _ => {
            log.push(BalanceRecord { day, value });
        }
    }
    Ok(())
}

/// The balance in effect on `day`: value of the last record with
/// `record.day <= day`, or zero before the first record.
pub fn balance_on_day(log: &[BalanceRecord], day: u64) -> u64 {
    let covering = log.partition_point(|r| (r.day as u64) <= day);
    if covering == 0 {
        0
    } else {
        log[covering - 1].value
    }
}

/// One balance per day in `[from_day, to_day]` inclusive.
///
/// Binary search locates the record covering `from_day`, then a single
/// forward sweep carries values across gaps and merges in later records as
/// the day cursor crosses them: O(log n + range + records-in-range) instead
/// of a search per day.
pub fn daily_balances(
    log: &[BalanceRecord],
    from_day: u64,
    to_day: u64,
) -> Result<Vec<u64>, TrackerError> {
    if from_day > to_day {
        return Err(TrackerError::InvalidRange { from_day, to_day });
    }
    let days = to_day - from_day + 1;
    if days > MAX_QUERY_RANGE_DAYS {
        return Err(TrackerError::RangeTooWide {
            days,
            max: MAX_QUERY_RANGE_DAYS,
        });
    }

    let mut next = log.partition_point(|r| (r.day as u64) <= from_day);
    let mut value = if next == 0 { 0 } else { log[next - 1].value };

    let mut balances = Vec::with_capacity(days as usize);
    for day in from_day..=to_day {
        while next < log.len() && (log[next].day as u64) <= day {
            value = log[next].value;
            next += 1;
        }
        balances.push(value);
    }
    Ok(balances)
}

/// Validate that a log supplied by the administrative overwrite is strictly
/// increasing in day.
pub fn validate_chronological(log: &[BalanceRecord]) -> Result<(), TrackerError> {
    for pair in log.windows(2) {
        if pair[1].day <= pair[0].day {
            return Err(TrackerError::NonChronological {
                day: pair[1].day as u64,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(entries: &[(u16, u64)]) -> Vec<BalanceRecord> {
        entries
            .iter()
            .map(|&(day, value)| BalanceRecord { day, value })
            .collect()
    }

    #[test]
    fn test_apply_change_appends_new_days() {
        let mut records = Vec::new();
        apply_change(&mut records, 0, 100).unwrap();
        apply_change(&mut records, 3, 250).unwrap();

        assert_eq!(records, log(&[(0, 100), (3, 250)]));
    }

    #[test]
    fn test_same_day_change_overwrites_last_record() {
        let mut records = log(&[(0, 100)]);
        apply_change(&mut records, 5, 200).unwrap();
        apply_change(&mut records, 5, 350).unwrap();

        // Exactly one record for day 5, holding the latest value.
        assert_eq!(records, log(&[(0, 100), (5, 350)]));
    }

    #[test]
    fn test_out_of_order_day_rejected() {
        let mut records = log(&[(7, 100)]);
        let err = apply_change(&mut records, 6, 50).unwrap_err();
        assert_eq!(err, TrackerError::NonChronological { day: 6 });
        assert_eq!(records, log(&[(7, 100)]));
    }

    #[test]
    fn test_balance_on_day_carries_forward() {
        let records = log(&[(2, 100), (5, 40), (9, 700)]);

        assert_eq!(balance_on_day(&records, 0), 0); // before first record
        assert_eq!(balance_on_day(&records, 2), 100);
        assert_eq!(balance_on_day(&records, 4), 100); // gap carries forward
        assert_eq!(balance_on_day(&records, 5), 40);
        assert_eq!(balance_on_day(&records, 8), 40);
        assert_eq!(balance_on_day(&records, 9), 700);
        assert_eq!(balance_on_day(&records, 500), 700); // past the last record
    }

    #[test]
    fn test_balance_on_day_empty_log() {
        assert_eq!(balance_on_day(&[], 12), 0);
    }

    #[test]
    fn test_daily_balances_matches_per_day_lookup() {
        let records = log(&[(2, 100), (5, 40), (9, 700)]);

        let range = daily_balances(&records, 0, 12).unwrap();
        for (offset, &balance) in range.iter().enumerate() {
            assert_eq!(
                balance,
                balance_on_day(&records, offset as u64),
                "mismatch on day {}",
                offset
            );
        }
        assert_eq!(range.len(), 13);
    }

    #[test]
    fn test_daily_balances_subrange() {
        let records = log(&[(2, 100), (5, 40)]);
        assert_eq!(daily_balances(&records, 3, 6).unwrap(), vec![100, 100, 40, 40]);
    }

    #[test]
    fn test_daily_balances_single_day() {
        let records = log(&[(2, 100)]);
        assert_eq!(daily_balances(&records, 2, 2).unwrap(), vec![100]);
    }

    #[test]
    fn test_invalid_range_rejected() {
        // from > to must fail no matter the record content.
        let err = daily_balances(&[], 10, 5).unwrap_err();
        assert_eq!(
            err,
            TrackerError::InvalidRange {
                from_day: 10,
                to_day: 5
            }
        );

        let records = log(&[(0, 1)]);
        assert!(daily_balances(&records, 10, 5).is_err());
    }

    #[test]
    fn test_range_too_wide_rejected() {
        let err = daily_balances(&[], 0, MAX_QUERY_RANGE_DAYS).unwrap_err();
        assert_eq!(
            err,
            TrackerError::RangeTooWide {
                days: MAX_QUERY_RANGE_DAYS + 1,
                max: MAX_QUERY_RANGE_DAYS
            }
        );

        // Exactly at the cap is fine.
        assert!(daily_balances(&[], 0, MAX_QUERY_RANGE_DAYS - 1).is_ok());
    }

    #[test]
    fn test_validate_chronological() {
        assert!(validate_chronological(&log(&[(0, 1), (3, 2), (9, 3)])).is_ok());
        assert!(validate_chronological(&[]).is_ok());

        let dup = log(&[(0, 1), (3, 2), (3, 3)]);
        assert_eq!(
            validate_chronological(&dup).unwrap_err(),
            TrackerError::NonChronological { day: 3 }
        );
    }
}
