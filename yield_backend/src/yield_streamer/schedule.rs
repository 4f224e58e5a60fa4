//! Global yield-rate and look-back-period timelines.
//!
//! Both are append-only chronological arrays shared by every account. Later
//! entries must have strictly increasing days; re-appending with the same day
//! as the last entry replaces its value, so a same-day misconfiguration can
//! be corrected before anyone claims against it.

use super::state::ScheduleRecord;
use crate::memory_ids::{LOOK_BACK_PERIODS_MEMORY_ID, YIELD_RATES_MEMORY_ID};
use crate::types::StreamerError;
use crate::{Memory, MEMORY_MANAGER};
use ic_stable_structures::memory_manager::MemoryId;
use ic_stable_structures::StableVec;
use std::cell::RefCell;

thread_local! {
    static YIELD_RATES: RefCell<StableVec<ScheduleRecord, Memory>> = RefCell::new(
        StableVec::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(YIELD_RATES_MEMORY_ID)))
        ).expect("Failed to init yield rate timeline")
    );

    static LOOK_BACK_PERIODS: RefCell<StableVec<ScheduleRecord, Memory>> = RefCell::new(
        StableVec::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(LOOK_BACK_PERIODS_MEMORY_ID)))
        ).expect("Failed to init look-back timeline")
    );
}

fn append_or_replace(
    timeline: &RefCell<StableVec<ScheduleRecord, Memory>>,
    effective_day: u64,
    value: u64,
) -> Result<(), StreamerError> {
    let day = u16::try_from(effective_day)
        .map_err(|_| StreamerError::DayOverflow { day: effective_day })?;
    let record = ScheduleRecord { day, value };

    let timeline = timeline.borrow_mut();
    let len = timeline.len();
    if len > 0 {
        let last = timeline
            .get(len - 1)
            .expect("timeline index out of bounds");
        if last.day == day {
            timeline.set(len - 1, &record);
            return Ok(());
        }
        if last.day > day {
            return Err(StreamerError::NonChronological { day: effective_day });
        }
    }
    timeline
        .push(&record)
        .map_err(|_| StreamerError::ArithmeticOverflow)?;
    Ok(())
}

fn load(timeline: &RefCell<StableVec<ScheduleRecord, Memory>>) -> Vec<ScheduleRecord> {
    timeline.borrow().iter().collect()
}

pub fn add_yield_rate(effective_day: u64, rate: u64) -> Result<(), StreamerError> {
    YIELD_RATES.with(|t| append_or_replace(t, effective_day, rate))
}

pub fn add_look_back_period(effective_day: u64, period: u64) -> Result<(), StreamerError> {
    LOOK_BACK_PERIODS.with(|t| append_or_replace(t, effective_day, period))
}

pub fn get_yield_rates() -> Vec<ScheduleRecord> {
    YIELD_RATES.with(load)
}

pub fn get_look_back_periods() -> Vec<ScheduleRecord> {
    LOOK_BACK_PERIODS.with(load)
}
