//! Calendar-day iteration for the simulation
//!
//! The simulation advances in whole calendar days. This module provides
//! deterministic, inclusive day ranges over the simulation horizon.

use chrono::NaiveDate;

/// Iterator over an inclusive range of calendar days
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use wallet_simulator_core::core::calendar::days_inclusive;
///
/// let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
/// assert_eq!(days_inclusive(start, end).count(), 31);
/// ```
#[derive(Debug, Clone)]
pub struct DayRange {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl Iterator for DayRange {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        if current > self.end {
            self.next = None;
            return None;
        }
        self.next = current.succ_opt();
        Some(current)
    }
}

/// Iterate every day in `[start, end]`, ascending
///
/// An inverted range yields nothing.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> DayRange {
    DayRange {
        next: Some(start),
        end,
    }
}

/// Number of days in `[start, end]`, zero if inverted
pub fn day_count(start: NaiveDate, end: NaiveDate) -> usize {
    if start > end {
        return 0;
    }
    (end - start).num_days() as usize + 1
}
