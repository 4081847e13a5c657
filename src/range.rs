//! Query ranges
//!
//! A `TimeRange` covers every UTC calendar day between its start and end
//! instants, both ends inclusive. Days are stepped on the calendar date itself,
//! so month, year and DST boundaries never skip or repeat a day.

use crate::error::{Result, WearableError};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed date-time range used by every adapter query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(WearableError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range spanning whole UTC calendar days from `first` to `last`
    pub fn from_days(first: NaiveDate, last: NaiveDate) -> Result<Self> {
        let start = first.and_time(NaiveTime::MIN).and_utc();
        let end = last
            .and_hms_milli_opt(23, 59, 59, 999)
            .ok_or_else(|| WearableError::Config(format!("no end of day for {}", last)))?
            .and_utc();
        Self::new(start, end)
    }

    /// Window of `days` calendar days ending on `last` (inclusive)
    pub fn trailing_days(last: NaiveDate, days: u32) -> Result<Self> {
        if days == 0 {
            return Err(WearableError::Config(
                "trailing window must cover at least one day".to_string(),
            ));
        }
        let first = last
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .ok_or_else(|| {
                WearableError::Config(format!(
                    "{} day window ending {} is outside the calendar",
                    days, last
                ))
            })?;
        Self::from_days(first, last)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn first_day(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.end.date_naive()
    }

    /// Whether a calendar day falls inside the range
    pub fn contains_day(&self, day: NaiveDate) -> bool {
        day >= self.first_day() && day <= self.last_day()
    }

    /// Every calendar day in the range, ascending
    pub fn days(&self) -> Vec<NaiveDate> {
        let last = self.last_day();
        let mut days = Vec::new();
        let mut current = Some(self.first_day());

        while let Some(day) = current {
            if day > last {
                break;
            }
            days.push(day);
            current = day.succ_opt();
        }

        days
    }

    /// Number of calendar days covered
    pub fn day_count(&self) -> usize {
        (self.last_day() - self.first_day()).num_days() as usize + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_rejects_inverted_range() {
        let start = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let result = TimeRange::new(start, end);
        assert!(matches!(result, Err(WearableError::InvalidRange { .. })));
    }

    #[test]
    fn test_single_instant_is_one_day() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let range = TimeRange::new(at, at).unwrap();
        assert_eq!(range.days(), vec![day(2024, 1, 1)]);
        assert_eq!(range.day_count(), 1);
    }

    #[test]
    fn test_days_cross_year_boundary() {
        let range = TimeRange::from_days(day(2023, 12, 30), day(2024, 1, 2)).unwrap();
        assert_eq!(
            range.days(),
            vec![
                day(2023, 12, 30),
                day(2023, 12, 31),
                day(2024, 1, 1),
                day(2024, 1, 2)
            ]
        );
    }

    #[test]
    fn test_days_across_leap_day_and_dst() {
        // US DST started 2024-03-10; UTC days are unaffected
        let range = TimeRange::from_days(day(2024, 2, 28), day(2024, 3, 11)).unwrap();
        let days = range.days();
        assert_eq!(days.len(), 13);
        assert!(days.contains(&day(2024, 2, 29)));
        assert_eq!(range.day_count(), days.len());
    }

    #[test]
    fn test_trailing_window() {
        let range = TimeRange::trailing_days(day(2024, 1, 7), 7).unwrap();
        assert_eq!(range.first_day(), day(2024, 1, 1));
        assert_eq!(range.last_day(), day(2024, 1, 7));
        assert!(range.contains_day(day(2024, 1, 4)));
        assert!(!range.contains_day(day(2024, 1, 8)));

        assert!(TimeRange::trailing_days(day(2024, 1, 7), 0).is_err());
    }

    #[test]
    fn test_calendar_extremes_are_errors_not_panics() {
        assert!(matches!(
            TimeRange::trailing_days(day(2024, 1, 7), u32::MAX),
            Err(WearableError::Config(_))
        ));
        assert!(matches!(
            TimeRange::trailing_days(NaiveDate::MIN, 2),
            Err(WearableError::Config(_))
        ));

        let last = TimeRange::from_days(NaiveDate::MAX, NaiveDate::MAX).unwrap();
        assert_eq!(last.days(), vec![NaiveDate::MAX]);

        let first = TimeRange::trailing_days(NaiveDate::MIN, 1).unwrap();
        assert_eq!(first.first_day(), NaiveDate::MIN);
    }
}
