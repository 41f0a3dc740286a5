//! Budget periods.
//!
//! A [`Period`] is a half-open UTC interval `[start, end)`. Budget limits are
//! keyed by the exact interval, and utilization sums every non-deleted ledger
//! entry whose timestamp falls inside it. Calendar months are the common
//! case, so there is a dedicated constructor for them.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Half-open UTC interval `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Period {
    /// Creates a period, rejecting empty or inverted intervals.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> ResultEngine<Self> {
        if end <= start {
            return Err(EngineError::InvalidPeriod(
                "period end must be after period start".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    /// Creates the calendar month `[year-month-01, next month-01)`.
    pub fn month(year: i32, month: u32) -> ResultEngine<Self> {
        let start = Utc
            .with_ymd_and_hms(year, month, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| {
                EngineError::InvalidPeriod(format!("invalid calendar month: {year}-{month:02}"))
            })?;
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let end = Utc
            .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| {
                EngineError::InvalidPeriod(format!("invalid calendar month: {year}-{month:02}"))
            })?;
        Self::new(start, end)
    }

    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns `true` when `at` falls inside `[start, end)`.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_bounds() {
        let period = Period::month(2024, 6).unwrap();
        assert!(period.contains(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()));
        assert!(period.contains(Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 59).unwrap()));
        assert!(!period.contains(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn december_rolls_over() {
        let period = Period::month(2024, 12).unwrap();
        assert_eq!(
            period.end(),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    #[should_panic(expected = "InvalidPeriod")]
    fn rejects_inverted_interval() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        Period::new(start, start).unwrap();
    }
}
