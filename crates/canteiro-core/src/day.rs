//! Integer day ordinals.
//!
//! Calendar dates enter the engine as `NaiveDate` and are converted to `Day`
//! once, so histogram, float and gap arithmetic is plain integer math with
//! no timezone or off-by-one surprises. Dates are rendered back on output.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Days since 0001-01-01 (proleptic Gregorian, day 1 = 0001-01-01)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Day(pub i32);

impl Day {
    pub fn from_date(date: NaiveDate) -> Self {
        Day(date.num_days_from_ce())
    }

    pub fn to_date(self) -> NaiveDate {
        NaiveDate::from_num_days_from_ce_opt(self.0).unwrap_or(NaiveDate::MAX)
    }

    pub fn succ(self) -> Self {
        Day(self.0.saturating_add(1))
    }

    /// Shift by a signed number of days, saturating at the ends of the range
    pub fn offset(self, days: i64) -> Self {
        let shifted = i64::from(self.0).saturating_add(days);
        Day(i32::try_from(shifted).unwrap_or(if shifted < 0 { i32::MIN } else { i32::MAX }))
    }

    /// Signed distance `other - self` in days
    pub fn days_until(self, other: Day) -> i64 {
        i64::from(other.0) - i64::from(self.0)
    }
}

impl From<NaiveDate> for Day {
    fn from(date: NaiveDate) -> Self {
        Day::from_date(date)
    }
}

impl std::fmt::Display for Day {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_date())
    }
}
