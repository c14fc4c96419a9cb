//! Calendar rules: whole-month age arithmetic and visit blackout windows.
//!
//! All scheduling works in naive calendar dates. Ages are whole months
//! relative to the child's birth (or due) date and may be negative for
//! prenatal visits.

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Whole-month difference between `birth` and `current`.
///
/// Counts calendar months (year*12 + month), then subtracts one when the
/// current day-of-month has not yet reached the birth day-of-month. A
/// negative result means `current` is before birth (prenatal).
pub fn months_between(birth: NaiveDate, current: NaiveDate) -> i32 {
    let mut months = (current.year() - birth.year()) * 12 + current.month() as i32
        - birth.month() as i32;
    if current.day() < birth.day() {
        months -= 1;
    }
    months
}

/// Signed day arithmetic with normal calendar rollover.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

/// Signed month arithmetic. The day-of-month is clamped to the length of the
/// target month (Jan 31 + 1 month lands on Feb 28/29).
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let result = if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    result.unwrap_or(date)
}

/// Number of days in the given month, or 30 when the month is out of range.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(first) => add_months(first, 1)
            .signed_duration_since(first)
            .num_days() as u32,
        None => 30,
    }
}

/// Parse a date in ISO `YYYY-MM-DD` or legacy `MM/DD/YYYY` form.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    let v = value.trim();
    NaiveDate::parse_from_str(v, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(v, "%m/%d/%Y"))
        .map_err(|_| ValidationError::InvalidDate {
            value: value.to_string(),
        })
}

/// Window in which no home visit may be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Blackout {
    /// The 7-day week containing the 4th Thursday of November,
    /// starting on its Sunday.
    ThanksgivingWeek,
    /// The last 13 days of December, inclusive.
    LateDecember,
}

impl Blackout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Blackout::ThanksgivingWeek => "thanksgiving_week",
            Blackout::LateDecember => "late_december",
        }
    }

    /// Human-readable reason shown on placeholder schedule rows.
    pub fn label(&self) -> &'static str {
        match self {
            Blackout::ThanksgivingWeek => "Thanksgiving week holiday break",
            Blackout::LateDecember => "End-of-year holiday break",
        }
    }
}

/// Classify a date against the blackout windows.
pub fn blackout_for(date: NaiveDate) -> Option<Blackout> {
    if date.month() == 12 && date.day() >= days_in_month(date.year(), 12) - 12 {
        return Some(Blackout::LateDecember);
    }
    if date.month() == 11 {
        if let Some(thanksgiving) = fourth_thursday_of_november(date.year()) {
            let offset = thanksgiving.weekday().num_days_from_sunday() as i64;
            let week_start = add_days(thanksgiving, -offset);
            let week_end = add_days(week_start, 6);
            if date >= week_start && date <= week_end {
                return Some(Blackout::ThanksgivingWeek);
            }
        }
    }
    None
}

fn fourth_thursday_of_november(year: i32) -> Option<NaiveDate> {
    let nov_first = NaiveDate::from_ymd_opt(year, 11, 1)?;
    let to_thursday = (Weekday::Thu.num_days_from_sunday() + 7
        - nov_first.weekday().num_days_from_sunday())
        % 7;
    Some(add_days(nov_first, to_thursday as i64 + 21))
}
