//! Visit date generation from a pacing policy.
//!
//! Standard pacing follows the child's age: weekly visits for a newborn,
//! every two weeks for an infant, monthly through the toddler years, then
//! every two months. Defined pacing uses whatever fixed interval the family
//! chose. Either way the sequence starts at the first visit and stops before
//! the schedule end date.

use chrono::NaiveDate;

use crate::calendar::{add_days, add_months};
use crate::participant::{DefinedInterval, Pacing, Participant, ScheduleDuration};

/// Age at which curriculum content ends, in months.
pub const CONTENT_END_MONTHS: i32 = 36;

/// Fallback step when defined pacing has no interval.
const DEFAULT_DEFINED_STEP_DAYS: i64 = 30;

// Standard pacing bands, as days since birth.
const WEEKLY_THROUGH_DAYS: i64 = 90;
const BIWEEKLY_THROUGH_DAYS: i64 = 210;
const MONTHLY_THROUGH_DAYS: i64 = 670;

/// Last date (exclusive) a visit may be scheduled for.
pub fn schedule_end(
    birth: NaiveDate,
    first: NaiveDate,
    duration: ScheduleDuration,
) -> NaiveDate {
    match duration {
        ScheduleDuration::UpToThirdBirthday => add_months(birth, CONTENT_END_MONTHS),
        ScheduleDuration::UpToDueDate => birth,
        ScheduleDuration::SixMonths => add_months(first, 6),
        ScheduleDuration::TwelveMonths => add_months(first, 12),
    }
}

/// Days until the next visit under standard pacing, by where `current` falls
/// relative to birth.
pub fn standard_step_days(birth: NaiveDate, current: NaiveDate) -> i64 {
    if current <= add_days(birth, WEEKLY_THROUGH_DAYS) {
        7
    } else if current <= add_days(birth, BIWEEKLY_THROUGH_DAYS) {
        14
    } else if current <= add_days(birth, MONTHLY_THROUGH_DAYS) {
        30
    } else {
        60
    }
}

/// Generate the visit date sequence.
///
/// Returns strictly increasing dates starting at `first`; the sequence is
/// empty when `first` is already at or past the end date (or the third
/// birthday). The step is chosen from the date being advanced from, and a
/// candidate at or past the end is not emitted.
pub fn generate_visits(
    pacing: Pacing,
    interval: Option<DefinedInterval>,
    birth: NaiveDate,
    first: NaiveDate,
    duration: ScheduleDuration,
) -> Vec<NaiveDate> {
    let end = schedule_end(birth, first, duration);
    let third_birthday = add_months(birth, CONTENT_END_MONTHS);
    if first >= end || first >= third_birthday {
        return Vec::new();
    }

    let mut visits = Vec::new();
    let mut current = first;
    loop {
        visits.push(current);
        let step = match pacing {
            Pacing::Defined => interval
                .map(|i| i.step_days())
                .unwrap_or(DEFAULT_DEFINED_STEP_DAYS),
            Pacing::Standard => standard_step_days(birth, current),
        };
        let next = add_days(current, step);
        if next >= end {
            break;
        }
        current = next;
    }
    visits
}

/// Visit dates for a participant's selections.
pub fn visits_for(participant: &Participant) -> Vec<NaiveDate> {
    generate_visits(
        participant.pacing,
        participant.defined_interval,
        participant.birth,
        participant.first_visit,
        participant.duration,
    )
}
