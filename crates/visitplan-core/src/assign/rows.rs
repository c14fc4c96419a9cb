//! Output shape of a schedule run: rows, per-visit summaries, diagnostics.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::Blackout;

use super::{AssignmentState, Visit};

/// Subject shown on rows that carry no lesson.
pub const PLACEHOLDER_SUBJECT: &str = "No lesson scheduled";

/// Why a visit row has no lesson on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderReason {
    /// The visit date falls inside a holiday blackout.
    Blackout(Blackout),
    /// A December visit intentionally left open before the break.
    EndOfYear,
    /// More visits than content; the slot stays available.
    ExcessCapacity,
}

impl PlaceholderReason {
    pub fn label(&self) -> &'static str {
        match self {
            PlaceholderReason::Blackout(b) => b.label(),
            PlaceholderReason::EndOfYear => "End-of-year wind-down",
            PlaceholderReason::ExcessCapacity => "Extra visit capacity",
        }
    }
}

/// One line of the delivered schedule: a lesson on a visit, or a placeholder
/// explaining why the visit is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRow {
    /// Visit number, dense over distinct dates, starting at 1.
    pub visit: u32,
    pub date: NaiveDate,
    /// Child age in months on the visit date; negative is prenatal.
    pub age_m: i32,
    /// The lesson's own target age, when it declares one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub standard_age_m: Option<f64>,
    pub code: String,
    pub subject: String,
    pub minutes: u32,
    pub placeholder: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<String>,
}

/// Capacity view of one visit after assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitSummary {
    pub visit: u32,
    pub date: NaiveDate,
    pub age_m: i32,
    pub blocked: bool,
    pub lessons: usize,
    pub max_slots: usize,
    pub minutes: u32,
}

/// Everything one scheduling run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResult {
    pub rows: Vec<ScheduleRow>,
    pub visits: Vec<VisitSummary>,
    pub total_visits: usize,
    /// Visits that ended up with at least one lesson.
    pub used_visits: usize,
    /// Lesson codes that fit somewhere but ran out of room.
    pub overflow: Vec<String>,
    /// Lesson codes no visit could ever take.
    pub skipped: Vec<String>,
}

impl ScheduleResult {
    pub fn scheduled_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.placeholder).count()
    }

    pub fn overflow_count(&self) -> usize {
        self.overflow.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn unscheduled_count(&self) -> usize {
        self.overflow.len() + self.skipped.len()
    }

    pub fn is_fully_scheduled(&self) -> bool {
        self.overflow.is_empty() && self.skipped.is_empty()
    }
}

pub(crate) fn build_result(state: &AssignmentState<'_>) -> ScheduleResult {
    let mut rows: Vec<ScheduleRow> = Vec::new();
    for visit in &state.visits {
        if visit.blocked {
            let reason = visit
                .blackout
                .map(PlaceholderReason::Blackout)
                .unwrap_or(PlaceholderReason::ExcessCapacity);
            rows.push(placeholder_row(visit, reason));
        } else if visit.is_empty() {
            let reason = if visit.date.month() == 12 {
                PlaceholderReason::EndOfYear
            } else {
                PlaceholderReason::ExcessCapacity
            };
            rows.push(placeholder_row(visit, reason));
        } else {
            for assignment in &visit.assignments {
                rows.push(ScheduleRow {
                    visit: 0,
                    date: visit.date,
                    age_m: visit.age_m,
                    standard_age_m: assignment.lesson.seq_age,
                    code: assignment.lesson.code.clone(),
                    subject: assignment.lesson.subject.clone(),
                    minutes: assignment.lesson.minutes,
                    placeholder: false,
                    reason: None,
                });
            }
        }
    }

    // Stable sort keeps each visit's lessons in placement order, then visit
    // numbers run dense over distinct dates.
    rows.sort_by(|a, b| a.date.cmp(&b.date));
    let mut number = 0u32;
    let mut prev: Option<NaiveDate> = None;
    for row in &mut rows {
        if prev != Some(row.date) {
            number += 1;
            prev = Some(row.date);
        }
        row.visit = number;
    }

    let numbers: HashMap<NaiveDate, u32> = rows.iter().map(|r| (r.date, r.visit)).collect();
    let mut visits: Vec<VisitSummary> = state
        .visits
        .iter()
        .map(|v| VisitSummary {
            visit: numbers.get(&v.date).copied().unwrap_or(0),
            date: v.date,
            age_m: v.age_m,
            blocked: v.blocked,
            lessons: v.assignments.len(),
            max_slots: v.max_slots,
            minutes: v.total_minutes,
        })
        .collect();
    visits.sort_by(|a, b| a.date.cmp(&b.date));

    let mut overflow = Vec::new();
    let mut skipped = Vec::new();
    for queued in &state.queue {
        if queued.scheduled {
            continue;
        }
        if queued.eligible {
            overflow.push(queued.lesson.code.clone());
        } else {
            skipped.push(queued.lesson.code.clone());
        }
    }

    ScheduleResult {
        total_visits: state.visits.len(),
        used_visits: state.visits.iter().filter(|v| !v.is_empty()).count(),
        rows,
        visits,
        overflow,
        skipped,
    }
}

fn placeholder_row(visit: &Visit, reason: PlaceholderReason) -> ScheduleRow {
    ScheduleRow {
        visit: 0,
        date: visit.date,
        age_m: visit.age_m,
        standard_age_m: None,
        code: String::new(),
        subject: PLACEHOLDER_SUBJECT.to_string(),
        minutes: 0,
        placeholder: true,
        reason: Some(reason.label().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Assignment, QueuedLesson};
    use super::*;
    use crate::catalog::Lesson;
    use crate::eligibility::ParticipantContext;
    use crate::participant::Participant;
    use crate::policy::SchedulePolicy;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn make_state<'a>(
        participant: &'a Participant,
        policy: &'a SchedulePolicy,
        dates: &[NaiveDate],
    ) -> AssignmentState<'a> {
        let visits = dates
            .iter()
            .enumerate()
            .map(|(i, &date)| Visit::new(i, date, participant.birth))
            .collect();
        AssignmentState {
            visits,
            queue: Vec::new(),
            ctx: ParticipantContext::new(participant, 1),
            policy,
            pacing: participant.pacing,
        }
    }

    fn place(state: &mut AssignmentState<'_>, visit: usize, code: &str, minutes: u32) {
        state.visits[visit].add(Assignment {
            lesson: Lesson::new(code, format!("Subject {code}"))
                .with_minutes(minutes)
                .with_window(0.0, 36.0),
            pinned: false,
        });
    }

    #[test]
    fn test_rows_renumber_densely_over_dates() {
        let participant = Participant::new(d(2024, 1, 1), d(2024, 2, 1));
        let policy = SchedulePolicy::default();
        let mut state = make_state(
            &participant,
            &policy,
            &[d(2024, 2, 1), d(2024, 3, 1), d(2024, 4, 1)],
        );
        place(&mut state, 0, "F-1", 20);
        place(&mut state, 1, "F-2", 25);
        place(&mut state, 1, "F-3", 15);
        // Visit 2 stays empty.

        let result = build_result(&state);
        let numbering: Vec<(u32, &str)> = result
            .rows
            .iter()
            .map(|r| (r.visit, r.code.as_str()))
            .collect();
        assert_eq!(
            numbering,
            vec![(1, "F-1"), (2, "F-2"), (2, "F-3"), (3, "")]
        );
        assert_eq!(result.total_visits, 3);
        assert_eq!(result.used_visits, 2);
        assert_eq!(result.scheduled_count(), 3);
    }

    #[test]
    fn test_placeholder_reasons() {
        let participant = Participant::new(d(2024, 1, 1), d(2024, 2, 1));
        let policy = SchedulePolicy::default();
        // Thanksgiving week, open December, plain empty visit.
        let state = make_state(
            &participant,
            &policy,
            &[d(2024, 11, 28), d(2024, 12, 9), d(2025, 1, 6)],
        );

        let result = build_result(&state);
        let reasons: Vec<&str> = result
            .rows
            .iter()
            .map(|r| r.reason.as_deref().unwrap())
            .collect();
        assert_eq!(
            reasons,
            vec![
                "Thanksgiving week holiday break",
                "End-of-year wind-down",
                "Extra visit capacity",
            ]
        );
        assert!(result.rows.iter().all(|r| r.placeholder));
        assert!(result.rows.iter().all(|r| r.subject == PLACEHOLDER_SUBJECT));
        assert_eq!(result.used_visits, 0);
    }

    #[test]
    fn test_diagnostics_split_overflow_from_skipped() {
        let participant = Participant::new(d(2024, 1, 1), d(2024, 2, 1));
        let policy = SchedulePolicy::default();
        let mut state = make_state(&participant, &policy, &[d(2024, 2, 1)]);

        let mut fit = QueuedLesson::new(
            Lesson::new("F-1", "Fit but full").with_foundation(),
            &participant,
        );
        fit.eligible = true;
        let never = QueuedLesson::new(
            Lesson::new("F-9", "Out of range").with_foundation().with_window(30.0, 36.0),
            &participant,
        );
        state.queue = vec![fit, never];

        let result = build_result(&state);
        assert_eq!(result.overflow, vec!["F-1".to_string()]);
        assert_eq!(result.skipped, vec!["F-9".to_string()]);
        assert_eq!(result.unscheduled_count(), 2);
        assert!(!result.is_fully_scheduled());
    }

    #[test]
    fn test_row_serializes_camel_case() {
        let row = ScheduleRow {
            visit: 1,
            date: d(2024, 2, 1),
            age_m: 1,
            standard_age_m: Some(1.0),
            code: "F-1".into(),
            subject: "Welcome".into(),
            minutes: 20,
            placeholder: false,
            reason: None,
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["ageM"], 1);
        assert_eq!(value["standardAgeM"], 1.0);
        assert_eq!(value["date"], "2024-02-01");
        assert!(value.get("reason").is_none());
    }
}
