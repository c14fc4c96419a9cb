//! Repair passes that smooth the schedule after greedy assignment.
//!
//! Greedy placement optimizes one lesson at a time, which can leave the
//! overall calendar lumpy: early visits with nothing on them, long empty
//! stretches, or a December with no content before the holiday blackout.
//! Each pass below fixes one such shape problem by pulling unscheduled
//! lessons first and relocating from heavily loaded visits second. Passes
//! run in a fixed order and never touch pinned assignments or blocked
//! visits.

use std::collections::HashSet;

use chrono::Datelike;
use tracing::debug;

use crate::participant::Pacing;

use super::AssignmentState;

/// Last day of December still expected to carry a lesson.
const DECEMBER_WINDOW_DAY: u32 = 14;

pub(crate) trait RepairPass {
    fn name(&self) -> &'static str;
    fn run(&self, state: &mut AssignmentState<'_>);
}

pub(crate) fn run_passes(state: &mut AssignmentState<'_>) {
    let passes: [&dyn RepairPass; 6] = [
        &FillEarlyVisits,
        &DistributeExcess,
        &NoConsecutiveEmpty,
        &DefinedSpacing,
        &CloseInterval,
        &DecemberGuarantee,
    ];
    for pass in passes {
        pass.run(state);
        debug!(pass = pass.name(), "repair pass complete");
    }
}

/// The first visits carry the program introduction; none of them should be
/// empty while lessons remain unplaced.
struct FillEarlyVisits;

impl RepairPass for FillEarlyVisits {
    fn name(&self) -> &'static str {
        "fill_early_visits"
    }

    fn run(&self, state: &mut AssignmentState<'_>) {
        let targets: Vec<usize> = state
            .open_indices()
            .into_iter()
            .take(state.policy.early_fill_count)
            .collect();
        for idx in targets {
            if state.visits[idx].is_empty() {
                state.try_fill(idx);
            }
        }
    }
}

/// Spread unavoidable empty visits evenly across the rest of the schedule
/// instead of letting them clump.
///
/// The tail after the early-fill prefix earns one designated open visit per
/// `stride`; every other empty visit gets filled when material is available.
struct DistributeExcess;

impl RepairPass for DistributeExcess {
    fn name(&self) -> &'static str {
        "distribute_excess"
    }

    fn run(&self, state: &mut AssignmentState<'_>) {
        let order = state.open_indices();
        let prefix = state.policy.early_fill_count.min(order.len());
        let tail = &order[prefix..];
        if tail.is_empty() {
            return;
        }
        let empties: Vec<usize> = tail
            .iter()
            .copied()
            .filter(|&i| state.visits[i].is_empty())
            .collect();
        if empties.is_empty() {
            return;
        }

        let stride = (tail.len() / empties.len()).max(1);
        let mut keep_open = HashSet::new();
        let mut pos = stride - 1;
        while pos < tail.len() {
            keep_open.insert(tail[pos]);
            pos += stride;
        }

        for idx in empties {
            if !keep_open.contains(&idx) {
                state.try_fill(idx);
            }
        }
    }
}

/// Standard pacing promises a lesson at least every other visit.
struct NoConsecutiveEmpty;

impl RepairPass for NoConsecutiveEmpty {
    fn name(&self) -> &'static str {
        "no_consecutive_empty"
    }

    fn run(&self, state: &mut AssignmentState<'_>) {
        if state.pacing != Pacing::Standard {
            return;
        }
        let order = state.open_indices();
        for pair in order.windows(2) {
            if state.visits[pair[0]].is_empty() && state.visits[pair[1]].is_empty() {
                state.try_fill(pair[0]);
            }
        }
    }
}

/// Defined-interval schedules tolerate single gaps but not blackout-adjacent
/// ones, and never more than two empty visits in a row.
struct DefinedSpacing;

impl RepairPass for DefinedSpacing {
    fn name(&self) -> &'static str {
        "defined_spacing"
    }

    fn run(&self, state: &mut AssignmentState<'_>) {
        if state.pacing != Pacing::Defined {
            return;
        }

        // An empty visit next to a blocked one reads as a month-long hole in
        // the family's calendar; fill those first.
        let next_to_blocked: Vec<usize> = state
            .visits
            .iter()
            .filter(|v| !v.blocked && v.is_empty())
            .filter(|v| {
                let before = v.index.checked_sub(1).map(|i| state.visits[i].blocked);
                let after = state.visits.get(v.index + 1).map(|n| n.blocked);
                before == Some(true) || after == Some(true)
            })
            .map(|v| v.index)
            .collect();
        for idx in next_to_blocked {
            state.try_fill(idx);
        }

        // Break up runs of three or more empties at the middle.
        let order = state.open_indices();
        for trio in order.windows(3) {
            if trio.iter().all(|&i| state.visits[i].is_empty()) {
                state.try_fill(trio[1]);
            }
        }
    }
}

/// Two empty visits close together waste a trip; standard pacing fills the
/// first of any such pair.
struct CloseInterval;

impl RepairPass for CloseInterval {
    fn name(&self) -> &'static str {
        "close_interval"
    }

    fn run(&self, state: &mut AssignmentState<'_>) {
        if state.pacing != Pacing::Standard {
            return;
        }
        let order = state.open_indices();
        for pair in order.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if !state.visits[a].is_empty() || !state.visits[b].is_empty() {
                continue;
            }
            let gap = (state.visits[b].date - state.visits[a].date).num_days();
            if gap <= state.policy.close_interval_days {
                state.try_fill(a);
            }
        }
    }
}

/// Every year should see at least one lesson in early December, before the
/// holiday blackout empties the calendar.
struct DecemberGuarantee;

impl RepairPass for DecemberGuarantee {
    fn name(&self) -> &'static str {
        "december_guarantee"
    }

    fn run(&self, state: &mut AssignmentState<'_>) {
        let mut years: Vec<i32> = state
            .visits
            .iter()
            .filter(|v| in_december_window(v))
            .map(|v| v.date.year())
            .collect();
        years.sort_unstable();
        years.dedup();

        for year in years {
            let window: Vec<usize> = state
                .visits
                .iter()
                .filter(|v| in_december_window(v) && v.date.year() == year)
                .map(|v| v.index)
                .collect();
            if window.iter().any(|&i| !state.visits[i].is_empty()) {
                continue;
            }
            for idx in window {
                // Donations come from outside December so the guarantee
                // cannot rob one window to feed another.
                if state.try_fill_from(idx, |donor| donor.date.month() != 12) {
                    break;
                }
            }
        }
    }
}

fn in_december_window(visit: &super::Visit) -> bool {
    !visit.blocked && visit.date.month() == 12 && visit.date.day() <= DECEMBER_WINDOW_DAY
}

#[cfg(test)]
mod tests {
    use super::super::{Assignment, QueuedLesson, Visit};
    use super::*;
    use crate::catalog::Lesson;
    use crate::eligibility::ParticipantContext;
    use crate::participant::{DefinedInterval, Participant};
    use crate::policy::SchedulePolicy;
    use chrono::NaiveDate;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn wide_lesson(code: &str) -> Lesson {
        Lesson::new(code, "Foundation content")
            .with_foundation()
            .with_minutes(20)
            .with_window(0.0, 36.0)
    }

    fn make_state<'a>(
        participant: &'a Participant,
        policy: &'a SchedulePolicy,
        dates: &[NaiveDate],
        queue: Vec<Lesson>,
    ) -> AssignmentState<'a> {
        let visits = dates
            .iter()
            .enumerate()
            .map(|(i, &date)| Visit::new(i, date, participant.birth))
            .collect();
        let queue = queue
            .into_iter()
            .map(|lesson| QueuedLesson::new(lesson, participant))
            .collect();
        AssignmentState {
            visits,
            queue,
            ctx: ParticipantContext::new(participant, 1),
            policy,
            pacing: participant.pacing,
        }
    }

    fn schedule_all(state: &mut AssignmentState<'_>, placements: &[(usize, &str)]) {
        for &(visit, code) in placements {
            let qi = state
                .queue
                .iter()
                .position(|q| q.lesson.code == code)
                .unwrap();
            state.queue[qi].scheduled = true;
            let lesson = state.queue[qi].lesson.clone();
            state.visits[visit].add(Assignment {
                lesson,
                pinned: false,
            });
        }
    }

    #[test]
    fn test_try_fill_pulls_unscheduled_first() {
        let participant = Participant::new(d(2024, 1, 1), d(2024, 2, 1));
        let policy = SchedulePolicy::default();
        let mut state = make_state(
            &participant,
            &policy,
            &[d(2024, 2, 1), d(2024, 3, 1)],
            vec![wide_lesson("F-1")],
        );

        assert!(state.try_fill(0));
        assert!(state.queue[0].scheduled);
        assert_eq!(state.visits[0].assignments[0].lesson.code, "F-1");
        // Nothing left to pull and no donor, so the second fill fails.
        assert!(!state.try_fill(1));
    }

    #[test]
    fn test_try_fill_relocates_from_heaviest_donor() {
        let participant = Participant::new(d(2024, 1, 1), d(2024, 2, 1));
        let policy = SchedulePolicy::default();
        let mut state = make_state(
            &participant,
            &policy,
            &[d(2024, 2, 1), d(2024, 3, 1)],
            vec![wide_lesson("F-1"), wide_lesson("F-2"), wide_lesson("F-3")],
        );
        state.visits[0].max_slots = 3;
        schedule_all(&mut state, &[(0, "F-1"), (0, "F-2"), (0, "F-3")]);
        // The newest assignment on the donor is pinned and must stay put.
        state.visits[0].assignments[2].pinned = true;

        assert!(state.try_fill(1));
        // Scan runs from the end, so F-2 (last movable) relocates.
        assert_eq!(state.visits[1].assignments[0].lesson.code, "F-2");
        let donor_codes: Vec<&str> = state.visits[0]
            .assignments
            .iter()
            .map(|a| a.lesson.code.as_str())
            .collect();
        assert_eq!(donor_codes, vec!["F-1", "F-3"]);
        assert_eq!(state.visits[0].total_minutes, 40);
        assert_eq!(state.visits[1].total_minutes, 20);
    }

    #[test]
    fn test_try_fill_never_drains_a_visit() {
        let participant = Participant::new(d(2024, 1, 1), d(2024, 2, 1));
        let policy = SchedulePolicy::default();
        let mut state = make_state(
            &participant,
            &policy,
            &[d(2024, 2, 1), d(2024, 3, 1)],
            vec![wide_lesson("F-1")],
        );
        schedule_all(&mut state, &[(0, "F-1")]);

        // Single-lesson visits never donate.
        assert!(!state.try_fill(1));
        assert_eq!(state.visits[0].assignments.len(), 1);
    }

    #[test]
    fn test_fill_early_visits() {
        let participant = Participant::new(d(2024, 1, 1), d(2024, 2, 1));
        let policy = SchedulePolicy::default();
        let dates: Vec<NaiveDate> =
            (0..8).map(|i| d(2024, 2, 1) + chrono::Duration::days(i * 7)).collect();
        let mut state = make_state(
            &participant,
            &policy,
            &dates,
            vec![wide_lesson("F-1"), wide_lesson("F-2")],
        );

        FillEarlyVisits.run(&mut state);
        assert!(!state.visits[0].is_empty());
        assert!(!state.visits[1].is_empty());
        assert!(state.visits[2].is_empty());
    }

    #[test]
    fn test_no_consecutive_empty_standard_only() {
        let participant = Participant::new(d(2024, 1, 1), d(2024, 2, 1));
        let policy = SchedulePolicy::default();
        let dates = [d(2024, 2, 1), d(2024, 3, 1), d(2024, 4, 1)];
        let mut state = make_state(
            &participant,
            &policy,
            &dates,
            vec![wide_lesson("F-1"), wide_lesson("F-2")],
        );
        schedule_all(&mut state, &[(0, "F-1")]);

        NoConsecutiveEmpty.run(&mut state);
        assert!(!state.visits[1].is_empty());

        // Defined pacing leaves the gap alone.
        let defined = Participant::new(d(2024, 1, 1), d(2024, 2, 1))
            .with_defined_interval(DefinedInterval::Monthly);
        let mut state = make_state(
            &defined,
            &policy,
            &dates,
            vec![wide_lesson("F-1"), wide_lesson("F-2")],
        );
        schedule_all(&mut state, &[(0, "F-1")]);
        NoConsecutiveEmpty.run(&mut state);
        assert!(state.visits[1].is_empty());
    }

    #[test]
    fn test_defined_spacing_fills_next_to_blackout() {
        let participant = Participant::new(d(2024, 1, 1), d(2024, 10, 28))
            .with_defined_interval(DefinedInterval::Monthly);
        let policy = SchedulePolicy::default();
        // Nov 27 falls in Thanksgiving week 2024 and arrives blocked.
        let dates = [d(2024, 10, 28), d(2024, 11, 27), d(2024, 12, 10)];
        let mut state = make_state(&participant, &policy, &dates, vec![wide_lesson("F-1")]);
        assert!(state.visits[1].blocked);

        DefinedSpacing.run(&mut state);
        // The first blackout neighbor in index order takes the lesson.
        assert!(!state.visits[0].is_empty());
        assert!(state.visits[2].is_empty());
    }

    #[test]
    fn test_defined_spacing_breaks_long_runs() {
        let participant = Participant::new(d(2024, 1, 1), d(2024, 2, 1))
            .with_defined_interval(DefinedInterval::Monthly);
        let policy = SchedulePolicy::default();
        let dates = [d(2024, 2, 1), d(2024, 3, 2), d(2024, 4, 1), d(2024, 5, 1)];
        let mut state = make_state(
            &participant,
            &policy,
            &dates,
            vec![wide_lesson("F-1"), wide_lesson("F-2")],
        );
        schedule_all(&mut state, &[(0, "F-1")]);

        DefinedSpacing.run(&mut state);
        // Run of three empties (1, 2, 3) gets its middle filled.
        assert!(state.visits[1].is_empty());
        assert!(!state.visits[2].is_empty());
        assert!(state.visits[3].is_empty());
    }

    #[test]
    fn test_close_interval_fills_tight_pairs() {
        let participant = Participant::new(d(2024, 1, 1), d(2024, 2, 1));
        let policy = SchedulePolicy::default();
        let mut state = make_state(
            &participant,
            &policy,
            &[d(2024, 6, 3), d(2024, 6, 10)],
            vec![wide_lesson("F-1")],
        );
        CloseInterval.run(&mut state);
        assert!(!state.visits[0].is_empty());

        // A three-week gap is a real break, not a wasted trip.
        let mut state = make_state(
            &participant,
            &policy,
            &[d(2024, 6, 3), d(2024, 6, 24)],
            vec![wide_lesson("F-1")],
        );
        CloseInterval.run(&mut state);
        assert!(state.visits[0].is_empty());
    }

    #[test]
    fn test_close_interval_inclusive_at_threshold() {
        let participant = Participant::new(d(2024, 1, 1), d(2024, 2, 1));
        let policy = SchedulePolicy::default();
        // June 3 to June 17 is exactly close_interval_days apart.
        let mut state = make_state(
            &participant,
            &policy,
            &[d(2024, 6, 3), d(2024, 6, 17)],
            vec![wide_lesson("F-1")],
        );
        assert_eq!(policy.close_interval_days, 14);

        CloseInterval.run(&mut state);
        assert!(!state.visits[0].is_empty());
        assert!(state.visits[1].is_empty());
    }

    #[test]
    fn test_december_guarantee_pulls_from_outside_december() {
        let participant = Participant::new(d(2024, 1, 1), d(2024, 11, 4));
        let policy = SchedulePolicy::default();
        let dates = [d(2024, 11, 4), d(2024, 12, 9), d(2024, 12, 23)];
        let mut state = make_state(
            &participant,
            &policy,
            &dates,
            vec![wide_lesson("F-1"), wide_lesson("F-2")],
        );
        assert!(state.visits[2].blocked);
        state.visits[0].max_slots = 2;
        schedule_all(&mut state, &[(0, "F-1"), (0, "F-2")]);

        DecemberGuarantee.run(&mut state);
        assert_eq!(state.visits[1].assignments.len(), 1);
        assert_eq!(state.visits[0].assignments.len(), 1);
    }

    #[test]
    fn test_december_guarantee_satisfied_window_untouched() {
        let participant = Participant::new(d(2024, 1, 1), d(2024, 11, 4));
        let policy = SchedulePolicy::default();
        let dates = [d(2024, 11, 4), d(2024, 12, 9)];
        let mut state = make_state(
            &participant,
            &policy,
            &dates,
            vec![wide_lesson("F-1"), wide_lesson("F-2")],
        );
        state.visits[0].max_slots = 2;
        schedule_all(&mut state, &[(0, "F-1"), (1, "F-2")]);

        DecemberGuarantee.run(&mut state);
        assert_eq!(state.visits[0].assignments.len(), 1);
        assert_eq!(state.visits[1].assignments.len(), 1);
    }
}
