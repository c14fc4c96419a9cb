//! Assignment engine: lays the lesson queue onto the visit sequence.
//!
//! The engine runs a fixed pipeline over mutable visit state:
//!
//! 1. Build visit slots from the generated dates (blackout dates are blocked)
//! 2. Mark which lessons are eligible anywhere, for diagnostics
//! 3. Pin the final transition lesson to the last visit that accepts it
//! 4. Pre-expand capacity when lessons outnumber open slots
//! 5. Greedy score-based assignment of the remaining queue
//! 6. Repair passes that smooth coverage (see [`repair`])
//! 7. Row construction, chronological renumbering, diagnostics
//!
//! Every step is deterministic; ties are always broken by explicit
//! comparators ending in the visit index.

mod repair;
mod rows;
mod scoring;

pub use rows::{
    PlaceholderReason, ScheduleResult, ScheduleRow, VisitSummary, PLACEHOLDER_SUBJECT,
};

use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::calendar::{blackout_for, months_between, Blackout};
use crate::catalog::Lesson;
use crate::eligibility::{
    filter_lessons, is_optional, should_pull, ParticipantContext, PullOptions,
};
use crate::pacing::visits_for;
use crate::participant::{Pacing, Participant};
use crate::policy::SchedulePolicy;

/// One lesson placed on a visit.
#[derive(Debug, Clone)]
pub(crate) struct Assignment {
    pub lesson: Lesson,
    /// Pinned assignments are never moved by repair passes.
    pub pinned: bool,
}

/// Mutable per-visit state during assignment.
#[derive(Debug, Clone)]
pub(crate) struct Visit {
    pub index: usize,
    pub date: NaiveDate,
    pub age_m: i32,
    pub assignments: Vec<Assignment>,
    pub total_minutes: u32,
    pub max_slots: usize,
    pub auto_increases: usize,
    pub blocked: bool,
    pub blackout: Option<Blackout>,
}

impl Visit {
    fn new(index: usize, date: NaiveDate, birth: NaiveDate) -> Self {
        let blackout = blackout_for(date);
        Visit {
            index,
            date,
            age_m: months_between(birth, date),
            assignments: Vec::new(),
            total_minutes: 0,
            max_slots: 1,
            auto_increases: 0,
            blocked: blackout.is_some(),
            blackout,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.assignments.len() >= self.max_slots
    }

    pub fn has_spare_slot(&self) -> bool {
        !self.blocked && !self.is_full()
    }

    fn add(&mut self, assignment: Assignment) {
        self.total_minutes += assignment.lesson.minutes;
        self.assignments.push(assignment);
    }

    fn take(&mut self, at: usize) -> Assignment {
        let assignment = self.assignments.remove(at);
        self.total_minutes = self.total_minutes.saturating_sub(assignment.lesson.minutes);
        assignment
    }
}

/// A lesson waiting for a visit, with its per-run bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct QueuedLesson {
    pub lesson: Lesson,
    pub optional: bool,
    /// Whether any non-blocked visit would accept this lesson at all.
    pub eligible: bool,
    pub scheduled: bool,
}

impl QueuedLesson {
    fn new(lesson: Lesson, participant: &Participant) -> Self {
        let optional = is_optional(&lesson, participant);
        QueuedLesson {
            lesson,
            optional,
            eligible: false,
            scheduled: false,
        }
    }

    pub fn opts(&self) -> PullOptions {
        PullOptions {
            ignore_age_range: self.optional,
        }
    }
}

/// Working state shared by the assignment phases and repair passes.
pub(crate) struct AssignmentState<'a> {
    pub visits: Vec<Visit>,
    pub queue: Vec<QueuedLesson>,
    pub ctx: ParticipantContext<'a>,
    pub policy: &'a SchedulePolicy,
    pub pacing: Pacing,
}

impl<'a> AssignmentState<'a> {
    pub fn accepts(&self, visit_index: usize, queued: &QueuedLesson) -> bool {
        let visit = &self.visits[visit_index];
        !visit.blocked
            && should_pull(
                &queued.lesson,
                &self.ctx,
                visit.age_m,
                queued.opts(),
                self.policy,
            )
    }

    /// Indices of non-blocked visits, in date order.
    pub fn open_indices(&self) -> Vec<usize> {
        self.visits
            .iter()
            .filter(|v| !v.blocked)
            .map(|v| v.index)
            .collect()
    }

    /// Fill `target` with an unscheduled lesson, or failing that, relocate
    /// one from the heaviest donor visit.
    pub fn try_fill(&mut self, target: usize) -> bool {
        self.try_fill_from(target, |_| true)
    }

    /// As [`try_fill`], with a donor restriction.
    ///
    /// [`try_fill`]: AssignmentState::try_fill
    pub fn try_fill_from<F>(&mut self, target: usize, donor_ok: F) -> bool
    where
        F: Fn(&Visit) -> bool,
    {
        if !self.visits[target].has_spare_slot() {
            return false;
        }

        // Prefer lessons that never got a visit; the queue is already in
        // target-age order.
        if let Some(qi) = (0..self.queue.len())
            .find(|&i| !self.queue[i].scheduled && self.accepts(target, &self.queue[i]))
        {
            let lesson = self.queue[qi].lesson.clone();
            self.queue[qi].scheduled = true;
            self.visits[target].add(Assignment {
                lesson,
                pinned: false,
            });
            return true;
        }

        // Otherwise relocate from a loaded visit. Donors keep at least one
        // assignment, never give up a pinned lesson, and are tried heaviest
        // first (most assignments, most minutes, later in the schedule).
        let mut donors: Vec<usize> = self
            .visits
            .iter()
            .filter(|v| {
                v.index != target && !v.blocked && v.assignments.len() >= 2 && donor_ok(v)
            })
            .map(|v| v.index)
            .collect();
        donors.sort_by(|&a, &b| {
            let (va, vb) = (&self.visits[a], &self.visits[b]);
            vb.assignments
                .len()
                .cmp(&va.assignments.len())
                .then(vb.total_minutes.cmp(&va.total_minutes))
                .then(b.cmp(&a))
        });

        for donor in donors {
            let target_age = self.visits[target].age_m;
            let movable = self.visits[donor]
                .assignments
                .iter()
                .enumerate()
                .rev()
                .find(|(_, a)| {
                    !a.pinned
                        && should_pull(
                            &a.lesson,
                            &self.ctx,
                            target_age,
                            PullOptions::for_lesson(&a.lesson, self.ctx.participant),
                            self.policy,
                        )
                })
                .map(|(i, _)| i);
            if let Some(ai) = movable {
                let assignment = self.visits[donor].take(ai);
                self.visits[target].add(assignment);
                return true;
            }
        }
        false
    }

    fn mark_eligibility(&mut self) {
        let open = self.open_indices();
        for qi in 0..self.queue.len() {
            self.queue[qi].eligible = open.iter().any(|&vi| self.accepts(vi, &self.queue[qi]));
        }
    }

    fn pin_final_lesson(&mut self) {
        let code = self.policy.final_lesson_code.trim();
        if code.is_empty() {
            return;
        }
        let Some(qi) = self.queue.iter().position(|q| q.lesson.code == code) else {
            return;
        };

        let placement = self
            .visits
            .iter()
            .rev()
            .find(|v| v.has_spare_slot() && self.accepts(v.index, &self.queue[qi]))
            .map(|v| v.index);

        if let Some(vi) = placement {
            let mut queued = self.queue.remove(qi);
            queued.scheduled = true;
            debug!(code = %queued.lesson.code, visit = vi, "pinned final lesson");
            self.visits[vi].add(Assignment {
                lesson: queued.lesson,
                pinned: true,
            });
        }
        // Unplaceable: it stays queued and surfaces in diagnostics.
    }

    fn sort_queue_by_target_age(&mut self) {
        self.queue
            .sort_by(|a, b| a.lesson.target_age().total_cmp(&b.lesson.target_age()));
    }

    fn expand_for_shortage(&mut self) {
        let pending = self.queue.iter().filter(|q| !q.scheduled).count();
        let mut capacity: usize = self
            .visits
            .iter()
            .filter(|v| !v.blocked)
            .map(|v| v.max_slots - v.assignments.len().min(v.max_slots))
            .sum();

        while pending > capacity {
            let grown = self
                .visits
                .iter_mut()
                .filter(|v| !v.blocked && v.auto_increases < self.policy.max_auto_increases)
                .min_by(|a, b| {
                    a.max_slots
                        .cmp(&b.max_slots)
                        .then(a.auto_increases.cmp(&b.auto_increases))
                        .then(a.index.cmp(&b.index))
                });
            match grown {
                Some(v) => {
                    v.max_slots += 1;
                    v.auto_increases += 1;
                    capacity += 1;
                }
                None => break,
            }
        }
    }

    fn assign_greedy(&mut self) {
        for qi in 0..self.queue.len() {
            if self.queue[qi].scheduled {
                continue;
            }
            let Some(placement) =
                scoring::select_visit(&self.visits, &self.queue[qi], &self.ctx, self.policy)
            else {
                continue;
            };

            let visit = &mut self.visits[placement.visit_index];
            if placement.expands {
                visit.max_slots += 1;
                visit.auto_increases += 1;
            }
            let lesson = self.queue[qi].lesson.clone();
            self.queue[qi].scheduled = true;
            visit.add(Assignment {
                lesson,
                pinned: false,
            });
        }
    }
}

/// Greedy lesson-to-visit scheduler.
pub struct ScheduleEngine {
    policy: SchedulePolicy,
}

impl ScheduleEngine {
    pub fn new() -> Self {
        ScheduleEngine {
            policy: SchedulePolicy::default(),
        }
    }

    pub fn with_policy(policy: SchedulePolicy) -> Self {
        ScheduleEngine { policy }
    }

    /// Generate visit dates, filter the catalog, and assign: the whole
    /// pipeline for one participant.
    pub fn build_schedule(&self, participant: &Participant, catalog: &[Lesson]) -> ScheduleResult {
        let dates = visits_for(participant);
        let queue = filter_lessons(catalog, participant);
        self.assign(participant, &dates, queue)
    }

    /// Assign an already-filtered lesson queue onto the given visit dates.
    #[instrument(skip_all, fields(visits = dates.len(), lessons = queue.len()))]
    pub fn assign(
        &self,
        participant: &Participant,
        dates: &[NaiveDate],
        queue: Vec<Lesson>,
    ) -> ScheduleResult {
        // 1. Visit slots; blackout dates are blocked up front.
        let visits: Vec<Visit> = dates
            .iter()
            .enumerate()
            .map(|(i, &date)| Visit::new(i, date, participant.birth))
            .collect();

        let first_visit_age_m = visits
            .iter()
            .find(|v| !v.blocked)
            .or_else(|| visits.first())
            .map(|v| v.age_m)
            .unwrap_or_else(|| months_between(participant.birth, participant.first_visit));

        let queue: Vec<QueuedLesson> = queue
            .into_iter()
            .map(|lesson| QueuedLesson::new(lesson, participant))
            .collect();

        let mut state = AssignmentState {
            visits,
            queue,
            ctx: ParticipantContext::new(participant, first_visit_age_m),
            policy: &self.policy,
            pacing: participant.pacing,
        };

        // 2-5. Eligibility, pinning, capacity, greedy placement.
        state.mark_eligibility();
        state.pin_final_lesson();
        state.sort_queue_by_target_age();
        state.expand_for_shortage();
        state.assign_greedy();
        debug!(
            assigned = state.queue.iter().filter(|q| q.scheduled).count(),
            "primary assignment done"
        );

        // 6. Coverage repair.
        repair::run_passes(&mut state);

        // 7-8. Rows and diagnostics.
        rows::build_result(&state)
    }
}

impl Default for ScheduleEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a schedule with the default policy.
pub fn build_schedule(participant: &Participant, catalog: &[Lesson]) -> ScheduleResult {
    ScheduleEngine::new().build_schedule(participant, catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::ScheduleDuration;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn make_participant() -> Participant {
        Participant::new(d(2024, 1, 1), d(2024, 2, 1))
    }

    fn make_catalog(n: usize) -> Vec<Lesson> {
        (0..n)
            .map(|i| {
                Lesson::new(format!("F-{i}"), format!("Foundation lesson {i}"))
                    .with_foundation()
                    .with_minutes(20)
                    .with_window(i as f64, i as f64 + 6.0)
            })
            .collect()
    }

    #[test]
    fn test_empty_visit_list_yields_empty_rows_and_skips() {
        let participant = make_participant();
        let engine = ScheduleEngine::new();
        let result = engine.assign(&participant, &[], make_catalog(3));
        assert!(result.rows.is_empty());
        assert_eq!(result.total_visits, 0);
        assert_eq!(result.skipped.len(), 3);
        assert!(result.overflow.is_empty());
    }

    #[test]
    fn test_every_lesson_lands_once() {
        let participant = make_participant()
            .with_duration(ScheduleDuration::TwelveMonths);
        let result = build_schedule(&participant, &make_catalog(6));

        let mut codes: Vec<&str> = result
            .rows
            .iter()
            .filter(|r| !r.placeholder)
            .map(|r| r.code.as_str())
            .collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 6);
        assert!(result.overflow.is_empty());
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_determinism() {
        let participant = make_participant().with_first_time_parent(true);
        let catalog = make_catalog(10);
        let a = build_schedule(&participant, &catalog);
        let b = build_schedule(&participant, &catalog);
        assert_eq!(a, b);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        // Many more lessons than visits forces expansion; the slot invariant
        // must still hold.
        let participant = make_participant().with_duration(ScheduleDuration::SixMonths);
        let catalog: Vec<Lesson> = (0..30)
            .map(|i| {
                Lesson::new(format!("F-{i}"), "Wide window")
                    .with_foundation()
                    .with_minutes(15)
                    .with_window(0.0, 36.0)
            })
            .collect();
        let result = build_schedule(&participant, &catalog);

        for summary in &result.visits {
            assert!(summary.lessons <= summary.max_slots, "{summary:?}");
        }
    }

    #[test]
    fn test_overflow_reported_when_out_of_room() {
        let participant = Participant::new(d(2024, 1, 1), d(2024, 2, 1))
            .with_defined_interval(crate::participant::DefinedInterval::Bimonthly)
            .with_duration(ScheduleDuration::SixMonths);
        // Few visits, tiny windows, far more lessons than slots can grow to.
        let catalog: Vec<Lesson> = (0..24)
            .map(|i| {
                Lesson::new(format!("F-{i}"), "Early content")
                    .with_foundation()
                    .with_window(0.0, 36.0)
            })
            .collect();
        let result = build_schedule(&participant, &catalog);

        assert!(!result.overflow.is_empty());
        assert!(result.skipped.is_empty());
        let placed = result.rows.iter().filter(|r| !r.placeholder).count();
        assert_eq!(placed + result.overflow.len(), 24);
    }

    #[test]
    fn test_blocked_only_eligibility_goes_to_skipped() {
        let participant = make_participant();
        // One visit, on a blackout date: Thanksgiving week 2024 starts Nov 24.
        let dates = vec![d(2024, 11, 28)];
        let engine = ScheduleEngine::new();
        let result = engine.assign(
            &participant,
            &dates,
            vec![Lesson::new("F-1", "Welcome").with_foundation()],
        );

        assert_eq!(result.skipped, vec!["F-1".to_string()]);
        assert_eq!(result.used_visits, 0);
        assert!(result.rows.iter().all(|r| r.placeholder));
    }

    #[test]
    fn test_final_lesson_pinned_to_last_accepting_visit() {
        let participant = make_participant().with_duration(ScheduleDuration::TwelveMonths);
        let mut catalog = make_catalog(4);
        catalog.push(
            Lesson::new("TR-1", "Transition out of the program")
                .with_foundation()
                .with_window(0.0, 36.0),
        );
        let result = build_schedule(&participant, &catalog);

        let final_rows: Vec<&ScheduleRow> = result
            .rows
            .iter()
            .filter(|r| r.code == "TR-1")
            .collect();
        assert_eq!(final_rows.len(), 1);
        let last_lesson_date = result
            .rows
            .iter()
            .filter(|r| !r.placeholder)
            .map(|r| r.date)
            .max()
            .unwrap();
        assert_eq!(final_rows[0].date, last_lesson_date);
    }

    #[test]
    fn test_shortage_expansion_spreads_slots() {
        let participant = make_participant()
            .with_defined_interval(crate::participant::DefinedInterval::Monthly)
            .with_duration(ScheduleDuration::SixMonths);
        // 7 visits, 10 lessons: several visits must take a second slot.
        let result = build_schedule(&participant, &make_catalog(10));

        let expanded = result.visits.iter().filter(|v| v.max_slots > 1).count();
        assert!(expanded >= 4, "expanded {expanded} visits: {:?}", result.visits);
        assert!(result.overflow.is_empty());
    }
}
