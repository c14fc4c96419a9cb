//! Lesson eligibility: which lessons matter to a family, and whether a
//! lesson may be delivered at a visit of a given child age.

use crate::catalog::Lesson;
use crate::participant::Participant;
use crate::policy::SchedulePolicy;

/// Per-run participant view shared by the filter and the assignment engine.
///
/// `first_visit_age_m` is the child age at the earliest schedulable visit;
/// it decides whether prenatal foundation content may be caught up after
/// birth.
#[derive(Debug, Clone, Copy)]
pub struct ParticipantContext<'a> {
    pub participant: &'a Participant,
    pub first_visit_age_m: i32,
}

impl<'a> ParticipantContext<'a> {
    pub fn new(participant: &'a Participant, first_visit_age_m: i32) -> Self {
        ParticipantContext {
            participant,
            first_visit_age_m,
        }
    }
}

/// Options for a single pull check.
#[derive(Debug, Clone, Copy, Default)]
pub struct PullOptions {
    /// Skip the age-window checks entirely. Used for topic-selected lessons,
    /// which the family asked for regardless of the child's age.
    pub ignore_age_range: bool,
}

impl PullOptions {
    /// The options the engine uses for this lesson and family.
    pub fn for_lesson(lesson: &Lesson, participant: &Participant) -> Self {
        PullOptions {
            ignore_age_range: is_optional(lesson, participant),
        }
    }
}

/// True when the lesson belongs in this family's pool at all.
pub fn is_relevant(lesson: &Lesson, participant: &Participant) -> bool {
    if lesson.foundation {
        return true;
    }
    if participant.first_time_parent && lesson.first_time_parent {
        return true;
    }
    if participant.pregnant && lesson.pregnant {
        return true;
    }
    participant.topics.matches_lesson(lesson)
}

/// True when the lesson is relevant only because of a topic selection.
/// Optional lessons ignore age windows but are deprioritized in scoring.
pub fn is_optional(lesson: &Lesson, participant: &Participant) -> bool {
    !lesson.foundation
        && !(participant.first_time_parent && lesson.first_time_parent)
        && !(participant.pregnant && lesson.pregnant)
        && participant.topics.matches_lesson(lesson)
}

/// Earliest age, in months, at which the lesson may be pulled.
///
/// Post-birth windows stretch back by the standard tolerance but never past
/// birth. Prenatal windows stretch back by the prenatal tolerance, plus a
/// share of the window's own span when the lesson is entirely prenatal.
pub fn effective_lower_bound(lesson: &Lesson, policy: &SchedulePolicy) -> f64 {
    let (start, end) = lesson.age_window();
    if start >= 0.0 {
        (start - policy.age_tolerance_months).max(0.0)
    } else {
        let span_allowance = if end <= 0.0 {
            policy.prenatal_span_allowance * (end - start)
        } else {
            0.0
        };
        start - policy.prenatal_tolerance_months - span_allowance
    }
}

/// Whether the lesson may be delivered at a visit where the child is
/// `visit_age_m` months old.
pub fn should_pull(
    lesson: &Lesson,
    ctx: &ParticipantContext,
    visit_age_m: i32,
    opts: PullOptions,
    policy: &SchedulePolicy,
) -> bool {
    if !is_relevant(lesson, ctx.participant) {
        return false;
    }

    let (start, end) = lesson.age_window();

    // Prenatal-start content is off the table for non-pregnant families,
    // except foundation lessons that span into the postnatal range: those
    // catch up at any post-birth visit when the schedule starts after birth.
    if !ctx.participant.pregnant && start < 0.0 && !is_foundation_catch_up(lesson, ctx) {
        return false;
    }

    if opts.ignore_age_range {
        return true;
    }

    let age = visit_age_m as f64;
    if age > end {
        return false;
    }
    age >= effective_lower_bound(lesson, policy)
}

fn is_foundation_catch_up(lesson: &Lesson, ctx: &ParticipantContext) -> bool {
    let (start, end) = lesson.age_window();
    lesson.foundation && start < 0.0 && end > 0.0 && ctx.first_visit_age_m >= 0
}

/// Narrow the catalog to this family's queue: drop completed codes, keep
/// relevant lessons, order by window start.
pub fn filter_lessons(catalog: &[Lesson], participant: &Participant) -> Vec<Lesson> {
    let completed = participant.completed_set();
    let mut lessons: Vec<Lesson> = catalog
        .iter()
        .filter(|l| !completed.contains(l.code.trim()))
        .filter(|l| is_relevant(l, participant))
        .cloned()
        .collect();
    // Stable sort keeps catalog order within the same window start.
    lessons.sort_by(|a, b| a.age_window().0.total_cmp(&b.age_window().0));
    lessons
}
