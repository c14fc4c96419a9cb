//! Visit scoring for the greedy assignment phase.
//!
//! Raw score measures how far a visit sits from a lesson's target age;
//! weighted score layers visit load on top so lessons spread out instead of
//! stacking on the single best date. Lower is better everywhere.

use std::cmp::Ordering;

use crate::catalog::Lesson;
use crate::eligibility::{should_pull, ParticipantContext};
use crate::policy::SchedulePolicy;

use super::{QueuedLesson, Visit};

/// Age fit of one lesson on one visit, before load is considered.
///
/// Distance from target counts once inside the tolerance band and twice
/// beyond it. Landing earlier than the tolerance-adjusted window start draws
/// a steep penalty, except when prenatal content meets a prenatal visit;
/// there, earlier delivery is useful and earns a small discount instead.
pub(crate) fn raw_score(lesson: &Lesson, visit_age_m: i32, policy: &SchedulePolicy) -> f64 {
    let (start, _) = lesson.age_window();
    let target = lesson.target_age();
    let age = f64::from(visit_age_m);

    let diff = (age - target).abs();
    let mut score = diff;
    if diff > policy.age_tolerance_months {
        score += diff - policy.age_tolerance_months;
    }

    if start < 0.0 && age < 0.0 {
        score -= policy.prenatal_early_bonus * (target - age).max(0.0);
    } else {
        let adjusted_start = start - policy.age_tolerance_months;
        if age < adjusted_start {
            score += policy.early_penalty_factor * (adjusted_start - age);
        }
    }
    score
}

/// Raw score plus load pressure for the visit as it currently stands.
/// Crossing the visit minute budget costs as much as one extra lesson.
pub(crate) fn weighted_score(
    raw: f64,
    visit: &Visit,
    lesson: &Lesson,
    optional: bool,
    policy: &SchedulePolicy,
) -> f64 {
    let count = visit.assignments.len() as f64;
    let projected = f64::from(visit.total_minutes + lesson.minutes);
    let mut score = raw + policy.load_penalty * count;
    if projected > f64::from(policy.visit_budget_minutes) {
        score += policy.load_penalty;
    }
    if optional {
        score += policy.optional_load_penalty * count + policy.optional_minutes_weight * projected;
    }
    score
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate {
    pub visit_index: usize,
    pub weighted: f64,
    pub raw: f64,
    pub projected_minutes: u32,
    pub assignment_count: usize,
}

/// Full ordering over candidates; ends in the visit index so ties cannot
/// survive and selection stays deterministic.
pub(crate) fn compare(a: &Candidate, b: &Candidate) -> Ordering {
    a.weighted
        .total_cmp(&b.weighted)
        .then(a.raw.total_cmp(&b.raw))
        .then(a.projected_minutes.cmp(&b.projected_minutes))
        .then(a.assignment_count.cmp(&b.assignment_count))
        .then(a.visit_index.cmp(&b.visit_index))
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Placement {
    pub visit_index: usize,
    pub expands: bool,
}

/// Pick the best visit for a queued lesson.
///
/// Spare slots win outright. When every eligible visit is full, a visit
/// still under the auto-increase cap grows by one slot. Optional lessons get
/// one further chance: they may force a slot open rather than drop off the
/// schedule entirely.
pub(crate) fn select_visit(
    visits: &[Visit],
    queued: &QueuedLesson,
    ctx: &ParticipantContext<'_>,
    policy: &SchedulePolicy,
) -> Option<Placement> {
    let eligible: Vec<&Visit> = visits
        .iter()
        .filter(|v| !v.blocked && should_pull(&queued.lesson, ctx, v.age_m, queued.opts(), policy))
        .collect();
    if eligible.is_empty() {
        return None;
    }

    let candidate = |v: &Visit| {
        let raw = raw_score(&queued.lesson, v.age_m, policy);
        Candidate {
            visit_index: v.index,
            weighted: weighted_score(raw, v, &queued.lesson, queued.optional, policy),
            raw,
            projected_minutes: v.total_minutes + queued.lesson.minutes,
            assignment_count: v.assignments.len(),
        }
    };

    let best = |keep: &dyn Fn(&Visit) -> bool| {
        eligible
            .iter()
            .copied()
            .filter(|&v| keep(v))
            .map(|v| candidate(v))
            .min_by(compare)
    };

    if let Some(c) = best(&|v| v.has_spare_slot()) {
        return Some(Placement {
            visit_index: c.visit_index,
            expands: false,
        });
    }
    if let Some(c) = best(&|v| v.is_full() && v.auto_increases < policy.max_auto_increases) {
        return Some(Placement {
            visit_index: c.visit_index,
            expands: true,
        });
    }
    if queued.optional {
        if let Some(c) = best(&|v| v.is_full()) {
            return Some(Placement {
                visit_index: c.visit_index,
                expands: true,
            });
        }
    }
    None
}
