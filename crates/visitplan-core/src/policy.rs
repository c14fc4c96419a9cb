//! Scheduling policy: every tunable constant of the engine in one struct.
//!
//! Defaults match the curriculum team's current practice. Individual fields
//! can be overridden from the config file, so each has a serde default.

use serde::{Deserialize, Serialize};

/// Tunable constants for eligibility, scoring, and repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulePolicy {
    /// How many months before a lesson's target age it may still be pulled.
    #[serde(default = "default_age_tolerance_months")]
    pub age_tolerance_months: f64,

    /// Extra backward tolerance for prenatal-start lessons.
    #[serde(default = "default_prenatal_tolerance_months")]
    pub prenatal_tolerance_months: f64,

    /// Fraction of a fully-prenatal window's span added as further backward
    /// allowance.
    #[serde(default = "default_prenatal_span_allowance")]
    pub prenatal_span_allowance: f64,

    /// Multiplier on the shortfall when a visit is earlier than the
    /// tolerance-adjusted window start.
    #[serde(default = "default_early_penalty_factor")]
    pub early_penalty_factor: f64,

    /// Per-month bonus for delivering prenatal content at an earlier
    /// prenatal visit.
    #[serde(default = "default_prenatal_early_bonus")]
    pub prenatal_early_bonus: f64,

    /// Score penalty per lesson already assigned to a visit.
    #[serde(default = "default_load_penalty")]
    pub load_penalty: f64,

    /// Additional per-assignment penalty applied to optional (topic-selected)
    /// lessons.
    #[serde(default = "default_optional_load_penalty")]
    pub optional_load_penalty: f64,

    /// Weight on projected visit minutes when scoring optional lessons.
    #[serde(default = "default_optional_minutes_weight")]
    pub optional_minutes_weight: f64,

    /// How many leading visits the repair phase insists on filling.
    #[serde(default = "default_early_fill_count")]
    pub early_fill_count: usize,

    /// Automatic capacity increases allowed per visit.
    #[serde(default = "default_max_auto_increases")]
    pub max_auto_increases: usize,

    /// Adjacent-visit gap, in days, considered "close" under standard pacing.
    #[serde(default = "default_close_interval_days")]
    pub close_interval_days: i64,

    /// Soft per-visit minute budget used in scoring.
    #[serde(default = "default_visit_budget_minutes")]
    pub visit_budget_minutes: u32,

    /// Code of the lesson that closes out the curriculum; it is pinned to
    /// the last visit that accepts it.
    #[serde(default = "default_final_lesson_code")]
    pub final_lesson_code: String,
}

fn default_age_tolerance_months() -> f64 {
    3.0
}

fn default_prenatal_tolerance_months() -> f64 {
    1.0
}

fn default_prenatal_span_allowance() -> f64 {
    0.5
}

fn default_early_penalty_factor() -> f64 {
    10.0
}

fn default_prenatal_early_bonus() -> f64 {
    0.5
}

fn default_load_penalty() -> f64 {
    2.0
}

fn default_optional_load_penalty() -> f64 {
    2.0
}

fn default_optional_minutes_weight() -> f64 {
    0.05
}

fn default_early_fill_count() -> usize {
    6
}

fn default_max_auto_increases() -> usize {
    2
}

fn default_close_interval_days() -> i64 {
    14
}

fn default_visit_budget_minutes() -> u32 {
    120
}

fn default_final_lesson_code() -> String {
    "TR-1".to_string()
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        SchedulePolicy {
            age_tolerance_months: default_age_tolerance_months(),
            prenatal_tolerance_months: default_prenatal_tolerance_months(),
            prenatal_span_allowance: default_prenatal_span_allowance(),
            early_penalty_factor: default_early_penalty_factor(),
            prenatal_early_bonus: default_prenatal_early_bonus(),
            load_penalty: default_load_penalty(),
            optional_load_penalty: default_optional_load_penalty(),
            optional_minutes_weight: default_optional_minutes_weight(),
            early_fill_count: default_early_fill_count(),
            max_auto_increases: default_max_auto_increases(),
            close_interval_days: default_close_interval_days(),
            visit_budget_minutes: default_visit_budget_minutes(),
            final_lesson_code: default_final_lesson_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = SchedulePolicy::default();
        assert_eq!(policy.age_tolerance_months, 3.0);
        assert_eq!(policy.early_penalty_factor, 10.0);
        assert_eq!(policy.max_auto_increases, 2);
        assert_eq!(policy.final_lesson_code, "TR-1");
    }

    #[test]
    fn test_partial_toml_fills_gaps() {
        let policy: SchedulePolicy = toml::from_str("age_tolerance_months = 4.0").unwrap();
        assert_eq!(policy.age_tolerance_months, 4.0);
        assert_eq!(policy.prenatal_tolerance_months, 1.0);
        assert_eq!(policy.final_lesson_code, "TR-1");
    }
}
