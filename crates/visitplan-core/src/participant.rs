//! Participant selections: the typed, immutable input to a scheduling run.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How visit dates advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    /// Age-banded steps: weekly for a newborn, stretching to every two
    /// months for an older toddler.
    Standard,
    /// A fixed interval chosen by the family.
    Defined,
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing::Standard
    }
}

impl Pacing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pacing::Standard => "standard",
            Pacing::Defined => "defined",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Pacing::Standard => "Standard",
            Pacing::Defined => "Defined",
        }
    }
}

/// Fixed visit interval for defined pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinedInterval {
    Weekly,
    Biweekly,
    Monthly,
    Bimonthly,
}

impl DefinedInterval {
    /// Days between visits.
    pub fn step_days(&self) -> i64 {
        match self {
            DefinedInterval::Weekly => 7,
            DefinedInterval::Biweekly => 14,
            DefinedInterval::Monthly => 30,
            DefinedInterval::Bimonthly => 60,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DefinedInterval::Weekly => "weekly",
            DefinedInterval::Biweekly => "biweekly",
            DefinedInterval::Monthly => "monthly",
            DefinedInterval::Bimonthly => "bimonthly",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DefinedInterval::Weekly => "Weekly",
            DefinedInterval::Biweekly => "Every 2 weeks",
            DefinedInterval::Monthly => "Monthly",
            DefinedInterval::Bimonthly => "Every 2 months",
        }
    }
}

/// How far past the first visit the schedule runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleDuration {
    #[serde(rename = "up_to_3rd_birthday")]
    UpToThirdBirthday,
    #[serde(rename = "up_to_due_date")]
    UpToDueDate,
    #[serde(rename = "6_months")]
    SixMonths,
    #[serde(rename = "12_months")]
    TwelveMonths,
}

impl Default for ScheduleDuration {
    fn default() -> Self {
        ScheduleDuration::UpToThirdBirthday
    }
}

impl ScheduleDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleDuration::UpToThirdBirthday => "up_to_3rd_birthday",
            ScheduleDuration::UpToDueDate => "up_to_due_date",
            ScheduleDuration::SixMonths => "6_months",
            ScheduleDuration::TwelveMonths => "12_months",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScheduleDuration::UpToThirdBirthday => "Up to youngest child's 3rd birthday",
            ScheduleDuration::UpToDueDate => "Up to due date",
            ScheduleDuration::SixMonths => "6 months from first visit",
            ScheduleDuration::TwelveMonths => "12 months from first visit",
        }
    }
}

/// Optional curriculum topics a family can opt into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicSelections {
    pub caregiver_wellbeing: bool,
    pub family_planning: bool,
    pub nutrition: bool,
    pub sti: bool,
    pub substance_use: bool,
}

impl TopicSelections {
    pub fn any(&self) -> bool {
        self.caregiver_wellbeing
            || self.family_planning
            || self.nutrition
            || self.sti
            || self.substance_use
    }

    /// True when the lesson carries a topic flag this family selected.
    pub fn matches_lesson(&self, lesson: &crate::catalog::Lesson) -> bool {
        (self.caregiver_wellbeing && lesson.caregiver_wellbeing)
            || (self.family_planning && lesson.family_planning)
            || (self.nutrition && lesson.nutrition)
            || (self.sti && lesson.sti)
            || (self.substance_use && lesson.substance_use)
    }
}

/// Everything known about one family at scheduling time.
///
/// `birth` is the youngest child's birth date, or the due date when the
/// participant is pregnant. The struct is never mutated by the engine; all
/// per-run derived state lives inside the engine itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub id: Option<String>,
    pub birth: NaiveDate,
    pub first_visit: NaiveDate,
    #[serde(default)]
    pub pacing: Pacing,
    #[serde(default)]
    pub defined_interval: Option<DefinedInterval>,
    #[serde(default)]
    pub duration: ScheduleDuration,
    #[serde(default)]
    pub first_time_parent: bool,
    #[serde(default)]
    pub pregnant: bool,
    #[serde(default)]
    pub topics: TopicSelections,
    #[serde(default)]
    pub completed_lessons: Vec<String>,
}

impl Participant {
    pub fn new(birth: NaiveDate, first_visit: NaiveDate) -> Self {
        Participant {
            id: None,
            birth,
            first_visit,
            pacing: Pacing::default(),
            defined_interval: None,
            duration: ScheduleDuration::default(),
            first_time_parent: false,
            pregnant: false,
            topics: TopicSelections::default(),
            completed_lessons: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Sets a fixed interval and switches pacing to defined.
    pub fn with_defined_interval(mut self, interval: DefinedInterval) -> Self {
        self.pacing = Pacing::Defined;
        self.defined_interval = Some(interval);
        self
    }

    pub fn with_duration(mut self, duration: ScheduleDuration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_first_time_parent(mut self, value: bool) -> Self {
        self.first_time_parent = value;
        self
    }

    pub fn with_pregnant(mut self, value: bool) -> Self {
        self.pregnant = value;
        self
    }

    pub fn with_topics(mut self, topics: TopicSelections) -> Self {
        self.topics = topics;
        self
    }

    /// Records already-delivered lesson codes; blank entries are dropped.
    pub fn with_completed(mut self, codes: Vec<String>) -> Self {
        self.completed_lessons = codes
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        self
    }

    /// Completed codes as a trimmed lookup set.
    pub fn completed_set(&self) -> HashSet<String> {
        self.completed_lessons
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }
}
