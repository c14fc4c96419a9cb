use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;
use visitplan_core::calendar::parse_date;
use visitplan_core::participant::{
    DefinedInterval, Pacing, Participant, ScheduleDuration, TopicSelections,
};

/// Participant input shared by the schedule, visits, and lessons commands.
///
/// A JSON file supplies the baseline when `--participant` is given; inline
/// flags override individual fields from the file.
#[derive(Args)]
pub struct ParticipantArgs {
    /// Participant JSON file
    #[arg(long, value_name = "FILE")]
    pub participant: Option<PathBuf>,

    /// Participant identifier used in report output
    #[arg(long)]
    pub id: Option<String>,

    /// Youngest child's birth date, or due date when pregnant (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub birth: Option<NaiveDate>,

    /// Date of the first home visit (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub first_visit: Option<NaiveDate>,

    /// Visit pacing: standard or defined
    #[arg(long, value_parser = parse_pacing)]
    pub pacing: Option<Pacing>,

    /// Fixed interval for defined pacing: weekly, biweekly, monthly, bimonthly
    #[arg(long, value_parser = parse_interval)]
    pub interval: Option<DefinedInterval>,

    /// Schedule span: up_to_3rd_birthday, up_to_due_date, 6_months, 12_months
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<ScheduleDuration>,

    /// Family is expecting or parenting their first child
    #[arg(long)]
    pub first_time_parent: bool,

    /// Participant is currently pregnant
    #[arg(long)]
    pub pregnant: bool,

    /// Opt-in topics, comma-separated: caregiver_wellbeing, family_planning,
    /// nutrition, sti, substance_use
    #[arg(long, value_delimiter = ',')]
    pub topics: Vec<String>,

    /// Lesson codes already delivered, comma-separated
    #[arg(long, value_delimiter = ',')]
    pub completed: Vec<String>,
}

impl ParticipantArgs {
    /// Resolves the file and inline flags into a participant. Bare switches
    /// only ever turn a field on, so a file's `true` survives their absence.
    pub fn build(&self) -> Result<Participant, Box<dyn std::error::Error>> {
        let mut participant = match &self.participant {
            Some(path) => super::read_json::<Participant>(path)?,
            None => {
                let birth = self.birth.ok_or("missing --birth (or --participant file)")?;
                let first_visit = self
                    .first_visit
                    .ok_or("missing --first-visit (or --participant file)")?;
                Participant::new(birth, first_visit)
            }
        };

        if let Some(id) = &self.id {
            participant.id = Some(id.clone());
        }
        if let Some(birth) = self.birth {
            participant.birth = birth;
        }
        if let Some(first_visit) = self.first_visit {
            participant.first_visit = first_visit;
        }
        if let Some(pacing) = self.pacing {
            participant.pacing = pacing;
        }
        if let Some(interval) = self.interval {
            participant.pacing = Pacing::Defined;
            participant.defined_interval = Some(interval);
        }
        if let Some(duration) = self.duration {
            participant.duration = duration;
        }
        if self.first_time_parent {
            participant.first_time_parent = true;
        }
        if self.pregnant {
            participant.pregnant = true;
        }
        if !self.topics.is_empty() {
            participant.topics = parse_topics(&self.topics)?;
        }
        if !self.completed.is_empty() {
            participant = participant.with_completed(self.completed.clone());
        }

        Ok(participant)
    }
}

fn parse_pacing(value: &str) -> Result<Pacing, String> {
    match value {
        "standard" => Ok(Pacing::Standard),
        "defined" => Ok(Pacing::Defined),
        _ => Err(format!("unknown pacing: {value} (expected standard or defined)")),
    }
}

fn parse_interval(value: &str) -> Result<DefinedInterval, String> {
    match value {
        "weekly" => Ok(DefinedInterval::Weekly),
        "biweekly" => Ok(DefinedInterval::Biweekly),
        "monthly" => Ok(DefinedInterval::Monthly),
        "bimonthly" => Ok(DefinedInterval::Bimonthly),
        _ => Err(format!(
            "unknown interval: {value} (expected weekly, biweekly, monthly, or bimonthly)"
        )),
    }
}

fn parse_duration(value: &str) -> Result<ScheduleDuration, String> {
    match value {
        "up_to_3rd_birthday" => Ok(ScheduleDuration::UpToThirdBirthday),
        "up_to_due_date" => Ok(ScheduleDuration::UpToDueDate),
        "6_months" => Ok(ScheduleDuration::SixMonths),
        "12_months" => Ok(ScheduleDuration::TwelveMonths),
        _ => Err(format!(
            "unknown duration: {value} (expected up_to_3rd_birthday, up_to_due_date, 6_months, or 12_months)"
        )),
    }
}

fn parse_topics(names: &[String]) -> Result<TopicSelections, Box<dyn std::error::Error>> {
    let mut topics = TopicSelections::default();
    for name in names {
        match name.trim() {
            "" => {}
            "caregiver_wellbeing" => topics.caregiver_wellbeing = true,
            "family_planning" => topics.family_planning = true,
            "nutrition" => topics.nutrition = true,
            "sti" => topics.sti = true,
            "substance_use" => topics.substance_use = true,
            other => return Err(format!("unknown topic: {other}").into()),
        }
    }
    Ok(topics)
}
