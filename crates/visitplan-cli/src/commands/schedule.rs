use std::path::PathBuf;

use clap::{Args, ValueEnum};
use visitplan_core::catalog::CatalogStore;
use visitplan_core::error::CatalogError;
use visitplan_core::{Config, Participant, ScheduleEngine, ScheduleResult};

use super::format_age;
use super::participant::ParticipantArgs;

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Args)]
pub struct ScheduleArgs {
    #[command(flatten)]
    pub participant: ParticipantArgs,

    /// Lesson catalog JSON file (falls back to the configured catalog_path)
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

pub fn run(args: ScheduleArgs) -> Result<(), Box<dyn std::error::Error>> {
    let participant = args.participant.build()?;
    let config = Config::load_or_default();

    let catalog_path = args
        .catalog
        .or_else(|| config.catalog_path.as_ref().map(PathBuf::from))
        .ok_or(CatalogError::NotConfigured)?;
    let store = CatalogStore::new(catalog_path);
    let lessons = store.lessons()?;

    let engine = ScheduleEngine::with_policy(config.policy.clone());
    let result = engine.build_schedule(&participant, lessons);

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Csv => write_csv(&participant, &result)?,
        OutputFormat::Table => print_table(&result),
    }
    Ok(())
}

/// `standard - actual`, rounded to 0.1, with an explicit `+` on positive
/// values and a bare `0` when they match.
fn format_variance(standard: Option<f64>, age_m: i32) -> String {
    let Some(standard) = standard else {
        return String::new();
    };
    let diff = ((standard - f64::from(age_m)) * 10.0).round() / 10.0;
    if diff.abs() < 1e-6 {
        return "0".to_string();
    }
    let display = if diff.fract() == 0.0 {
        format!("{}", diff as i64)
    } else {
        format!("{diff:.1}")
    };
    if diff > 0.0 {
        format!("+{display}")
    } else {
        display
    }
}

fn print_table(result: &ScheduleResult) {
    println!(
        "{:>5}  {:<10}  {:>13}  {:>8}  {:<8}  {:<40}  {:>7}",
        "Visit", "Date", "Age (months)", "Variance", "Code", "Subject", "Minutes"
    );
    for row in &result.rows {
        let subject = match (&row.reason, row.placeholder) {
            (Some(reason), true) => format!("{} ({reason})", row.subject),
            _ => row.subject.clone(),
        };
        let minutes = if row.placeholder {
            String::new()
        } else {
            row.minutes.to_string()
        };
        println!(
            "{:>5}  {:<10}  {:>13}  {:>8}  {:<8}  {:<40}  {:>7}",
            row.visit,
            row.date,
            format_age(row.age_m),
            format_variance(row.standard_age_m, row.age_m),
            row.code,
            subject,
            minutes
        );
    }

    let expected = result.scheduled_count() + result.unscheduled_count();
    let multi_lesson = result.visits.iter().filter(|v| v.lessons >= 2).count();
    let empty = result.total_visits - result.used_visits;

    println!();
    println!("Visits scheduled: {}", result.used_visits);
    println!(
        "Lessons expected to be scheduled based on selected parameters: {expected}"
    );
    println!("Lessons actually scheduled: {}", result.scheduled_count());
    println!("Visits with 2+ lessons scheduled: {multi_lesson}");
    if empty > 0 {
        println!("Visits with no lessons scheduled: {empty}");
    }
    if !result.overflow.is_empty() {
        println!(
            "Lessons not scheduled due to visit capacity: {} ({})",
            result.overflow.len(),
            result.overflow.join(", ")
        );
    }
    if !result.skipped.is_empty() {
        println!(
            "Lessons skipped; no eligible visits: {} ({})",
            result.skipped.len(),
            result.skipped.join(", ")
        );
    }
}

fn write_csv(
    participant: &Participant,
    result: &ScheduleResult,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    writer.write_record([
        "Participant ID",
        "Visit #",
        "Visit Date",
        "Child Age (months)",
        "Variance from Standard Sequence",
        "Lesson Code",
        "Lesson Subject",
        "Minutes",
    ])?;

    let id = participant.id.clone().unwrap_or_default();
    for row in &result.rows {
        writer.write_record([
            id.clone(),
            row.visit.to_string(),
            row.date.to_string(),
            format_age(row.age_m),
            format_variance(row.standard_age_m, row.age_m),
            row.code.clone(),
            row.subject.clone(),
            row.minutes.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
