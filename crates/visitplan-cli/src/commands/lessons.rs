use std::path::PathBuf;

use clap::Args;
use visitplan_core::catalog::{CatalogStore, Lesson};
use visitplan_core::eligibility::filter_lessons;
use visitplan_core::error::CatalogError;
use visitplan_core::Config;

use super::participant::ParticipantArgs;

#[derive(Args)]
pub struct LessonsArgs {
    /// Lesson catalog JSON file (falls back to the configured catalog_path)
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Keep only lessons relevant for the given participant details
    #[arg(long)]
    pub relevant: bool,

    #[command(flatten)]
    pub participant: ParticipantArgs,

    /// Emit as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: LessonsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let catalog_path = args
        .catalog
        .or_else(|| config.catalog_path.as_ref().map(PathBuf::from))
        .ok_or(CatalogError::NotConfigured)?;
    let store = CatalogStore::new(catalog_path);

    let lessons: Vec<Lesson> = if args.relevant {
        let participant = args.participant.build()?;
        filter_lessons(store.lessons()?, &participant)
    } else {
        store.lessons()?.to_vec()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&lessons)?);
        return Ok(());
    }

    println!(
        "{:<10}  {:<44}  {:>7}  {:<12}  {}",
        "Code", "Subject", "Minutes", "Age window", "Tags"
    );
    for lesson in &lessons {
        let (start, end) = lesson.age_window();
        println!(
            "{:<10}  {:<44}  {:>7}  {:<12}  {}",
            lesson.code,
            lesson.subject,
            lesson.minutes,
            format!("{start} to {end}"),
            tags(lesson)
        );
    }
    println!();
    println!("{} lessons", lessons.len());
    Ok(())
}

fn tags(lesson: &Lesson) -> String {
    let mut tags = Vec::new();
    if lesson.foundation {
        tags.push("foundation");
    }
    if lesson.first_time_parent {
        tags.push("first_time_parent");
    }
    if lesson.pregnant {
        tags.push("pregnant");
    }
    if lesson.caregiver_wellbeing {
        tags.push("caregiver_wellbeing");
    }
    if lesson.family_planning {
        tags.push("family_planning");
    }
    if lesson.nutrition {
        tags.push("nutrition");
    }
    if lesson.sti {
        tags.push("sti");
    }
    if lesson.substance_use {
        tags.push("substance_use");
    }
    tags.join(", ")
}
