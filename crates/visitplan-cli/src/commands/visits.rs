use clap::Args;
use visitplan_core::calendar::{blackout_for, months_between};
use visitplan_core::pacing::visits_for;

use super::format_age;
use super::participant::ParticipantArgs;

#[derive(Args)]
pub struct VisitsArgs {
    #[command(flatten)]
    pub participant: ParticipantArgs,

    /// Emit as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: VisitsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let participant = args.participant.build()?;
    let dates = visits_for(&participant);

    if args.json {
        let visits: Vec<serde_json::Value> = dates
            .iter()
            .enumerate()
            .map(|(i, &date)| {
                serde_json::json!({
                    "visit": i + 1,
                    "date": date.to_string(),
                    "ageM": months_between(participant.birth, date),
                    "blackout": blackout_for(date).map(|b| b.label()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&visits)?);
        return Ok(());
    }

    println!(
        "{:>5}  {:<10}  {:>13}  {}",
        "Visit", "Date", "Age (months)", "Note"
    );
    for (i, &date) in dates.iter().enumerate() {
        let age = months_between(participant.birth, date);
        let note = blackout_for(date).map(|b| b.label()).unwrap_or("");
        println!(
            "{:>5}  {:<10}  {:>13}  {}",
            i + 1,
            date,
            format_age(age),
            note
        );
    }
    println!();
    println!("{} visits", dates.len());
    Ok(())
}
