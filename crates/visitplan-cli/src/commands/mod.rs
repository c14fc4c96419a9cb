use std::path::Path;

pub mod config;
pub mod lessons;
pub mod participant;
pub mod schedule;
pub mod visits;

/// Reads a JSON file into any deserializable value.
pub(crate) fn read_json<T: for<'de> serde::Deserialize<'de>>(
    path: &Path,
) -> Result<T, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Child age for human-readable output; prenatal months keep their sign.
pub(crate) fn format_age(age_m: i32) -> String {
    if age_m < 0 {
        format!("Prenatal ({age_m})")
    } else {
        age_m.to_string()
    }
}
