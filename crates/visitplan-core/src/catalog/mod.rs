//! Lesson catalog data model.
//!
//! Catalog files are JSON produced by the curriculum team and are not fully
//! trusted: flags may arrive as booleans or legacy `"yes"`/`"no"` strings,
//! and numeric fields may be strings or missing. Deserialization coerces
//! every field to a safe default instead of failing the whole catalog.

mod store;

pub use store::{parse_catalog, CatalogStore};

use serde::{Deserialize, Deserializer, Serialize};

/// Upper age bound assumed when a lesson does not declare one.
pub const DEFAULT_UP_TO_AGE: f64 = 36.0;

/// One lesson in the curriculum catalog.
///
/// `seq_age` is the target child age in months at which the lesson is meant
/// to be delivered; negative values are prenatal. `up_to_age` is the last
/// age at which the lesson is still worth delivering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Lesson {
    pub code: String,
    pub subject: String,
    #[serde(deserialize_with = "de_minutes")]
    pub minutes: u32,
    #[serde(deserialize_with = "de_age")]
    pub seq_age: Option<f64>,
    #[serde(deserialize_with = "de_age")]
    pub up_to_age: Option<f64>,
    #[serde(deserialize_with = "de_flag")]
    pub foundation: bool,
    #[serde(deserialize_with = "de_flag")]
    pub first_time_parent: bool,
    #[serde(deserialize_with = "de_flag")]
    pub pregnant: bool,
    #[serde(deserialize_with = "de_flag")]
    pub caregiver_wellbeing: bool,
    #[serde(deserialize_with = "de_flag")]
    pub family_planning: bool,
    #[serde(deserialize_with = "de_flag")]
    pub nutrition: bool,
    #[serde(deserialize_with = "de_flag")]
    pub sti: bool,
    #[serde(deserialize_with = "de_flag")]
    pub substance_use: bool,
}

impl Lesson {
    pub fn new(code: impl Into<String>, subject: impl Into<String>) -> Self {
        Lesson {
            code: code.into(),
            subject: subject.into(),
            ..Default::default()
        }
    }

    pub fn with_minutes(mut self, minutes: u32) -> Self {
        self.minutes = minutes;
        self
    }

    pub fn with_window(mut self, seq_age: f64, up_to_age: f64) -> Self {
        self.seq_age = Some(seq_age);
        self.up_to_age = Some(up_to_age);
        self
    }

    pub fn with_foundation(mut self) -> Self {
        self.foundation = true;
        self
    }

    /// Effective `(start, end)` age window in months.
    ///
    /// A missing target age reads as birth (0), a missing upper bound as
    /// [`DEFAULT_UP_TO_AGE`].
    pub fn age_window(&self) -> (f64, f64) {
        (
            self.seq_age.unwrap_or(0.0),
            self.up_to_age.unwrap_or(DEFAULT_UP_TO_AGE),
        )
    }

    /// Age the assignment engine aims for: the declared target, else the
    /// window start.
    pub fn target_age(&self) -> f64 {
        self.age_window().0
    }
}

/// Loose JSON scalar used while coercing untrusted catalog fields.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Bool(bool),
    Num(f64),
    Str(String),
    Other(serde_json::Value),
}

fn de_flag<'de, D>(de: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawScalar::deserialize(de) {
        Ok(RawScalar::Bool(b)) => b,
        Ok(RawScalar::Num(n)) => n != 0.0,
        Ok(RawScalar::Str(s)) => {
            let s = s.trim().to_ascii_lowercase();
            s == "yes" || s == "true" || s == "y" || s == "1"
        }
        _ => false,
    })
}

fn de_minutes<'de, D>(de: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match RawScalar::deserialize(de) {
        Ok(RawScalar::Num(n)) => n,
        Ok(RawScalar::Str(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if value.is_finite() && value > 0.0 {
        Ok(value as u32)
    } else {
        Ok(0)
    }
}

fn de_age<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match RawScalar::deserialize(de) {
        Ok(RawScalar::Num(n)) => Some(n),
        Ok(RawScalar::Str(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(value.filter(|v| v.is_finite()))
}
