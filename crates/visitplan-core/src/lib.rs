//! # Visitplan Core Library
//!
//! This library provides the scheduling logic for the visitplan home
//! visiting planner. It implements a CLI-first philosophy where every
//! operation is available through a standalone CLI binary working over
//! plain JSON catalogs and TOML configuration on disk.
//!
//! ## Architecture
//!
//! - **Calendar**: Month-based age arithmetic, date parsing, and holiday
//!   blackout detection
//! - **Catalog**: Lesson catalog loading with per-field coercion of
//!   untrusted JSON
//! - **Pacing**: Visit date generation, either age-banded or at a fixed
//!   defined interval
//! - **Eligibility**: Relevance and age-window filtering per family
//! - **Assignment**: Scored greedy lesson placement with capacity expansion
//!   and repair passes
//!
//! ## Key Components
//!
//! - [`ScheduleEngine`]: The lesson-to-visit assignment pipeline
//! - [`CatalogStore`]: Cached lesson catalog loader
//! - [`Config`]: Application configuration management
//! - [`Participant`]: One family's enrollment details and selections

pub mod calendar;
pub mod catalog;
pub mod participant;
pub mod policy;
pub mod config;
pub mod eligibility;
pub mod pacing;
pub mod assign;
pub mod error;

pub use assign::{
    build_schedule, PlaceholderReason, ScheduleEngine, ScheduleResult, ScheduleRow, VisitSummary,
};
pub use calendar::Blackout;
pub use catalog::{parse_catalog, CatalogStore, Lesson};
pub use config::Config;
pub use error::{CatalogError, ConfigError, CoreError, ValidationError};
pub use participant::{DefinedInterval, Pacing, Participant, ScheduleDuration, TopicSelections};
pub use policy::SchedulePolicy;
