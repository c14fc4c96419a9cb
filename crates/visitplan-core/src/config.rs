//! TOML-based application configuration.
//!
//! Stores the scheduling policy knobs and the default catalog location.
//! Configuration lives at `~/.config/visitplan/config.toml`; set
//! `VISITPLAN_ENV=dev` to use `~/.config/visitplan-dev/` instead.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::policy::SchedulePolicy;

/// Returns `~/.config/visitplan[-dev]/` based on VISITPLAN_ENV, creating it
/// if needed.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("VISITPLAN_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("visitplan-dev")
    } else {
        base_dir.join("visitplan")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/visitplan/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Engine tunables; see [`SchedulePolicy`].
    #[serde(default)]
    pub policy: SchedulePolicy,
    /// Default lesson catalog file used when the CLI is not given one.
    #[serde(default)]
    pub catalog_path: Option<String>,
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/visitplan"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from an explicit file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Save to an explicit file path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load from the default location; a missing file writes and returns the
    /// defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save()?;
            Ok(cfg)
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Load from the default location, falling back to defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Get a config value as a string by dot-separated key
    /// (e.g. `policy.age_tolerance_months`).
    pub fn get(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        match current {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value by dot-separated key, in memory only. The new value is
    /// parsed according to the existing value's type.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = &mut json;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let new_value = coerce_like(existing, key, value)?;
                obj.insert(part.to_string(), new_value);

                *self = serde_json::from_value(json)
                    .map_err(|e| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: e.to_string(),
                    })?;
                return Ok(());
            }
            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// Update a value by key and persist to the default location.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }
}

/// Parse `value` into the same JSON type as `existing`.
fn coerce_like(
    existing: &serde_json::Value,
    key: &str,
    value: &str,
) -> Result<serde_json::Value, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    };

    match existing {
        serde_json::Value::Bool(_) => value
            .parse::<bool>()
            .map(serde_json::Value::Bool)
            .map_err(|_| invalid(format!("cannot parse '{value}' as bool"))),
        serde_json::Value::Number(n) => {
            if n.is_u64() {
                if let Ok(v) = value.parse::<u64>() {
                    return Ok(serde_json::Value::Number(v.into()));
                }
            }
            value
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number)
                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))
        }
        serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
            serde_json::from_str(value).map_err(|e| invalid(e.to_string()))
        }
        _ => Ok(serde_json::Value::String(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn test_get_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("policy.age_tolerance_months").as_deref(), Some("3.0"));
        assert_eq!(cfg.get("policy.max_auto_increases").as_deref(), Some("2"));
        assert_eq!(cfg.get("policy.final_lesson_code").as_deref(), Some("TR-1"));
        assert!(cfg.get("policy.missing").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn test_set_value_number() {
        let mut cfg = Config::default();
        cfg.set_value("policy.age_tolerance_months", "4.0").unwrap();
        assert_eq!(cfg.policy.age_tolerance_months, 4.0);
    }

    #[test]
    fn test_set_value_string() {
        let mut cfg = Config::default();
        cfg.set_value("policy.final_lesson_code", "GR-9").unwrap();
        assert_eq!(cfg.policy.final_lesson_code, "GR-9");
    }

    #[test]
    fn test_set_value_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set_value("policy.not_a_knob", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_set_value_rejects_bad_number() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set_value("policy.load_penalty", "lots"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_explicit_path_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = Config::default();
        cfg.catalog_path = Some("lessons.json".to_string());
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let cfg: Config = toml::from_str("[policy]\nearly_fill_count = 5\n").unwrap();
        assert_eq!(cfg.policy.early_fill_count, 5);
        assert_eq!(cfg.policy.age_tolerance_months, 3.0);
        assert_eq!(cfg.catalog_path, None);
    }
}
