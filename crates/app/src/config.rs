use std::env;
use std::fmt;

use services::assessment::{DEFAULT_MAX_QUESTIONS, DEFAULT_QUESTIONS_PER_LEVEL};
use services::{AssessmentPlan, SelectionPolicy, ServiceSettings};

pub const DEFAULT_DB_URL: &str = "sqlite://tutor.sqlite3";

/// Top-level configuration for the `tutor` binary.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub telemetry: TelemetryConfig,
    pub services: ServiceSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl AppConfig {
    /// Read configuration from the process environment, after loading `.env` if present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup("TUTOR_DB_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_URL.to_string());
        let log_level = lookup("TUTOR_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let per_level = parse_count(
            &lookup,
            "TUTOR_QUESTIONS_PER_LEVEL",
            DEFAULT_QUESTIONS_PER_LEVEL,
        )?;
        let max_questions = parse_count(&lookup, "TUTOR_MAX_QUESTIONS", DEFAULT_MAX_QUESTIONS)?;
        let selection = match lookup("TUTOR_TASK_SELECTION") {
            None => SelectionPolicy::default(),
            Some(raw) => parse_selection(&raw)?,
        };

        Ok(Self {
            database: DatabaseConfig { url },
            telemetry: TelemetryConfig { log_level },
            services: ServiceSettings {
                plan: AssessmentPlan::new(per_level, max_questions),
                selection,
            },
        })
    }
}

fn parse_count(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: usize,
) -> Result<usize, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::InvalidCount { key, raw }),
        },
    }
}

fn parse_selection(raw: &str) -> Result<SelectionPolicy, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "first" | "first_match" => Ok(SelectionPolicy::FirstMatch),
        "random" => Ok(SelectionPolicy::Random),
        _ => Err(ConfigError::InvalidSelection {
            raw: raw.to_string(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidCount { key: &'static str, raw: String },
    InvalidSelection { raw: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidCount { key, raw } => {
                write!(f, "{key} must be a positive integer, got '{raw}'")
            }
            ConfigError::InvalidSelection { raw } => {
                write!(f, "TUTOR_TASK_SELECTION must be 'first' or 'random', got '{raw}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.database.url, DEFAULT_DB_URL);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.services, ServiceSettings::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("TUTOR_DB_URL", "sqlite://elsewhere.db"),
            ("TUTOR_LOG_LEVEL", "debug"),
            ("TUTOR_QUESTIONS_PER_LEVEL", "3"),
            ("TUTOR_MAX_QUESTIONS", "9"),
            ("TUTOR_TASK_SELECTION", "First"),
        ])
        .unwrap();
        assert_eq!(config.database.url, "sqlite://elsewhere.db");
        assert_eq!(config.telemetry.log_level, "debug");
        assert_eq!(config.services.plan, AssessmentPlan::new(3, 9));
        assert_eq!(config.services.selection, SelectionPolicy::FirstMatch);
    }

    #[test]
    fn blank_db_url_falls_back_to_default() {
        let config = load(&[("TUTOR_DB_URL", "  ")]).unwrap();
        assert_eq!(config.database.url, DEFAULT_DB_URL);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            load(&[("TUTOR_MAX_QUESTIONS", "0")]),
            Err(ConfigError::InvalidCount {
                key: "TUTOR_MAX_QUESTIONS",
                ..
            })
        ));
        assert!(matches!(
            load(&[("TUTOR_QUESTIONS_PER_LEVEL", "two")]),
            Err(ConfigError::InvalidCount { .. })
        ));
        assert!(matches!(
            load(&[("TUTOR_TASK_SELECTION", "best")]),
            Err(ConfigError::InvalidSelection { .. })
        ));
    }
}
