use std::env;
use std::fmt;

use chrono::NaiveDate;

/// Distinguishes runtime behavior for different deployment stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for engine consumers.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub environment: AppEnvironment,
    pub evaluation: EvaluationConfig,
    pub telemetry: TelemetryConfig,
}

impl EngineConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("UW_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let as_of = match env::var("UW_AS_OF") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_as_of(&raw)?),
            _ => None,
        };

        let log_level = env::var("UW_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            evaluation: EvaluationConfig { as_of },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Evaluation defaults applied at the application boundary.
#[derive(Debug, Clone, Default)]
pub struct EvaluationConfig {
    /// Pinned evaluation date; callers fall back to today when unset.
    pub as_of: Option<NaiveDate>,
}

impl EvaluationConfig {
    pub fn resolve_as_of(&self, today: NaiveDate) -> NaiveDate {
        self.as_of.unwrap_or(today)
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Parse an evaluation date in `YYYY-MM-DD` form.
pub fn parse_as_of(raw: &str) -> Result<NaiveDate, ConfigError> {
    let value = raw.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|source| ConfigError::InvalidAsOf {
        value: value.to_string(),
        source,
    })
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidAsOf {
        value: String,
        source: chrono::ParseError,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidAsOf { value, .. } => {
                write!(f, "UW_AS_OF must be a YYYY-MM-DD date (found '{}')", value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidAsOf { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("UW_ENV");
        env::remove_var("UW_LOG_LEVEL");
        env::remove_var("UW_AS_OF");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = EngineConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.evaluation.as_of, None);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn pinned_as_of_overrides_today() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("UW_ENV", "ci");
        env::set_var("UW_AS_OF", "2025-03-01");
        let config = EngineConfig::load().expect("config loads");
        reset_env();

        let today = NaiveDate::from_ymd_opt(2026, 1, 1).expect("date");
        assert_eq!(config.environment, AppEnvironment::Test);
        assert_eq!(
            config.evaluation.resolve_as_of(today),
            NaiveDate::from_ymd_opt(2025, 3, 1).expect("date")
        );
    }

    #[test]
    fn rejects_malformed_as_of() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("UW_AS_OF", "03/01/2025");
        let result = EngineConfig::load();
        reset_env();

        let err = result.expect_err("malformed date rejected");
        assert!(err.to_string().contains("03/01/2025"));
    }
}
