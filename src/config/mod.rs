use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Priority given to the first dynamically registered question or
/// confirmation fact. Each later registration gets one less.
pub const DEFAULT_FACT_PRIORITY_START: i64 = 1000;

/// Priority of the per-session `symptoms` and `systemTypes` facts.
pub const DEFAULT_SESSION_FACT_PRIORITY: i64 = 99999;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Rule engine and fact settings.
    pub engine: EngineConfig,
    /// Log filter and output format.
    pub logging: LoggingConfig,
    /// Knowledge base file used when none is given on the command line.
    pub knowledge_base_path: Option<PathBuf>,
}

/// Diagnostic engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// When false, a condition referencing an unregistered fact fails its rule.
    /// When true, the fact reads as `null` and the condition evaluates false.
    pub allow_undefined_facts: bool,
    /// Priority of the first question or confirmation fact.
    pub fact_priority_start: i64,
    /// Priority of the `symptoms`, `systemTypes` and preset-answer facts.
    pub session_fact_priority: i64,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive, used when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable output.
    Pretty,
    /// One JSON object per line.
    Json,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let engine = EngineConfig {
            allow_undefined_facts: match env::var("ALLOW_UNDEFINED_FACTS") {
                Ok(raw) => parse_bool("ALLOW_UNDEFINED_FACTS", &raw)?,
                Err(_) => false,
            },
            fact_priority_start: env::var("FACT_PRIORITY_START")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_FACT_PRIORITY_START),
            session_fact_priority: env::var("SESSION_FACT_PRIORITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SESSION_FACT_PRIORITY),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        engine.validate()?;

        let knowledge_base_path = env::var("KNOWLEDGE_BASE_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(Config {
            engine,
            logging,
            knowledge_base_path,
        })
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::Config {
            message: format!("{} must be a boolean, got '{}'", key, other),
        }),
    }
}

impl EngineConfig {
    /// Check that question and confirmation facts rank below the session
    /// facts, so every rule tests `symptoms` before asking the user anything.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] if `fact_priority_start` is not below
    /// `session_fact_priority`.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.fact_priority_start >= self.session_fact_priority {
            return Err(AppError::Config {
                message: format!(
                    "FACT_PRIORITY_START ({}) must be below SESSION_FACT_PRIORITY ({})",
                    self.fact_priority_start, self.session_fact_priority
                ),
            });
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allow_undefined_facts: false,
            fact_priority_start: DEFAULT_FACT_PRIORITY_START,
            session_fact_priority: DEFAULT_SESSION_FACT_PRIORITY,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default_is_strict() {
        let config = EngineConfig::default();
        assert!(!config.allow_undefined_facts);
        assert_eq!(config.fact_priority_start, 1000);
        assert_eq!(config.session_fact_priority, 99999);
    }

    #[test]
    fn test_engine_config_validate() {
        assert!(EngineConfig::default().validate().is_ok());

        let inverted = EngineConfig {
            fact_priority_start: 200_000,
            ..EngineConfig::default()
        };
        let err = inverted.validate().unwrap_err();
        assert!(matches!(err, AppError::Config { .. }));
        assert!(err.to_string().contains("FACT_PRIORITY_START (200000)"));

        let equal = EngineConfig {
            fact_priority_start: 500,
            session_fact_priority: 500,
            ..EngineConfig::default()
        };
        assert!(equal.validate().is_err());
    }

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert!(parse_bool("X", "true").unwrap());
        assert!(parse_bool("X", "ON").unwrap());
        assert!(parse_bool("X", " 1 ").unwrap());
        assert!(!parse_bool("X", "false").unwrap());
        assert!(!parse_bool("X", "no").unwrap());
    }

    #[test]
    fn test_parse_bool_rejects_garbage() {
        let err = parse_bool("ALLOW_UNDEFINED_FACTS", "maybe").unwrap_err();
        assert!(err.to_string().contains("ALLOW_UNDEFINED_FACTS"));
        assert!(err.to_string().contains("maybe"));
    }
}
