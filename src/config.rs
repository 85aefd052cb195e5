//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Assistant configuration.
#[derive(Debug, Clone)]
pub struct AssistConfig {
    /// Port for the inbound webhook server.
    pub port: u16,
    /// Path to the local database file.
    pub db_path: String,
    /// Inactivity threshold before an in-flight conversation is reset.
    pub idle_threshold: Duration,
    /// How often the idle sweeper scans for stale conversations.
    pub sweep_interval: Duration,
    /// Model name for the generation provider.
    pub model: String,
    /// Token cap for generated advice and follow-up questions.
    pub max_reply_tokens: u32,
    /// Token cap for interview feedback (longer by design).
    pub max_feedback_tokens: u32,
    /// Sampling temperature for all generation calls.
    pub temperature: f32,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            port: 5001,
            db_path: "./data/prep-assist.db".to_string(),
            idle_threshold: Duration::from_secs(15 * 60),
            sweep_interval: Duration::from_secs(60),
            model: "gpt-4o-mini".to_string(),
            max_reply_tokens: 230,
            max_feedback_tokens: 500,
            temperature: 0.7,
        }
    }
}

impl AssistConfig {
    /// Build configuration from `PREP_ASSIST_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = parse_env("PREP_ASSIST_PORT", defaults.port)?;
        let idle_min: u64 = parse_env("PREP_ASSIST_IDLE_MIN", 15)?;
        let sweep_secs: u64 = parse_env("PREP_ASSIST_SWEEP_SECS", 60)?;

        Ok(Self {
            port,
            db_path: std::env::var("PREP_ASSIST_DB_PATH").unwrap_or(defaults.db_path),
            idle_threshold: Duration::from_secs(idle_min * 60),
            sweep_interval: Duration::from_secs(sweep_secs),
            model: std::env::var("PREP_ASSIST_MODEL").unwrap_or(defaults.model),
            max_reply_tokens: parse_env("PREP_ASSIST_MAX_REPLY_TOKENS", defaults.max_reply_tokens)?,
            max_feedback_tokens: parse_env(
                "PREP_ASSIST_MAX_FEEDBACK_TOKENS",
                defaults.max_feedback_tokens,
            )?,
            temperature: defaults.temperature,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("could not parse {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}
