//! Configuration parsing and validation for the guardian engine
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Session defaults (preset, tick interval)
//! - Escalation policy defaults and dispatch retry settings
//! - Validation with clear error messages

mod schema;
mod validation;

pub use schema::*;
pub use validation::*;

use guardian_api::{DurationPreset, PolicySet};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Validated engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Preset used by the next `start` until the UI selects another
    pub default_preset: DurationPreset,

    /// Countdown tick interval
    pub tick_interval: Duration,

    /// Default escalation policy for new sessions
    pub policy: PolicySet,

    /// Dispatch retry settings
    pub dispatch: DispatchConfig,
}

/// Retry settings for escalation dispatch
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_millis(2000),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_preset: DurationPreset::default(),
            tick_interval: Duration::from_secs(1),
            policy: PolicySet::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Convert from raw config (after validation)
    fn from_raw(raw: RawConfig) -> Self {
        let defaults = EngineConfig::default();
        let dispatch_defaults = DispatchConfig::default();

        Self {
            default_preset: raw
                .session
                .default_preset_minutes
                .and_then(DurationPreset::from_minutes)
                .unwrap_or(defaults.default_preset),
            tick_interval: raw
                .session
                .tick_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
            policy: PolicySet {
                notify_broker_on_expiry: raw.policy.notify_broker_on_expiry,
                continuous_gps_tracking: raw.policy.continuous_gps_tracking,
                silent_emergency_signal: raw.policy.silent_emergency_signal,
            },
            dispatch: DispatchConfig {
                max_attempts: raw
                    .dispatch
                    .max_attempts
                    .unwrap_or(dispatch_defaults.max_attempts),
                initial_backoff: raw
                    .dispatch
                    .initial_backoff_ms
                    .map(Duration::from_millis)
                    .unwrap_or(dispatch_defaults.initial_backoff),
                max_backoff: raw
                    .dispatch
                    .max_backoff_ms
                    .map(Duration::from_millis)
                    .unwrap_or(dispatch_defaults.max_backoff),
            },
        }
    }
}

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<EngineConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<EngineConfig> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(EngineConfig::from_raw(raw))
}
