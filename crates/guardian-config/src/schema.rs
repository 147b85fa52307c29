//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Session defaults
    #[serde(default)]
    pub session: RawSessionConfig,

    /// Default escalation policy for new sessions
    #[serde(default)]
    pub policy: RawPolicyConfig,

    /// Escalation dispatch retry settings
    #[serde(default)]
    pub dispatch: RawDispatchConfig,
}

/// Session-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSessionConfig {
    /// Default countdown preset in minutes (15/30/45/60)
    pub default_preset_minutes: Option<u32>,

    /// Tick interval in milliseconds
    pub tick_interval_ms: Option<u64>,
}

/// Raw policy toggles
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPolicyConfig {
    #[serde(default)]
    pub notify_broker_on_expiry: bool,

    #[serde(default)]
    pub continuous_gps_tracking: bool,

    #[serde(default)]
    pub silent_emergency_signal: bool,
}

/// Raw dispatch retry settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDispatchConfig {
    /// Attempts per port call before giving up
    pub max_attempts: Option<u32>,

    /// First backoff delay in milliseconds; doubles per attempt
    pub initial_backoff_ms: Option<u64>,

    /// Backoff ceiling in milliseconds
    pub max_backoff_ms: Option<u64>,
}
