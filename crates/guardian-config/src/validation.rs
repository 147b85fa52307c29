//! Configuration validation

use crate::schema::RawConfig;
use thiserror::Error;

/// Bounds for the tick interval, in milliseconds
pub const TICK_INTERVAL_RANGE_MS: (u64, u64) = (100, 5000);

/// Bounds for dispatch retry attempts
pub const MAX_ATTEMPTS_RANGE: (u32, u32) = (1, 10);

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("default_preset_minutes must be one of 15/30/45/60, got {0}")]
    InvalidPreset(u32),

    #[error("tick_interval_ms must be within {min}..={max}, got {value}")]
    TickIntervalOutOfRange { value: u64, min: u64, max: u64 },

    #[error("dispatch.max_attempts must be within {min}..={max}, got {value}")]
    MaxAttemptsOutOfRange { value: u32, min: u32, max: u32 },

    #[error("dispatch.initial_backoff_ms ({initial}) exceeds max_backoff_ms ({max})")]
    BackoffInverted { initial: u64, max: u64 },
}

/// Validate a raw configuration, collecting every error
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(minutes) = config.session.default_preset_minutes {
        if guardian_api::DurationPreset::from_minutes(minutes).is_none() {
            errors.push(ValidationError::InvalidPreset(minutes));
        }
    }

    if let Some(interval) = config.session.tick_interval_ms {
        let (min, max) = TICK_INTERVAL_RANGE_MS;
        if interval < min || interval > max {
            errors.push(ValidationError::TickIntervalOutOfRange {
                value: interval,
                min,
                max,
            });
        }
    }

    if let Some(attempts) = config.dispatch.max_attempts {
        let (min, max) = MAX_ATTEMPTS_RANGE;
        if attempts < min || attempts > max {
            errors.push(ValidationError::MaxAttemptsOutOfRange {
                value: attempts,
                min,
                max,
            });
        }
    }

    if let (Some(initial), Some(max)) = (
        config.dispatch.initial_backoff_ms,
        config.dispatch.max_backoff_ms,
    ) {
        if initial > max {
            errors.push(ValidationError::BackoffInverted { initial, max });
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawDispatchConfig, RawPolicyConfig, RawSessionConfig};

    fn raw_with_session(session: RawSessionConfig) -> RawConfig {
        RawConfig {
            config_version: 1,
            session,
            policy: RawPolicyConfig::default(),
            dispatch: RawDispatchConfig::default(),
        }
    }

    #[test]
    fn rejects_non_preset_minutes() {
        let raw = raw_with_session(RawSessionConfig {
            default_preset_minutes: Some(20),
            tick_interval_ms: None,
        });

        let errors = validate_config(&raw);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::InvalidPreset(20)));
    }

    #[test]
    fn rejects_tick_interval_out_of_range() {
        let raw = raw_with_session(RawSessionConfig {
            default_preset_minutes: None,
            tick_interval_ms: Some(50),
        });

        let errors = validate_config(&raw);
        assert!(matches!(
            errors[0],
            ValidationError::TickIntervalOutOfRange { value: 50, .. }
        ));
    }

    #[test]
    fn rejects_inverted_backoff() {
        let mut raw = raw_with_session(RawSessionConfig::default());
        raw.dispatch.initial_backoff_ms = Some(5000);
        raw.dispatch.max_backoff_ms = Some(1000);

        let errors = validate_config(&raw);
        assert!(matches!(errors[0], ValidationError::BackoffInverted { .. }));
    }

    #[test]
    fn accepts_valid_config() {
        let raw = raw_with_session(RawSessionConfig {
            default_preset_minutes: Some(45),
            tick_interval_ms: Some(1000),
        });
        assert!(validate_config(&raw).is_empty());
    }
}
