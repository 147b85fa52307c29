//! Error taxonomy for guardian commands
//!
//! Every mutating command returns one of these; none is fatal to the
//! process, and the state machine never drops a command silently.

use thiserror::Error;

use crate::SessionState;

/// Errors surfaced across the command boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardianError {
    /// The command is not valid in the current state. Callers must surface
    /// this; the session is left untouched.
    #[error("{command} is not valid in state {state:?}")]
    InvalidTransition {
        state: SessionState,
        command: &'static str,
    },

    /// `start` was issued while a session is ACTIVE or PAUSED
    #[error("a session is already active")]
    SessionAlreadyActive,

    /// Duration presets cannot change while a session is running
    #[error("duration is locked while a session is running")]
    SessionLocked,

    /// A port call failed after exhausting its retry budget. Session state
    /// is unaffected; the transition was committed before dispatch.
    #[error("escalation dispatch failed after {attempts} attempts: {message}")]
    DispatchFailed { attempts: u32, message: String },

    /// The supervisor task is gone (shutdown or crash)
    #[error("session supervisor is unavailable")]
    SupervisorUnavailable,
}

pub type GuardianResult<T> = std::result::Result<T, GuardianError>;
