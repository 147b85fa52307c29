//! Events emitted by the session state machine

use chrono::{DateTime, Local};
use guardian_api::{DurationPreset, GeoLocation, PolicySet, SessionState, SosPayload};
use guardian_util::SessionId;

/// Events emitted on state transitions, consumed by the escalation
/// dispatcher. The transition is already committed when the event is
/// observed; dispatch failures never roll it back.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Session entered ACTIVE from READY
    SessionStarted {
        session_id: SessionId,
        preset: DurationPreset,
        policy: PolicySet,
        started_at: DateTime<Local>,
    },

    /// Countdown paused by the user
    SessionPaused {
        session_id: SessionId,
        remaining_seconds: u64,
    },

    /// Countdown resumed
    SessionResumed {
        session_id: SessionId,
        remaining_seconds: u64,
    },

    /// Countdown reached zero
    SessionExpired {
        session_id: SessionId,
        location: Option<GeoLocation>,
    },

    /// Manual SOS override fired
    SosTriggered {
        session_id: SessionId,
        payload: SosPayload,
    },

    /// Session slot returned to READY
    SessionReset {
        session_id: SessionId,
        from_state: SessionState,
    },

    /// Remaining time was recomputed after a suspend gap in the tick stream
    ClockDriftCorrected {
        session_id: SessionId,
        remaining_seconds: u64,
        drift_seconds: u64,
    },
}
