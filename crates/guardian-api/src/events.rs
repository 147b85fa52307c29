//! Escalation events emitted on the audit stream
//!
//! These are emitted, not persisted, by the engine; the `AuditLogPort`
//! collaborator decides what to do with them.

use chrono::{DateTime, Local};
use guardian_util::SessionId;
use serde::{Deserialize, Serialize};

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationKind {
    /// Countdown reached zero
    Expired,
    /// Manual SOS override fired
    SosTriggered,
    /// Broker notification delivered
    BrokerNotified,
    /// Continuous location stream started
    GpsStreamStarted,
    /// Continuous location stream stopped
    GpsStreamStopped,
    /// A port call failed after all retries
    DispatchFailed,
    /// Remaining time was recomputed after suspend/clock adjustment
    ClockDriftCorrected,
}

/// Escalation event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationEvent {
    pub kind: EscalationKind,
    pub session_id: SessionId,
    pub timestamp: DateTime<Local>,
    /// Free-form, policy-dependent detail
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl EscalationEvent {
    pub fn new(kind: EscalationKind, session_id: SessionId) -> Self {
        Self {
            kind,
            session_id,
            timestamp: guardian_util::now(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}
