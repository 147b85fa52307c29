//! Shared types for the guardian engine API

use chrono::{DateTime, Local};
use guardian_util::SessionId;
use serde::{Deserialize, Serialize};

/// Selectable countdown presets. The UI offers exactly these four; arbitrary
/// durations are not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationPreset {
    Min15,
    Min30,
    Min45,
    Min60,
}

impl DurationPreset {
    /// All presets in ascending order
    pub const ALL: [DurationPreset; 4] = [
        DurationPreset::Min15,
        DurationPreset::Min30,
        DurationPreset::Min45,
        DurationPreset::Min60,
    ];

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        match minutes {
            15 => Some(DurationPreset::Min15),
            30 => Some(DurationPreset::Min30),
            45 => Some(DurationPreset::Min45),
            60 => Some(DurationPreset::Min60),
            _ => None,
        }
    }

    pub fn minutes(&self) -> u32 {
        match self {
            DurationPreset::Min15 => 15,
            DurationPreset::Min30 => 30,
            DurationPreset::Min45 => 45,
            DurationPreset::Min60 => 60,
        }
    }

    pub fn seconds(&self) -> u64 {
        u64::from(self.minutes()) * 60
    }
}

impl Default for DurationPreset {
    fn default() -> Self {
        DurationPreset::Min30
    }
}

/// Escalation policy toggles. Captured as an immutable snapshot when a
/// session starts; changes apply only to the next session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicySet {
    /// Notify the broker contact when the countdown expires
    #[serde(default)]
    pub notify_broker_on_expiry: bool,

    /// Stream location continuously while the session is active
    #[serde(default)]
    pub continuous_gps_tracking: bool,

    /// Suppress audible confirmation in the local UI when SOS fires.
    /// Presentation-only: SOS transmission itself is never gated.
    #[serde(default)]
    pub silent_emergency_signal: bool,
}

/// Current session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Ready,
    Active,
    Paused,
    Expired,
    SosTriggered,
}

impl SessionState {
    /// Terminal states are retained for audit until an explicit reset
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Expired | SessionState::SosTriggered)
    }
}

/// A location fix reported by the UI's location collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters, if known
    pub accuracy_m: Option<f64>,
}

/// Payload handed to the emergency transmission port on SOS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosPayload {
    pub location: Option<GeoLocation>,
    pub triggered_at: DateTime<Local>,
    /// Seconds that were left on the countdown when SOS fired
    pub remaining_seconds: u64,
}

/// Read-only projection of the session slot for UI display.
/// Produced by `view()`; never fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: Option<SessionId>,
    pub state: SessionState,
    pub preset: DurationPreset,
    pub duration_seconds: u64,
    pub remaining_seconds: u64,
    /// Policy snapshot of the running (or just-ended) session
    pub policy: Option<PolicySet>,
    pub started_at: Option<DateTime<Local>>,
    pub ended_at: Option<DateTime<Local>>,
}
