//! Session state machine
//!
//! Every (state, command) pair is covered: commands that are not valid in
//! the current state return a typed error and leave the session untouched.
//! Ticks are internal events and are silently dropped outside ACTIVE.

use chrono::{DateTime, Local};
use guardian_api::{
    DurationPreset, GeoLocation, GuardianError, GuardianResult, PolicySet, SessionState,
    SessionView, SosPayload,
};
use guardian_util::SessionId;
use tracing::{debug, info, warn};

use crate::SessionEvent;

/// Tolerance before a tick triggers wall-clock recomputation. Normal tick
/// jitter stays well under this; only a suspend gap exceeds it.
const DRIFT_TOLERANCE_SECS: u64 = 2;

/// The per-owner session slot and its state machine.
///
/// READY holds the selected preset; `start` captures the policy snapshot and
/// begins the countdown. Terminal states retain the session for audit until
/// an explicit `reset`.
#[derive(Debug)]
pub struct GuardianSession {
    session_id: Option<SessionId>,
    preset: DurationPreset,
    duration_seconds: u64,
    remaining_seconds: u64,
    state: SessionState,
    policy: Option<PolicySet>,
    started_at: Option<DateTime<Local>>,
    ended_at: Option<DateTime<Local>>,

    /// Wall-clock time of the last entry into ACTIVE (start or resume)
    resumed_at: Option<DateTime<Local>>,
    /// Active seconds accumulated before the most recent pause
    active_before_pause_secs: u64,

    /// Last fix reported by the UI's location collaborator
    last_known_location: Option<GeoLocation>,
}

impl GuardianSession {
    pub fn new(preset: DurationPreset) -> Self {
        Self {
            session_id: None,
            preset,
            duration_seconds: preset.seconds(),
            remaining_seconds: preset.seconds(),
            state: SessionState::Ready,
            policy: None,
            started_at: None,
            ended_at: None,
            resumed_at: None,
            active_before_pause_secs: 0,
            last_known_location: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    /// Update the preset used by the next `start`. Locked while a session
    /// is running; terminal states must be reset first.
    pub fn select_duration(&mut self, preset: DurationPreset) -> GuardianResult<()> {
        match self.state {
            SessionState::Ready => {
                self.preset = preset;
                self.duration_seconds = preset.seconds();
                self.remaining_seconds = preset.seconds();
                debug!(minutes = preset.minutes(), "Duration preset selected");
                Ok(())
            }
            SessionState::Active | SessionState::Paused => Err(GuardianError::SessionLocked),
            state => Err(GuardianError::InvalidTransition {
                state,
                command: "select_duration",
            }),
        }
    }

    /// Start a session with the selected preset, capturing the policy
    /// snapshot. Returns the new session id and the emitted events.
    pub fn start(
        &mut self,
        policy: PolicySet,
        now: DateTime<Local>,
    ) -> GuardianResult<(SessionId, Vec<SessionEvent>)> {
        match self.state {
            SessionState::Ready => {
                let session_id = SessionId::new();
                self.session_id = Some(session_id);
                self.duration_seconds = self.preset.seconds();
                self.remaining_seconds = self.duration_seconds;
                self.state = SessionState::Active;
                self.policy = Some(policy);
                self.started_at = Some(now);
                self.ended_at = None;
                self.resumed_at = Some(now);
                self.active_before_pause_secs = 0;

                info!(
                    session_id = %session_id,
                    duration_secs = self.duration_seconds,
                    "Session started"
                );

                Ok((
                    session_id,
                    vec![SessionEvent::SessionStarted {
                        session_id,
                        preset: self.preset,
                        policy,
                        started_at: now,
                    }],
                ))
            }
            SessionState::Active | SessionState::Paused => {
                Err(GuardianError::SessionAlreadyActive)
            }
            state => Err(GuardianError::InvalidTransition {
                state,
                command: "start",
            }),
        }
    }

    /// Apply one countdown tick. Decrements by one second, cross-checking
    /// against wall-clock elapsed time; remaining never goes negative, and
    /// reaching zero transitions to EXPIRED in the same step.
    ///
    /// Ticks outside ACTIVE are stale (the producer is stopped on every
    /// transition out of ACTIVE) and are dropped without effect.
    pub fn tick(&mut self, now: DateTime<Local>) -> Vec<SessionEvent> {
        if self.state != SessionState::Active {
            return Vec::new();
        }
        let session_id = match self.session_id {
            Some(id) => id,
            None => return Vec::new(),
        };

        let mut events = Vec::new();

        let stepped = self.remaining_seconds.saturating_sub(1);
        let computed = self.wall_clock_remaining(now);

        // Correction only ever shortens the countdown: a suspend gap means
        // too few ticks were delivered, never too many.
        let remaining = if computed + DRIFT_TOLERANCE_SECS < stepped {
            let drift_seconds = stepped - computed;
            warn!(
                session_id = %session_id,
                drift_secs = drift_seconds,
                remaining_secs = computed,
                "Clock drift corrected after suspend"
            );
            events.push(SessionEvent::ClockDriftCorrected {
                session_id,
                remaining_seconds: computed,
                drift_seconds,
            });
            computed
        } else {
            stepped
        };

        self.remaining_seconds = remaining;

        if remaining == 0 {
            self.state = SessionState::Expired;
            self.ended_at = Some(now);
            info!(session_id = %session_id, "Session expired");
            events.push(SessionEvent::SessionExpired {
                session_id,
                location: self.last_known_location,
            });
        }

        events
    }

    /// Pause the countdown. Valid only in ACTIVE.
    pub fn pause(&mut self, now: DateTime<Local>) -> GuardianResult<Vec<SessionEvent>> {
        match self.state {
            SessionState::Active => {
                let session_id = self.current_session_id("pause")?;
                self.active_before_pause_secs += self.seconds_since_resume(now);
                self.resumed_at = None;
                self.state = SessionState::Paused;

                info!(
                    session_id = %session_id,
                    remaining_secs = self.remaining_seconds,
                    "Session paused"
                );

                Ok(vec![SessionEvent::SessionPaused {
                    session_id,
                    remaining_seconds: self.remaining_seconds,
                }])
            }
            state => Err(GuardianError::InvalidTransition {
                state,
                command: "pause",
            }),
        }
    }

    /// Resume a paused countdown with the remaining time it was paused at.
    pub fn resume(&mut self, now: DateTime<Local>) -> GuardianResult<Vec<SessionEvent>> {
        match self.state {
            SessionState::Paused => {
                let session_id = self.current_session_id("resume")?;
                self.state = SessionState::Active;
                self.resumed_at = Some(now);

                info!(
                    session_id = %session_id,
                    remaining_secs = self.remaining_seconds,
                    "Session resumed"
                );

                Ok(vec![SessionEvent::SessionResumed {
                    session_id,
                    remaining_seconds: self.remaining_seconds,
                }])
            }
            state => Err(GuardianError::InvalidTransition {
                state,
                command: "resume",
            }),
        }
    }

    /// Manual SOS override: valid from ACTIVE or PAUSED, fires immediately,
    /// bypassing the expiry wait. Never gated by policy.
    pub fn sos(&mut self, now: DateTime<Local>) -> GuardianResult<Vec<SessionEvent>> {
        match self.state {
            SessionState::Active | SessionState::Paused => {
                let session_id = self.current_session_id("sos")?;
                self.state = SessionState::SosTriggered;
                self.ended_at = Some(now);

                warn!(session_id = %session_id, "SOS triggered");

                Ok(vec![SessionEvent::SosTriggered {
                    session_id,
                    payload: SosPayload {
                        location: self.last_known_location,
                        triggered_at: now,
                        remaining_seconds: self.remaining_seconds,
                    },
                }])
            }
            state => Err(GuardianError::InvalidTransition {
                state,
                command: "sos",
            }),
        }
    }

    /// Return the slot to READY with the selected preset, discarding the
    /// policy snapshot. Idempotent: reset in READY is a no-op.
    pub fn reset(&mut self) -> GuardianResult<Vec<SessionEvent>> {
        if self.state == SessionState::Ready {
            return Ok(Vec::new());
        }

        let from_state = self.state;
        let session_id = self.current_session_id("reset")?;

        self.session_id = None;
        self.state = SessionState::Ready;
        self.policy = None;
        self.started_at = None;
        self.ended_at = None;
        self.resumed_at = None;
        self.active_before_pause_secs = 0;
        self.duration_seconds = self.preset.seconds();
        self.remaining_seconds = self.preset.seconds();

        info!(session_id = %session_id, from_state = ?from_state, "Session reset");

        Ok(vec![SessionEvent::SessionReset {
            session_id,
            from_state,
        }])
    }

    /// Record a location fix. Valid in any state; no transition.
    pub fn note_location(&mut self, location: GeoLocation) {
        self.last_known_location = Some(location);
    }

    /// Read-only projection for UI display
    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.session_id,
            state: self.state,
            preset: self.preset,
            duration_seconds: self.duration_seconds,
            remaining_seconds: self.remaining_seconds,
            policy: self.policy,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }

    fn current_session_id(&self, command: &'static str) -> GuardianResult<SessionId> {
        self.session_id.ok_or(GuardianError::InvalidTransition {
            state: self.state,
            command,
        })
    }

    fn seconds_since_resume(&self, now: DateTime<Local>) -> u64 {
        self.resumed_at
            .map(|t| now.signed_duration_since(t).num_seconds().max(0) as u64)
            .unwrap_or(0)
    }

    /// Remaining time derived from wall-clock active elapsed time, used to
    /// recover from suspend gaps in the tick stream
    fn wall_clock_remaining(&self, now: DateTime<Local>) -> u64 {
        let active_elapsed = self.active_before_pause_secs + self.seconds_since_resume(now);
        self.duration_seconds.saturating_sub(active_elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn started_session(preset: DurationPreset, policy: PolicySet) -> (GuardianSession, DateTime<Local>) {
        let mut session = GuardianSession::new(preset);
        let now = Local::now();
        session.start(policy, now).unwrap();
        (session, now)
    }

    /// Deliver `n` ticks one wall-clock second apart, starting at `from`
    fn deliver_ticks(
        session: &mut GuardianSession,
        from: DateTime<Local>,
        n: u64,
    ) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        for i in 1..=n {
            events.extend(session.tick(from + ChronoDuration::seconds(i as i64)));
        }
        events
    }

    #[test]
    fn new_session_is_ready_with_preset() {
        let session = GuardianSession::new(DurationPreset::Min15);
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.remaining_seconds(), 900);
        assert!(session.session_id().is_none());
    }

    #[test]
    fn every_preset_expires_after_exactly_preset_ticks() {
        for preset in DurationPreset::ALL {
            let (mut session, now) = started_session(preset, PolicySet::default());
            let events = deliver_ticks(&mut session, now, preset.seconds());

            assert_eq!(session.state(), SessionState::Expired);
            assert_eq!(session.remaining_seconds(), 0);
            assert_eq!(
                events
                    .iter()
                    .filter(|e| matches!(e, SessionEvent::SessionExpired { .. }))
                    .count(),
                1,
                "preset {:?}",
                preset
            );
        }
    }

    #[test]
    fn one_tick_short_is_still_active() {
        let (mut session, now) = started_session(DurationPreset::Min15, PolicySet::default());
        deliver_ticks(&mut session, now, 899);

        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.remaining_seconds(), 1);
    }

    #[test]
    fn pause_then_resume_keeps_remaining_unchanged() {
        let (mut session, now) = started_session(DurationPreset::Min30, PolicySet::default());
        deliver_ticks(&mut session, now, 100);
        assert_eq!(session.remaining_seconds(), 1700);

        let paused_at = now + ChronoDuration::seconds(100);
        session.pause(paused_at).unwrap();
        assert_eq!(session.state(), SessionState::Paused);
        assert_eq!(session.remaining_seconds(), 1700);

        // A long pause must not cost any countdown time
        let resumed_at = paused_at + ChronoDuration::seconds(600);
        session.resume(resumed_at).unwrap();
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.remaining_seconds(), 1700);

        // And ticking continues from where it left off, with no drift event
        let events = deliver_ticks(&mut session, resumed_at, 10);
        assert_eq!(session.remaining_seconds(), 1690);
        assert!(events.is_empty());
    }

    #[test]
    fn second_pause_is_rejected_without_side_effects() {
        let (mut session, now) = started_session(DurationPreset::Min15, PolicySet::default());
        let paused_at = now + ChronoDuration::seconds(5);
        deliver_ticks(&mut session, now, 5);
        session.pause(paused_at).unwrap();

        let remaining = session.remaining_seconds();
        let err = session.pause(paused_at).unwrap_err();

        assert_eq!(
            err,
            GuardianError::InvalidTransition {
                state: SessionState::Paused,
                command: "pause",
            }
        );
        assert_eq!(session.state(), SessionState::Paused);
        assert_eq!(session.remaining_seconds(), remaining);
    }

    #[test]
    fn start_while_active_is_rejected_and_leaves_remaining_untouched() {
        let (mut session, now) = started_session(DurationPreset::Min15, PolicySet::default());
        deliver_ticks(&mut session, now, 100);
        let remaining = session.remaining_seconds();

        let err = session
            .start(PolicySet::default(), now + ChronoDuration::seconds(100))
            .unwrap_err();

        assert_eq!(err, GuardianError::SessionAlreadyActive);
        assert_eq!(session.remaining_seconds(), remaining);
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn start_from_terminal_state_requires_reset() {
        let (mut session, now) = started_session(DurationPreset::Min15, PolicySet::default());
        session.sos(now + ChronoDuration::seconds(1)).unwrap();

        let err = session
            .start(PolicySet::default(), now + ChronoDuration::seconds(2))
            .unwrap_err();
        assert_eq!(
            err,
            GuardianError::InvalidTransition {
                state: SessionState::SosTriggered,
                command: "start",
            }
        );
    }

    #[test]
    fn sos_from_active_bypasses_expiry() {
        let (mut session, now) = started_session(DurationPreset::Min15, PolicySet::default());
        let events = deliver_ticks(&mut session, now, 500);
        assert!(events.is_empty());

        let sos_at = now + ChronoDuration::seconds(500);
        let events = session.sos(sos_at).unwrap();

        assert_eq!(session.state(), SessionState::SosTriggered);
        assert_eq!(events.len(), 1);
        match &events[0] {
            SessionEvent::SosTriggered { payload, .. } => {
                assert_eq!(payload.remaining_seconds, 400);
            }
            other => panic!("expected SosTriggered, got {:?}", other),
        }

        // No further ticks have any effect
        let events = deliver_ticks(&mut session, sos_at, 10);
        assert!(events.is_empty());
        assert_eq!(session.state(), SessionState::SosTriggered);
    }

    #[test]
    fn sos_from_paused_works() {
        let (mut session, now) = started_session(DurationPreset::Min30, PolicySet::default());
        session.pause(now + ChronoDuration::seconds(1)).unwrap();

        let events = session.sos(now + ChronoDuration::seconds(2)).unwrap();
        assert_eq!(session.state(), SessionState::SosTriggered);
        assert!(matches!(events[0], SessionEvent::SosTriggered { .. }));
    }

    #[test]
    fn sos_from_ready_is_invalid() {
        let mut session = GuardianSession::new(DurationPreset::Min15);
        let err = session.sos(Local::now()).unwrap_err();
        assert_eq!(
            err,
            GuardianError::InvalidTransition {
                state: SessionState::Ready,
                command: "sos",
            }
        );
    }

    #[test]
    fn resume_from_active_is_invalid() {
        let (mut session, now) = started_session(DurationPreset::Min15, PolicySet::default());
        let err = session.resume(now + ChronoDuration::seconds(1)).unwrap_err();
        assert_eq!(
            err,
            GuardianError::InvalidTransition {
                state: SessionState::Active,
                command: "resume",
            }
        );
    }

    #[test]
    fn reset_returns_to_ready_with_selected_preset() {
        let (mut session, now) = started_session(DurationPreset::Min45, PolicySet::default());
        deliver_ticks(&mut session, now, 2700);
        assert_eq!(session.state(), SessionState::Expired);

        let events = session.reset().unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.remaining_seconds(), 2700);
        assert!(session.session_id().is_none());
        assert!(session.view().policy.is_none());
        assert!(matches!(
            events[0],
            SessionEvent::SessionReset {
                from_state: SessionState::Expired,
                ..
            }
        ));
    }

    #[test]
    fn reset_in_ready_is_idempotent_noop() {
        let mut session = GuardianSession::new(DurationPreset::Min15);
        let events = session.reset().unwrap();
        assert!(events.is_empty());
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn select_duration_locked_while_running() {
        let (mut session, now) = started_session(DurationPreset::Min15, PolicySet::default());

        let err = session.select_duration(DurationPreset::Min60).unwrap_err();
        assert_eq!(err, GuardianError::SessionLocked);

        session.pause(now + ChronoDuration::seconds(1)).unwrap();
        let err = session.select_duration(DurationPreset::Min60).unwrap_err();
        assert_eq!(err, GuardianError::SessionLocked);
    }

    #[test]
    fn select_duration_updates_next_start() {
        let mut session = GuardianSession::new(DurationPreset::Min15);
        session.select_duration(DurationPreset::Min60).unwrap();
        assert_eq!(session.remaining_seconds(), 3600);

        let now = Local::now();
        session.start(PolicySet::default(), now).unwrap();
        assert_eq!(session.remaining_seconds(), 3600);
    }

    #[test]
    fn policy_snapshot_is_captured_at_start() {
        let policy = PolicySet {
            notify_broker_on_expiry: true,
            continuous_gps_tracking: true,
            silent_emergency_signal: false,
        };
        let (session, _) = started_session(DurationPreset::Min15, policy);
        assert_eq!(session.view().policy, Some(policy));
    }

    #[test]
    fn suspend_gap_corrects_remaining_downward() {
        let (mut session, now) = started_session(DurationPreset::Min15, PolicySet::default());
        deliver_ticks(&mut session, now, 10);
        assert_eq!(session.remaining_seconds(), 890);

        // Process suspended for 5 minutes: next tick arrives with a large
        // wall-clock gap and only one tick to show for it
        let after_suspend = now + ChronoDuration::seconds(10 + 300);
        let events = session.tick(after_suspend);

        assert_eq!(session.remaining_seconds(), 900 - 310);
        assert!(matches!(
            events[0],
            SessionEvent::ClockDriftCorrected {
                remaining_seconds: 590,
                ..
            }
        ));
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn suspend_gap_past_deadline_expires_in_same_step() {
        let (mut session, now) = started_session(DurationPreset::Min15, PolicySet::default());

        let after_suspend = now + ChronoDuration::seconds(1200);
        let events = session.tick(after_suspend);

        assert_eq!(session.state(), SessionState::Expired);
        assert_eq!(session.remaining_seconds(), 0);
        assert!(matches!(events[0], SessionEvent::ClockDriftCorrected { .. }));
        assert!(matches!(events[1], SessionEvent::SessionExpired { .. }));
    }

    #[test]
    fn drift_correction_never_extends_countdown() {
        let (mut session, now) = started_session(DurationPreset::Min15, PolicySet::default());

        // Ticks arriving faster than wall clock (as under a paused test
        // clock) must not snap remaining back up
        for _ in 0..100 {
            session.tick(now);
        }
        assert_eq!(session.remaining_seconds(), 800);
    }

    #[test]
    fn location_flows_into_sos_payload() {
        let (mut session, now) = started_session(DurationPreset::Min15, PolicySet::default());
        let fix = GeoLocation {
            latitude: 51.5074,
            longitude: -0.1278,
            accuracy_m: Some(12.0),
        };
        session.note_location(fix);

        let events = session.sos(now + ChronoDuration::seconds(1)).unwrap();
        match &events[0] {
            SessionEvent::SosTriggered { payload, .. } => {
                assert_eq!(payload.location, Some(fix));
            }
            other => panic!("expected SosTriggered, got {:?}", other),
        }
    }
}
