//! Escalation dispatcher
//!
//! Consumes session events and performs the policy-gated side effects
//! through the external ports. Runs as its own worker so a slow or
//! unreachable port can never stall the countdown; the state transition
//! that produced an event is already committed when dispatch begins.

use guardian_api::{EscalationEvent, EscalationKind, GuardianError, PolicySet};
use guardian_config::DispatchConfig;
use guardian_ports::{
    AuditLogPort, BrokerNotificationPort, EmergencyTransmissionPort, GpsStreamPort, PortResult,
};
use guardian_util::SessionId;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::SessionEvent;

/// The external ports the dispatcher drives
#[derive(Clone)]
pub struct EscalationPorts {
    pub broker: Arc<dyn BrokerNotificationPort>,
    pub gps: Arc<dyn GpsStreamPort>,
    pub emergency: Arc<dyn EmergencyTransmissionPort>,
    pub audit: Arc<dyn AuditLogPort>,
}

/// Worker that maps session events to port calls
pub struct EscalationDispatcher {
    ports: EscalationPorts,
    retry: DispatchConfig,

    /// Policy snapshot of the session currently being tracked
    policy: Option<PolicySet>,
    /// Whether the continuous GPS stream is currently running
    gps_streaming: bool,
}

impl EscalationDispatcher {
    /// Spawn the dispatch worker consuming `rx`
    pub fn spawn(
        ports: EscalationPorts,
        retry: DispatchConfig,
        mut rx: mpsc::UnboundedReceiver<SessionEvent>,
    ) -> JoinHandle<()> {
        let mut dispatcher = Self {
            ports,
            retry,
            policy: None,
            gps_streaming: false,
        };

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                dispatcher.handle(event).await;
            }
            debug!("Escalation dispatcher stopped");
        })
    }

    async fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::SessionStarted {
                session_id, policy, ..
            } => {
                self.policy = Some(policy);
                if policy.continuous_gps_tracking {
                    self.start_stream(session_id).await;
                }
            }

            SessionEvent::SessionPaused { session_id, .. } => {
                self.stop_stream(session_id).await;
            }

            SessionEvent::SessionResumed { session_id, .. } => {
                if self.tracking_enabled() {
                    self.start_stream(session_id).await;
                }
            }

            SessionEvent::SessionExpired {
                session_id,
                location,
            } => {
                // Expiry is always audited, whatever the policy says
                self.ports
                    .audit
                    .record(EscalationEvent::new(EscalationKind::Expired, session_id));

                // Stream teardown strictly precedes the broker notification
                self.stop_stream(session_id).await;

                if self.policy.is_some_and(|p| p.notify_broker_on_expiry) {
                    let broker = self.ports.broker.clone();
                    let delivered = self
                        .with_retry("broker_notify", session_id, || {
                            let broker = broker.clone();
                            async move { broker.notify(session_id, location).await }
                        })
                        .await;

                    if delivered {
                        self.ports.audit.record(
                            EscalationEvent::new(EscalationKind::BrokerNotified, session_id)
                                .with_payload(serde_json::json!({
                                    "has_location": location.is_some(),
                                })),
                        );
                    }
                }

                self.policy = None;
            }

            SessionEvent::SosTriggered {
                session_id,
                payload,
            } => {
                self.ports.audit.record(
                    EscalationEvent::new(EscalationKind::SosTriggered, session_id).with_payload(
                        serde_json::json!({
                            "remaining_seconds": payload.remaining_seconds,
                        }),
                    ),
                );

                self.stop_stream(session_id).await;

                // SOS is an unconditional override, never policy-gated
                let emergency = self.ports.emergency.clone();
                self.with_retry("emergency_transmit", session_id, || {
                    let emergency = emergency.clone();
                    let payload = payload.clone();
                    async move { emergency.transmit(session_id, payload).await }
                })
                .await;

                self.policy = None;
            }

            SessionEvent::SessionReset { session_id, .. } => {
                self.stop_stream(session_id).await;
                self.policy = None;
            }

            SessionEvent::ClockDriftCorrected {
                session_id,
                remaining_seconds,
                drift_seconds,
            } => {
                self.ports.audit.record(
                    EscalationEvent::new(EscalationKind::ClockDriftCorrected, session_id)
                        .with_payload(serde_json::json!({
                            "remaining_seconds": remaining_seconds,
                            "drift_seconds": drift_seconds,
                        })),
                );
            }
        }
    }

    fn tracking_enabled(&self) -> bool {
        self.policy.is_some_and(|p| p.continuous_gps_tracking)
    }

    async fn start_stream(&mut self, session_id: SessionId) {
        if self.gps_streaming {
            return;
        }
        let gps = self.ports.gps.clone();
        let started = self
            .with_retry("gps_start", session_id, || {
                let gps = gps.clone();
                async move { gps.start(session_id).await }
            })
            .await;

        if started {
            self.gps_streaming = true;
            self.ports
                .audit
                .record(EscalationEvent::new(EscalationKind::GpsStreamStarted, session_id));
        }
    }

    async fn stop_stream(&mut self, session_id: SessionId) {
        if !self.gps_streaming {
            return;
        }
        // Marked stopped up front: the stream must never be considered live
        // past the transition out of ACTIVE
        self.gps_streaming = false;

        let gps = self.ports.gps.clone();
        let stopped = self
            .with_retry("gps_stop", session_id, || {
                let gps = gps.clone();
                async move { gps.stop(session_id).await }
            })
            .await;

        if stopped {
            self.ports
                .audit
                .record(EscalationEvent::new(EscalationKind::GpsStreamStopped, session_id));
        }
    }

    /// Run a port call with bounded exponential backoff. Returns whether the
    /// call eventually succeeded; final failure is audited as DispatchFailed.
    async fn with_retry<F, Fut>(&self, op: &'static str, session_id: SessionId, mut call: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PortResult<()>>,
    {
        let mut backoff = self.retry.initial_backoff;

        for attempt in 1..=self.retry.max_attempts {
            match call().await {
                Ok(()) => return true,
                Err(e) if attempt < self.retry.max_attempts => {
                    debug!(
                        op,
                        session_id = %session_id,
                        attempt,
                        error = %e,
                        "Port call failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.retry.max_backoff);
                }
                Err(e) => {
                    let err = GuardianError::DispatchFailed {
                        attempts: attempt,
                        message: e.to_string(),
                    };
                    warn!(op, session_id = %session_id, error = %err, "Escalation dispatch failed");
                    self.ports.audit.record(
                        EscalationEvent::new(EscalationKind::DispatchFailed, session_id)
                            .with_payload(serde_json::json!({
                                "op": op,
                                "attempts": attempt,
                                "error": e.to_string(),
                            })),
                    );
                }
            }
        }

        false
    }
}
