//! Tracing-backed port adapters
//!
//! Stand-ins used by guardiand until real transports are wired by the host
//! application: each adapter logs the action it would transmit.

use async_trait::async_trait;
use guardian_api::{EscalationEvent, GeoLocation, SosPayload};
use guardian_util::SessionId;
use tracing::{info, warn};

use crate::{
    AuditLogPort, BrokerNotificationPort, EmergencyTransmissionPort, GpsStreamPort, PortResult,
};

/// Logs broker notifications instead of sending them
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingBrokerPort;

#[async_trait]
impl BrokerNotificationPort for LoggingBrokerPort {
    async fn notify(
        &self,
        session_id: SessionId,
        location: Option<GeoLocation>,
    ) -> PortResult<()> {
        info!(
            session_id = %session_id,
            has_location = location.is_some(),
            "Broker notification"
        );
        Ok(())
    }
}

/// Logs GPS stream start/stop instead of streaming
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingGpsPort;

#[async_trait]
impl GpsStreamPort for LoggingGpsPort {
    async fn start(&self, session_id: SessionId) -> PortResult<()> {
        info!(session_id = %session_id, "GPS stream started");
        Ok(())
    }

    async fn stop(&self, session_id: SessionId) -> PortResult<()> {
        info!(session_id = %session_id, "GPS stream stopped");
        Ok(())
    }
}

/// Logs SOS transmissions instead of sending them
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEmergencyPort;

#[async_trait]
impl EmergencyTransmissionPort for LoggingEmergencyPort {
    async fn transmit(&self, session_id: SessionId, payload: SosPayload) -> PortResult<()> {
        warn!(
            session_id = %session_id,
            remaining_secs = payload.remaining_seconds,
            has_location = payload.location.is_some(),
            "EMERGENCY transmission"
        );
        Ok(())
    }
}

/// Records escalation events as structured log lines
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditLog;

impl AuditLogPort for TracingAuditLog {
    fn record(&self, event: EscalationEvent) {
        info!(
            session_id = %event.session_id,
            kind = ?event.kind,
            payload = %event.payload,
            "Escalation event"
        );
    }
}
