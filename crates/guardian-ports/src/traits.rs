//! Port trait definitions

use async_trait::async_trait;
use guardian_api::{EscalationEvent, GeoLocation, SosPayload};
use guardian_util::SessionId;
use thiserror::Error;

/// Errors from port operations
#[derive(Debug, Error)]
pub enum PortError {
    #[error("port unreachable: {0}")]
    Unreachable(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PortResult<T> = Result<T, PortError>;

/// Notifies the broker contact that a session expired without check-in
#[async_trait]
pub trait BrokerNotificationPort: Send + Sync {
    async fn notify(
        &self,
        session_id: SessionId,
        location: Option<GeoLocation>,
    ) -> PortResult<()>;
}

/// Controls the continuous location stream. Stream lifetime is bound
/// strictly to the ACTIVE session state.
#[async_trait]
pub trait GpsStreamPort: Send + Sync {
    async fn start(&self, session_id: SessionId) -> PortResult<()>;
    async fn stop(&self, session_id: SessionId) -> PortResult<()>;
}

/// Transmits the unconditional SOS alert
#[async_trait]
pub trait EmergencyTransmissionPort: Send + Sync {
    async fn transmit(&self, session_id: SessionId, payload: SosPayload) -> PortResult<()>;
}

/// Receives every escalation event. Recording is best-effort and must not
/// fail the caller.
pub trait AuditLogPort: Send + Sync {
    fn record(&self, event: EscalationEvent);
}
