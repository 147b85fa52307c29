//! Mock ports for testing
//!
//! `MockPorts` records every call in a single ordered log so tests can
//! assert both counts and relative ordering (e.g. GPS stream stopped
//! before the broker was notified).

use async_trait::async_trait;
use guardian_api::{EscalationEvent, GeoLocation, SosPayload};
use guardian_util::SessionId;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::{
    AuditLogPort, BrokerNotificationPort, EmergencyTransmissionPort, GpsStreamPort, PortError,
    PortResult,
};

/// One recorded port call
#[derive(Debug, Clone, PartialEq)]
pub enum PortCall {
    BrokerNotify {
        session_id: SessionId,
        location: Option<GeoLocation>,
    },
    GpsStart {
        session_id: SessionId,
    },
    GpsStop {
        session_id: SessionId,
    },
    EmergencyTransmit {
        session_id: SessionId,
        payload: SosPayload,
    },
}

impl PortCall {
    pub fn name(&self) -> &'static str {
        match self {
            PortCall::BrokerNotify { .. } => "broker_notify",
            PortCall::GpsStart { .. } => "gps_start",
            PortCall::GpsStop { .. } => "gps_stop",
            PortCall::EmergencyTransmit { .. } => "emergency_transmit",
        }
    }
}

/// Mock implementation of all four ports with an ordered call log
#[derive(Clone, Default)]
pub struct MockPorts {
    calls: Arc<Mutex<Vec<PortCall>>>,
    audits: Arc<Mutex<Vec<EscalationEvent>>>,

    /// Fail the next N broker notifications (for retry tests)
    fail_broker_next: Arc<AtomicU32>,
    /// Fail the next N emergency transmissions
    fail_emergency_next: Arc<AtomicU32>,
}

impl MockPorts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful (non-failed) calls, in order
    pub fn calls(&self) -> Vec<PortCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Call names in order, for compact ordering assertions
    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().iter().map(|c| c.name()).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.name() == name)
            .count()
    }

    /// Audit events recorded so far
    pub fn audits(&self) -> Vec<EscalationEvent> {
        self.audits.lock().unwrap().clone()
    }

    /// Make the next `n` broker notifications fail with Unreachable
    pub fn fail_broker_times(&self, n: u32) {
        self.fail_broker_next.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` emergency transmissions fail with Unreachable
    pub fn fail_emergency_times(&self, n: u32) {
        self.fail_emergency_next.store(n, Ordering::SeqCst);
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl BrokerNotificationPort for MockPorts {
    async fn notify(
        &self,
        session_id: SessionId,
        location: Option<GeoLocation>,
    ) -> PortResult<()> {
        if Self::take_failure(&self.fail_broker_next) {
            return Err(PortError::Unreachable("mock broker failure".into()));
        }
        self.calls.lock().unwrap().push(PortCall::BrokerNotify {
            session_id,
            location,
        });
        Ok(())
    }
}

#[async_trait]
impl GpsStreamPort for MockPorts {
    async fn start(&self, session_id: SessionId) -> PortResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(PortCall::GpsStart { session_id });
        Ok(())
    }

    async fn stop(&self, session_id: SessionId) -> PortResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(PortCall::GpsStop { session_id });
        Ok(())
    }
}

#[async_trait]
impl EmergencyTransmissionPort for MockPorts {
    async fn transmit(&self, session_id: SessionId, payload: SosPayload) -> PortResult<()> {
        if Self::take_failure(&self.fail_emergency_next) {
            return Err(PortError::Unreachable("mock emergency failure".into()));
        }
        self.calls.lock().unwrap().push(PortCall::EmergencyTransmit {
            session_id,
            payload,
        });
        Ok(())
    }
}

impl AuditLogPort for MockPorts {
    fn record(&self, event: EscalationEvent) {
        self.audits.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_in_order() {
        let ports = MockPorts::new();
        let id = SessionId::new();

        ports.start(id).await.unwrap();
        ports.stop(id).await.unwrap();
        ports.notify(id, None).await.unwrap();

        assert_eq!(ports.call_names(), vec!["gps_start", "gps_stop", "broker_notify"]);
    }

    #[tokio::test]
    async fn broker_failure_injection_is_consumed() {
        let ports = MockPorts::new();
        let id = SessionId::new();
        ports.fail_broker_times(1);

        assert!(ports.notify(id, None).await.is_err());
        assert!(ports.notify(id, None).await.is_ok());
        assert_eq!(ports.count("broker_notify"), 1);
    }
}
