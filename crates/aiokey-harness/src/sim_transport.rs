//! Scripted BLE transport.
//!
//! `SimTransport` implements [`Transport`] against an in-memory script. The
//! transport and every session it hands out share one [`TransportLog`], so a
//! test can inspect scans, connect attempts and subscriptions after the
//! manager has consumed the sessions.

use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use aiokey_core::{CharacteristicInfo, DeviceTarget, Session, SessionEvent, Transport};
use aiokey_proto::gatt::{AUTOMATION_IO_SERVICE, DIGITAL_INPUT_CHARACTERISTIC};

/// Error type for the simulated transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimTransportError(pub String);

impl std::fmt::Display for SimTransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimTransportError: {}", self.0)
    }
}

impl std::error::Error for SimTransportError {}

/// Device found by a simulated scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimDevice {
    /// Advertised local name
    pub name: String,
}

/// Everything the manager asked of the transport, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportLog {
    /// Name scans with their timeout
    pub scans: Vec<(String, Duration)>,
    /// Connect attempts, successful or not
    pub connects: Vec<DeviceTarget<SimDevice>>,
    /// Characteristics subscribed to
    pub subscriptions: Vec<CharacteristicInfo>,
    /// Sessions closed by the manager rather than by a disconnect
    pub closes: u32,
}

#[derive(Default)]
struct SharedState {
    advertised: HashSet<String>,
    scan_failures: u32,
    connect_failures: u32,
    sessions: VecDeque<SimSession>,
    log: TransportLog,
}

type Shared = Arc<Mutex<SharedState>>;

fn lock(state: &Shared) -> MutexGuard<'_, SharedState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted [`Transport`].
pub struct SimTransport {
    state: Shared,
    address_connect: bool,
}

impl Default for SimTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SimTransport {
    /// Create a transport that supports address connects and has nothing
    /// advertised.
    pub fn new() -> Self {
        Self { state: Shared::default(), address_connect: true }
    }

    /// Model a platform that can only connect to scanned devices.
    #[must_use]
    pub fn without_address_connect(mut self) -> Self {
        self.address_connect = false;
        self
    }

    /// Make a device with `name` visible to scans.
    #[must_use]
    pub fn advertising(self, name: &str) -> Self {
        lock(&self.state).advertised.insert(name.to_owned());
        self
    }

    /// Fail the next `count` scans with a transport error.
    #[must_use]
    pub fn failing_scans(self, count: u32) -> Self {
        lock(&self.state).scan_failures = count;
        self
    }

    /// Fail the next `count` connect attempts before handing out sessions.
    #[must_use]
    pub fn failing_connects(self, count: u32) -> Self {
        lock(&self.state).connect_failures = count;
        self
    }

    /// Queue a session for the next successful connect.
    #[must_use]
    pub fn with_session(self, session: SimSession) -> Self {
        lock(&self.state).sessions.push_back(session);
        self
    }

    /// Snapshot of the interaction log.
    pub fn log(&self) -> TransportLog {
        lock(&self.state).log.clone()
    }

    /// Sessions not yet handed out.
    pub fn remaining_sessions(&self) -> usize {
        lock(&self.state).sessions.len()
    }
}

impl Transport for SimTransport {
    type Error = SimTransportError;
    type Device = SimDevice;
    type Session = SimSession;

    fn supports_address_connect(&self) -> bool {
        self.address_connect
    }

    async fn scan_by_name(
        &mut self,
        name: &str,
        timeout: Duration,
    ) -> Result<Option<SimDevice>, SimTransportError> {
        let mut state = lock(&self.state);
        state.log.scans.push((name.to_owned(), timeout));

        if state.scan_failures > 0 {
            state.scan_failures -= 1;
            return Err(SimTransportError("adapter unavailable".into()));
        }

        Ok(state.advertised.contains(name).then(|| SimDevice { name: name.to_owned() }))
    }

    async fn connect(
        &mut self,
        target: &DeviceTarget<SimDevice>,
    ) -> Result<SimSession, SimTransportError> {
        let mut state = lock(&self.state);
        state.log.connects.push(target.clone());

        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(SimTransportError("connection refused".into()));
        }

        let Some(mut session) = state.sessions.pop_front() else {
            return Err(SimTransportError("device unreachable".into()));
        };

        tracing::debug!(?target, "sim connect");
        session.state = Some(Arc::clone(&self.state));
        Ok(session)
    }
}

/// Scripted [`Session`].
///
/// Replays its events in order and reports a disconnect once they run out.
#[derive(Clone)]
pub struct SimSession {
    characteristics: Vec<CharacteristicInfo>,
    events: VecDeque<SessionEvent>,
    subscribe_fails: bool,
    state: Option<Shared>,
}

impl Default for SimSession {
    fn default() -> Self {
        Self::automation_io()
    }
}

impl SimSession {
    /// Session exposing the notifying digital input characteristic.
    pub fn automation_io() -> Self {
        Self::with_characteristics(vec![CharacteristicInfo {
            service: AUTOMATION_IO_SERVICE,
            uuid: DIGITAL_INPUT_CHARACTERISTIC,
            notify: true,
        }])
    }

    /// Session whose only input characteristic cannot notify.
    pub fn without_input() -> Self {
        Self::with_characteristics(vec![CharacteristicInfo {
            service: AUTOMATION_IO_SERVICE,
            uuid: DIGITAL_INPUT_CHARACTERISTIC,
            notify: false,
        }])
    }

    /// Session exposing exactly `characteristics`.
    pub fn with_characteristics(characteristics: Vec<CharacteristicInfo>) -> Self {
        Self { characteristics, events: VecDeque::new(), subscribe_fails: false, state: None }
    }

    /// Reject the subscription with a transport error.
    #[must_use]
    pub fn failing_subscribe(mut self) -> Self {
        self.subscribe_fails = true;
        self
    }

    /// Queue a notification payload.
    #[must_use]
    pub fn notify(mut self, payload: &[u8]) -> Self {
        self.events.push_back(SessionEvent::Notification(payload.to_vec()));
        self
    }

    /// Queue a disconnect. Events queued after it are never delivered.
    #[must_use]
    pub fn disconnect(mut self) -> Self {
        self.events.push_back(SessionEvent::Disconnected);
        self
    }
}

impl Session for SimSession {
    type Error = SimTransportError;

    async fn characteristics(&mut self) -> Result<Vec<CharacteristicInfo>, SimTransportError> {
        Ok(self.characteristics.clone())
    }

    async fn subscribe(
        &mut self,
        characteristic: &CharacteristicInfo,
    ) -> Result<(), SimTransportError> {
        if self.subscribe_fails {
            return Err(SimTransportError("subscribe rejected".into()));
        }

        if let Some(state) = &self.state {
            lock(state).log.subscriptions.push(characteristic.clone());
        }
        Ok(())
    }

    async fn next_event(&mut self) -> SessionEvent {
        self.events.pop_front().unwrap_or(SessionEvent::Disconnected)
    }

    async fn close(&mut self) {
        self.events.clear();
        if let Some(state) = &self.state {
            lock(state).log.closes += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scan_finds_only_advertised_names() {
        let mut transport = SimTransport::new().advertising("AIO");

        let found = transport.scan_by_name("AIO", Duration::from_secs(1)).await.unwrap();
        let missing = transport.scan_by_name("other", Duration::from_secs(1)).await.unwrap();

        assert_eq!(found, Some(SimDevice { name: "AIO".into() }));
        assert_eq!(missing, None);
        assert_eq!(transport.log().scans.len(), 2);
    }

    #[tokio::test]
    async fn connect_fails_then_hands_out_sessions_in_order() {
        let mut transport = SimTransport::new()
            .failing_connects(1)
            .with_session(SimSession::automation_io().notify(&[0xfe]));
        let target = DeviceTarget::Address("00:11:22:33:44:55".into());

        assert!(transport.connect(&target).await.is_err());

        let mut session = transport.connect(&target).await.unwrap();
        assert_eq!(session.next_event().await, SessionEvent::Notification(vec![0xfe]));
        assert_eq!(session.next_event().await, SessionEvent::Disconnected);

        assert!(transport.connect(&target).await.is_err());
        assert_eq!(transport.log().connects.len(), 3);
    }

    #[tokio::test]
    async fn subscriptions_are_logged_on_the_transport() {
        let mut transport = SimTransport::new().with_session(SimSession::automation_io());
        let mut session =
            transport.connect(&DeviceTarget::Address("00:11:22:33:44:55".into())).await.unwrap();

        let characteristics = session.characteristics().await.unwrap();
        session.subscribe(&characteristics[0]).await.unwrap();

        assert_eq!(transport.log().subscriptions, characteristics);
    }

    #[tokio::test]
    async fn closed_session_drops_pending_events() {
        let mut transport =
            SimTransport::new().with_session(SimSession::automation_io().notify(&[0xfe]));
        let mut session =
            transport.connect(&DeviceTarget::Address("00:11:22:33:44:55".into())).await.unwrap();

        session.close().await;

        assert_eq!(session.next_event().await, SessionEvent::Disconnected);
        assert_eq!(transport.log().closes, 1);
    }
}
