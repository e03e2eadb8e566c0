//! Connection lifecycle.
//!
//! Owns the transport, the live session and the keyboard. Establishes a
//! session, subscribes to the input characteristic, pushes every payload
//! through decode, resolve and dispatch, and starts over whenever the
//! peripheral disconnects.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐ discover+connect ┌────────────┐  success  ┌───────────┐
//! │ Disconnected │─────────────────>│ Connecting │──────────>│ Connected │
//! └──────────────┘                  └────────────┘           └───────────┘
//!        ^                             │  ^  connect failed        │
//!        │                             └──┘  (retry interval)      │ subscribe
//!        │         disconnect signal              ┌──────────────┐ │
//!        └────────────────────────────────────────│ NotifyActive │<┘
//!                                                 └──────────────┘
//! ```
//!
//! There is no terminal state: [`ConnectionManager::run`] only returns on a
//! fatal error.
//!
//! # Concurrency
//!
//! One cooperative task. The session is owned by the manager and borrowed by
//! the notification loop, so a payload is always processed against the
//! session that delivered it. Each payload, including its key side effects,
//! is fully processed before the next event is awaited.

use std::{convert::Infallible, num::NonZeroU32, time::Duration};

use aiokey_proto::{
    decode,
    gatt::{AUTOMATION_IO_SERVICE, DIGITAL_INPUT_CHARACTERISTIC},
};

use crate::{
    config::Config,
    dispatch::{DispatchError, Dispatcher},
    env::Environment,
    error::AdapterError,
    keyboard::Keyboard,
    transport::{CharacteristicInfo, DeviceTarget, Session, SessionEvent, Transport},
};

/// How long a name scan may run before the device counts as not found.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(60);

/// Fixed delay between connect attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session
    Disconnected,
    /// Discovering the device and attempting to connect
    Connecting,
    /// Connected, input characteristic not yet subscribed
    Connected,
    /// Subscribed and processing notifications
    NotifyActive,
}

/// Connect retry policy.
///
/// The adapter is meant for peripherals that are switched off for long
/// stretches, so the default retries forever at a fixed interval with no
/// backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay between attempts
    pub interval: Duration,
    /// `None` retries forever
    pub max_attempts: Option<NonZeroU32>,
}

impl RetryPolicy {
    /// Retry forever at `interval`.
    pub const fn unbounded(interval: Duration) -> Self {
        Self { interval, max_attempts: None }
    }

    /// Give up after `max_attempts` attempts.
    pub const fn bounded(interval: Duration, max_attempts: NonZeroU32) -> Self {
        Self { interval, max_attempts: Some(max_attempts) }
    }

    /// Whether another attempt may follow attempt number `attempt`
    /// (1-based).
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt < max.get())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(DEFAULT_RETRY_INTERVAL)
    }
}

/// Connection manager settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerSettings {
    /// Name scan timeout
    pub scan_timeout: Duration,
    /// Connect retry policy
    pub retry: RetryPolicy,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self { scan_timeout: DEFAULT_SCAN_TIMEOUT, retry: RetryPolicy::default() }
    }
}

/// Callback invoked with `(from, to)` on every state change.
pub type StateObserver = Box<dyn FnMut(ConnectionState, ConnectionState) + Send>;

/// Drives one peripheral from discovery to key synthesis, indefinitely.
///
/// # Type Parameters
///
/// - `T`: BLE transport
/// - `K`: key synthesis
/// - `E`: time source for retry delays
pub struct ConnectionManager<T, K, E>
where
    T: Transport,
    K: Keyboard,
    E: Environment,
{
    transport: T,
    keyboard: K,
    env: E,
    dispatcher: Dispatcher,
    settings: ManagerSettings,
    state: ConnectionState,
    observer: Option<StateObserver>,
    sessions: u64,
}

impl<T, K, E> ConnectionManager<T, K, E>
where
    T: Transport,
    K: Keyboard,
    E: Environment,
{
    /// Create a manager in [`ConnectionState::Disconnected`] with default
    /// settings.
    pub fn new(config: Config, transport: T, keyboard: K, env: E) -> Self {
        Self {
            transport,
            keyboard,
            env,
            dispatcher: Dispatcher::new(config),
            settings: ManagerSettings::default(),
            state: ConnectionState::Disconnected,
            observer: None,
            sessions: 0,
        }
    }

    /// Replace the default settings.
    #[must_use]
    pub fn with_settings(mut self, settings: ManagerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Report every state change to `observer`, after it is logged.
    #[must_use]
    pub fn with_state_observer(
        mut self,
        observer: impl FnMut(ConnectionState, ConnectionState) + Send + 'static,
    ) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Configuration in use.
    pub fn config(&self) -> &Config {
        self.dispatcher.config()
    }

    /// Number of sessions that reached [`ConnectionState::NotifyActive`].
    pub fn sessions_established(&self) -> u64 {
        self.sessions
    }

    /// The keyboard receiving key actions.
    pub fn keyboard(&self) -> &K {
        &self.keyboard
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Reject configurations the platform cannot serve.
    ///
    /// # Errors
    ///
    /// - `AdapterError::AddressConnectUnsupported` if only an address is
    ///   configured and the transport cannot connect by address
    pub fn check_platform(&self) -> Result<(), AdapterError> {
        let config = self.config();
        if config.name().is_none() && !self.transport.supports_address_connect() {
            return Err(AdapterError::AddressConnectUnsupported);
        }
        Ok(())
    }

    /// Run the connect/subscribe/notify cycle until a fatal error.
    ///
    /// Disconnects and transport failures start a new cycle; only fatal
    /// errors return.
    pub async fn run(&mut self) -> Result<Infallible, AdapterError> {
        self.check_platform()?;

        loop {
            let mut session = match self.establish().await {
                Ok(session) => session,
                Err(err) if err.is_transient() => {
                    tracing::warn!(error = %err, "session setup failed, starting over");
                    self.transition(ConnectionState::Disconnected);
                    self.env.sleep(self.settings.retry.interval).await;
                    continue;
                },
                Err(err) => return Err(err),
            };

            self.serve(&mut session).await?;
        }
    }

    /// Discover, connect and subscribe.
    ///
    /// Ends in [`ConnectionState::NotifyActive`] and hands the session to the
    /// caller, who feeds it to [`Self::serve`]. A session that connects but
    /// fails to subscribe is closed before the error is returned.
    ///
    /// # Errors
    ///
    /// - `AdapterError::DeviceNotFound` if the name scan finds nothing
    /// - `AdapterError::RetriesExhausted` if a bounded retry policy runs out
    /// - `AdapterError::CharacteristicNotFound` if the device lacks the
    ///   notifying input characteristic
    /// - `AdapterError::Transport` if enumeration or subscription fails
    pub async fn establish(&mut self) -> Result<T::Session, AdapterError> {
        self.transition(ConnectionState::Connecting);
        let started = self.env.now();

        let target = self.resolve_target().await?;
        let mut session = self.connect_with_retry(&target).await?;
        self.transition(ConnectionState::Connected);

        if let Err(err) = subscribe_input(&mut session).await {
            session.close().await;
            return Err(err);
        }

        self.sessions += 1;
        self.transition(ConnectionState::NotifyActive);
        tracing::info!(elapsed = ?(self.env.now() - started), "waiting for notifications");

        Ok(session)
    }

    /// Process notifications until the session disconnects.
    ///
    /// Returns `Ok(())` on disconnect, leaving the manager in
    /// [`ConnectionState::Disconnected`].
    ///
    /// # Errors
    ///
    /// - `AdapterError::Dispatch` on a fatal configuration conflict; the
    ///   session is closed first
    pub async fn serve(&mut self, session: &mut T::Session) -> Result<(), AdapterError> {
        loop {
            match session.next_event().await {
                SessionEvent::Notification(payload) => {
                    if let Err(err) = self.handle_payload(&payload) {
                        session.close().await;
                        return Err(err);
                    }
                },
                SessionEvent::Disconnected => {
                    tracing::warn!("peripheral disconnected");
                    self.transition(ConnectionState::Disconnected);
                    return Ok(());
                },
            }
        }
    }

    /// Decode one payload and execute the resulting key actions, pin by pin.
    ///
    /// A lookup error abandons the rest of the payload; pins before it have
    /// already been acted on.
    ///
    /// # Errors
    ///
    /// - `AdapterError::Dispatch` on a fatal configuration conflict
    pub fn handle_payload(&mut self, payload: &[u8]) -> Result<(), AdapterError> {
        tracing::debug!(
            len = payload.len(),
            payload = format_args!("{payload:02x?}"),
            "notification"
        );

        for event in decode(payload) {
            tracing::trace!(pin = event.pin, pressed = event.pressed, "pin state");

            let actions = match self.dispatcher.dispatch(event) {
                Ok(actions) => actions,
                Err(DispatchError::Resolve(err)) => {
                    tracing::error!(error = %err, "abandoning notification");
                    return Ok(());
                },
                Err(err) => return Err(err.into()),
            };

            for action in &actions {
                tracing::debug!(pin = event.pin, ?action, "key action");
                self.keyboard.apply(action);
            }
        }

        Ok(())
    }

    async fn resolve_target(&mut self) -> Result<DeviceTarget<T::Device>, AdapterError> {
        let config = self.dispatcher.config();

        if let Some(address) = config.address()
            && self.transport.supports_address_connect()
        {
            return Ok(DeviceTarget::Address(address.to_owned()));
        }

        let Some(name) = config.name().map(str::to_owned) else {
            return Err(AdapterError::AddressConnectUnsupported);
        };

        let timeout = self.settings.scan_timeout;
        tracing::info!(%name, ?timeout, "scanning");

        match self.transport.scan_by_name(&name, timeout).await {
            Ok(Some(device)) => Ok(DeviceTarget::Discovered(device)),
            Ok(None) => Err(AdapterError::DeviceNotFound { name, timeout }),
            Err(err) => Err(AdapterError::transport(err)),
        }
    }

    async fn connect_with_retry(
        &mut self,
        target: &DeviceTarget<T::Device>,
    ) -> Result<T::Session, AdapterError> {
        let retry = self.settings.retry;
        let mut attempt: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);

            match self.transport.connect(target).await {
                Ok(session) => {
                    tracing::info!(attempt, "connected");
                    return Ok(session);
                },
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "connect failed");

                    if !retry.allows_retry_after(attempt) {
                        return Err(AdapterError::RetriesExhausted {
                            attempts: attempt,
                            last_error: err.to_string(),
                        });
                    }

                    self.env.sleep(retry.interval).await;
                },
            }
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }

        tracing::info!(from = ?self.state, to = ?next, "connection state");
        if let Some(observer) = self.observer.as_mut() {
            observer(self.state, next);
        }
        self.state = next;
    }
}

async fn subscribe_input<S: Session>(session: &mut S) -> Result<(), AdapterError> {
    let characteristics = session.characteristics().await.map_err(AdapterError::transport)?;
    let input = find_input_characteristic(&characteristics)?;
    session.subscribe(&input).await.map_err(AdapterError::transport)
}

/// Pick the notifying digital input characteristic of the Automation IO
/// service.
///
/// # Errors
///
/// - `AdapterError::CharacteristicNotFound` if no characteristic matches
pub fn find_input_characteristic(
    characteristics: &[CharacteristicInfo],
) -> Result<CharacteristicInfo, AdapterError> {
    characteristics
        .iter()
        .find(|c| {
            c.service == AUTOMATION_IO_SERVICE && c.uuid == DIGITAL_INPUT_CHARACTERISTIC && c.notify
        })
        .cloned()
        .ok_or(AdapterError::CharacteristicNotFound)
}
