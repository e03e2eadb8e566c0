//! BLE transport seam.
//!
//! The [`crate::ConnectionManager`] drives discovery, connection and
//! subscription through these traits. Implementations only move bytes; every
//! decision (retry, characteristic selection, reconnect) is made by the
//! manager.
//!
//! # Implementations
//!
//! - **Daemon**: btleplug on the first system adapter
//! - **Simulation**: scripted sessions with injected notifications and
//!   disconnects

use std::{future::Future, time::Duration};

use uuid::Uuid;

/// What to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTarget<D> {
    /// Platform-specific address from the configuration
    Address(String),
    /// Device found by a name scan
    Discovered(D),
}

/// GATT characteristic as enumerated after connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicInfo {
    /// Owning service
    pub service: Uuid,
    /// Characteristic UUID
    pub uuid: Uuid,
    /// Advertises the `notify` property
    pub notify: bool,
}

/// Event delivered by an active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Notification payload from the subscribed characteristic
    Notification(Vec<u8>),
    /// The peripheral went away
    Disconnected,
}

/// Discovery and connection.
pub trait Transport: Send {
    /// Transport-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Handle for a device returned by a scan.
    type Device: Clone + Send + Sync;

    /// Live connection.
    type Session: Session<Error = Self::Error>;

    /// Whether the platform can connect by address without scanning by name.
    fn supports_address_connect(&self) -> bool;

    /// Scan for a device advertising `name`.
    ///
    /// Returns `None` if nothing matched within `timeout`.
    fn scan_by_name(
        &mut self,
        name: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<Self::Device>, Self::Error>> + Send;

    /// Single connection attempt.
    fn connect(
        &mut self,
        target: &DeviceTarget<Self::Device>,
    ) -> impl Future<Output = Result<Self::Session, Self::Error>> + Send;
}

/// Connected peripheral, owned by the connection manager.
///
/// Dropping a session does not tear the link down. The manager calls
/// [`Session::close`] on every session it abandons while still connected;
/// a session that reported `Disconnected` is dropped as is.
pub trait Session: Send {
    /// Transport-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Enumerate services and characteristics.
    fn characteristics(
        &mut self,
    ) -> impl Future<Output = Result<Vec<CharacteristicInfo>, Self::Error>> + Send;

    /// Enable notifications on `characteristic`.
    fn subscribe(
        &mut self,
        characteristic: &CharacteristicInfo,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Wait for the next notification or the disconnect signal.
    ///
    /// After `Disconnected` the session is dead and is dropped.
    fn next_event(&mut self) -> impl Future<Output = SessionEvent> + Send;

    /// Disconnect from the peripheral. Failures are logged, not returned.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
