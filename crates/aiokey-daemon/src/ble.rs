//! BLE transport on top of `btleplug`.
//!
//! Uses the first adapter the platform reports. Discovery runs an active scan
//! and matches peripherals as they are discovered or updated, so a device
//! that is already known to the OS is found without waiting for a fresh
//! advertisement.

use std::{pin::Pin, time::Duration};

use aiokey_core::{CharacteristicInfo, DeviceTarget, Session, SessionEvent, Transport};
use btleplug::{
    api::{
        BDAddr, Central, CentralEvent, CharPropFlags, Manager as _, Peripheral as _, ScanFilter,
        ValueNotification,
    },
    platform::{Adapter, Manager, Peripheral},
};
use futures::{Stream, StreamExt};
use thiserror::Error;
use uuid::Uuid;

/// How long to scan for a configured address before the attempt fails.
const ADDRESS_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

type EventStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// BLE transport errors.
#[derive(Error, Debug)]
pub enum BleError {
    /// Error from the platform BLE stack
    #[error(transparent)]
    Btleplug(#[from] btleplug::Error),

    /// The platform reports no Bluetooth adapter
    #[error("no bluetooth adapter found")]
    NoAdapter,

    /// Configured address is not a valid `XX:XX:XX:XX:XX:XX` address
    #[error("invalid device address {0:?}")]
    InvalidAddress(String),

    /// No peripheral with the address showed up while scanning
    #[error("device {0} not in range")]
    NotInRange(BDAddr),

    /// Subscribe was asked for a characteristic the peripheral lacks
    #[error("characteristic {0} not present on device")]
    UnknownCharacteristic(Uuid),
}

/// Parse a configured device address.
///
/// # Errors
///
/// - `BleError::InvalidAddress` if `address` is not a colon separated MAC
pub fn parse_address(address: &str) -> Result<BDAddr, BleError> {
    address.parse().map_err(|_| BleError::InvalidAddress(address.to_owned()))
}

/// Check a configured address against what the transport will do with it.
///
/// Without address connects the address is never dialled (CoreBluetooth
/// names peripherals by UUID, not MAC), so it is not parsed either and the
/// name scan decides.
///
/// # Errors
///
/// - `BleError::InvalidAddress` if the address will be used and is malformed
pub fn check_address(
    address: Option<&str>,
    address_connect: bool,
) -> Result<Option<BDAddr>, BleError> {
    match address {
        Some(address) if address_connect => parse_address(address).map(Some),
        _ => Ok(None),
    }
}

enum Wanted<'a> {
    Name(&'a str),
    Address(BDAddr),
}

impl Wanted<'_> {
    async fn matches(&self, peripheral: &Peripheral) -> bool {
        match self {
            Self::Address(address) => peripheral.address() == *address,
            Self::Name(name) => matches!(
                peripheral.properties().await,
                Ok(Some(props)) if props.local_name.as_deref() == Some(*name)
            ),
        }
    }
}

/// [`Transport`] backed by the platform BLE central.
pub struct BleTransport {
    adapter: Adapter,
}

impl BleTransport {
    /// Open the first Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// - `BleError::NoAdapter` if the platform reports none
    /// - `BleError::Btleplug` if the BLE stack is unavailable
    pub async fn new() -> Result<Self, BleError> {
        let manager = Manager::new().await?;
        let adapter = manager.adapters().await?.into_iter().next().ok_or(BleError::NoAdapter)?;

        match adapter.adapter_info().await {
            Ok(info) => tracing::info!(adapter = %info, "using bluetooth adapter"),
            Err(err) => tracing::debug!(error = %err, "adapter info unavailable"),
        }

        Ok(Self { adapter })
    }

    async fn scan_for(
        &self,
        wanted: &Wanted<'_>,
        timeout: Duration,
    ) -> Result<Option<Peripheral>, BleError> {
        let mut events = self.adapter.events().await?;
        self.adapter.start_scan(ScanFilter::default()).await?;

        let search = async {
            for peripheral in self.adapter.peripherals().await? {
                if wanted.matches(&peripheral).await {
                    return Ok(Some(peripheral));
                }
            }

            while let Some(event) = events.next().await {
                if let CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) = event
                {
                    let peripheral = self.adapter.peripheral(&id).await?;
                    if wanted.matches(&peripheral).await {
                        return Ok(Some(peripheral));
                    }
                }
            }

            Ok::<_, BleError>(None)
        };

        let found = tokio::time::timeout(timeout, search).await.unwrap_or(Ok(None));

        if let Err(err) = self.adapter.stop_scan().await {
            tracing::debug!(error = %err, "stop scan failed");
        }

        found
    }
}

impl Transport for BleTransport {
    type Error = BleError;
    type Device = Peripheral;
    type Session = BleSession;

    fn supports_address_connect(&self) -> bool {
        // CoreBluetooth hides peripheral addresses.
        !cfg!(target_os = "macos")
    }

    async fn scan_by_name(
        &mut self,
        name: &str,
        timeout: Duration,
    ) -> Result<Option<Peripheral>, BleError> {
        self.scan_for(&Wanted::Name(name), timeout).await
    }

    async fn connect(
        &mut self,
        target: &DeviceTarget<Peripheral>,
    ) -> Result<BleSession, BleError> {
        let peripheral = match target {
            DeviceTarget::Discovered(peripheral) => peripheral.clone(),
            DeviceTarget::Address(address) => {
                let address = parse_address(address)?;
                self.scan_for(&Wanted::Address(address), ADDRESS_LOOKUP_TIMEOUT)
                    .await?
                    .ok_or(BleError::NotInRange(address))?
            },
        };

        let events = self.adapter.events().await?;
        if !peripheral.is_connected().await? {
            peripheral.connect().await?;
        }
        tracing::debug!(address = %peripheral.address(), "peripheral connected");

        Ok(BleSession { peripheral, events, notifications: None, input: None })
    }
}

/// One connection to a peripheral.
///
/// Merges the peripheral's notification stream with the adapter's
/// disconnect events. Either stream ending counts as a disconnect.
pub struct BleSession {
    peripheral: Peripheral,
    events: EventStream<CentralEvent>,
    notifications: Option<EventStream<ValueNotification>>,
    input: Option<Uuid>,
}

impl Session for BleSession {
    type Error = BleError;

    async fn characteristics(&mut self) -> Result<Vec<CharacteristicInfo>, BleError> {
        self.peripheral.discover_services().await?;

        Ok(self
            .peripheral
            .characteristics()
            .into_iter()
            .map(|c| CharacteristicInfo {
                service: c.service_uuid,
                uuid: c.uuid,
                notify: c.properties.contains(CharPropFlags::NOTIFY),
            })
            .collect())
    }

    async fn subscribe(&mut self, info: &CharacteristicInfo) -> Result<(), BleError> {
        let characteristic = self
            .peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == info.uuid && c.service_uuid == info.service)
            .ok_or(BleError::UnknownCharacteristic(info.uuid))?;

        self.notifications = Some(self.peripheral.notifications().await?);
        self.peripheral.subscribe(&characteristic).await?;
        self.input = Some(characteristic.uuid);

        Ok(())
    }

    async fn next_event(&mut self) -> SessionEvent {
        let Some(notifications) = self.notifications.as_mut() else {
            return SessionEvent::Disconnected;
        };
        let id = self.peripheral.id();

        loop {
            tokio::select! {
                notification = notifications.next() => match notification {
                    Some(n) if Some(n.uuid) == self.input => {
                        return SessionEvent::Notification(n.value);
                    },
                    Some(_) => {},
                    None => return SessionEvent::Disconnected,
                },
                event = self.events.next() => match event {
                    Some(CentralEvent::DeviceDisconnected(gone)) if gone == id => {
                        return SessionEvent::Disconnected;
                    },
                    Some(_) => {},
                    None => return SessionEvent::Disconnected,
                },
            }
        }
    }

    async fn close(&mut self) {
        self.notifications = None;
        if let Err(err) = self.peripheral.disconnect().await {
            tracing::debug!(error = %err, "disconnect failed");
        }
    }
}
