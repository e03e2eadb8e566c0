//! Daemon error types.

use thiserror::Error;

use crate::{BleError, LoadError, keyboard::KeyboardError};

/// Errors that stop the daemon.
#[derive(Error, Debug)]
pub enum DaemonError {
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] LoadError),

    /// BLE stack unavailable
    #[error("bluetooth: {0}")]
    Ble(#[from] BleError),

    /// Virtual keyboard could not be created
    #[error(transparent)]
    Keyboard(#[from] KeyboardError),

    /// Connection manager gave up
    #[error(transparent)]
    Adapter(#[from] aiokey_core::AdapterError),
}
