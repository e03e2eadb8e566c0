//! Production glue for the aiokey adapter.
//!
//! Wraps [`aiokey_core`]'s connection manager with real I/O: a `btleplug`
//! central for BLE, a uinput virtual keyboard on Linux, the wall clock and a
//! TOML or YAML configuration file.
//!
//! # Components
//!
//! - [`BleTransport`]: BLE transport on the platform's first adapter
//! - [`DaemonKeyboard`]: uinput keyboard, or a logging stand-in for dry runs
//! - [`SystemEnv`]: production time source
//! - [`load_config`]: configuration file loading

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod ble;
mod config;
mod error;
pub mod keyboard;
mod system_env;

pub use ble::{BleError, BleSession, BleTransport, check_address, parse_address};
pub use config::{LoadError, load_config};
pub use error::DaemonError;
pub use keyboard::{DaemonKeyboard, LogKeyboard};
pub use system_env::SystemEnv;
