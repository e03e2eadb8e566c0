//! Core of the aiokey adapter.
//!
//! Turns Automation IO button-matrix notifications into keyboard actions
//! according to a user supplied [`Config`].
//!
//! # Architecture
//!
//! Everything here is Sans-IO. The BLE stack and the OS keyboard sit behind
//! the [`Transport`], [`Session`] and [`Keyboard`] traits, time behind
//! [`Environment`], so the same code runs in the daemon and in deterministic
//! simulation.
//!
//! ```text
//! payload ─> decode ─> SensorEvent ─> resolve ─> Dispatcher ─> KeyAction ─> Keyboard
//!                                       ^                                     
//!                                    Config
//! ```
//!
//! # Components
//!
//! - [`Config`] / [`BindingSpec`]: validated, immutable bindings
//! - [`binding::resolve`]: pin + direction to [`Resolution`]
//! - [`Dispatcher`]: per-event press/release/tap decisions
//! - [`ConnectionManager`]: discovery, connect retry, subscribe, reconnect

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod binding;
pub mod config;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod keyboard;
pub mod manager;
pub mod transport;

pub use aiokey_proto::SensorEvent;
pub use binding::{Direction, Resolution, ResolveError, ResolvedBinding, resolve};
pub use config::{BindingSpec, Config, ConfigBuilder, ConfigError, ConfigWarning, KeyIdentifier};
pub use dispatch::{DispatchError, Dispatcher, KeyAction};
pub use env::Environment;
pub use error::AdapterError;
pub use keyboard::Keyboard;
pub use manager::{
    ConnectionManager, ConnectionState, DEFAULT_RETRY_INTERVAL, DEFAULT_SCAN_TIMEOUT,
    ManagerSettings, RetryPolicy, StateObserver,
};
pub use transport::{CharacteristicInfo, DeviceTarget, Session, SessionEvent, Transport};
