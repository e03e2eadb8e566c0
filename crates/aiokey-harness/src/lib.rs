//! Deterministic simulation harness for aiokey.
//!
//! In-memory implementations of the [`aiokey_core::Transport`],
//! [`aiokey_core::Environment`] and [`aiokey_core::Keyboard`] traits so the
//! production [`aiokey_core::ConnectionManager`] can be driven end to end
//! without a radio, a wall clock or an input device.
//!
//! # Scripting
//!
//! A [`SimTransport`] is loaded with [`SimSession`]s up front. Each successful
//! connect hands out the next session, which replays its notifications and
//! then reports a disconnect. Once the script runs out every connect fails,
//! so pairing the transport with a bounded retry policy makes
//! [`aiokey_core::ConnectionManager::run`] terminate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod payload;
pub mod sim_env;
pub mod sim_keyboard;
pub mod sim_transport;

pub use payload::notification;
pub use sim_env::{SimEnv, SimInstant};
pub use sim_keyboard::{KeyStroke, RecordingKeyboard};
pub use sim_transport::{SimDevice, SimSession, SimTransport, SimTransportError, TransportLog};
