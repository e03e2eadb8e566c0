//! Wire format of the Automation IO input characteristic.
//!
//! The peripheral reports the state of every input channel in a single
//! notification: each byte packs four channels as 2-bit codes, least
//! significant pair first. This crate turns those payloads into ordered
//! [`SensorEvent`]s and carries the fixed GATT identifiers used to find the
//! characteristic.
//!
//! Decoding is pure and stateless: a payload is interpreted from its own
//! bytes only, nothing is remembered between notifications.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod gatt;
mod notification;

pub use notification::{
    CODE_ABSENT, CODE_PRESSED, PINS_PER_BYTE, PinCode, SensorEvent, SensorEvents, classify, decode,
};
