//! Key synthesis backends.
//!
//! On Linux keys are injected through a uinput virtual keyboard. Dry runs
//! and other platforms use [`LogKeyboard`], which only logs what it would
//! have done.

#[cfg(target_os = "linux")]
mod keymap;
#[cfg(target_os = "linux")]
mod uinput;

use aiokey_core::{KeyIdentifier, Keyboard};
use thiserror::Error;

#[cfg(target_os = "linux")]
pub use self::{
    keymap::{Chord, ShiftState, chord},
    uinput::UinputKeyboard,
};

/// Virtual keyboard creation failure.
#[derive(Error, Debug)]
pub enum KeyboardError {
    /// `/dev/uinput` could not be opened or configured
    #[error("creating uinput keyboard: {0}")]
    Uinput(#[from] std::io::Error),
}

/// [`Keyboard`] that logs key actions instead of performing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogKeyboard;

impl Keyboard for LogKeyboard {
    fn press(&mut self, key: &KeyIdentifier) {
        tracing::info!(%key, "press");
    }

    fn release(&mut self, key: &KeyIdentifier) {
        tracing::info!(%key, "release");
    }

    fn tap(&mut self, key: &KeyIdentifier) {
        tracing::info!(%key, "tap");
    }
}

/// Keyboard selected at startup.
pub enum DaemonKeyboard {
    /// Logging only
    Log(LogKeyboard),
    /// uinput virtual keyboard
    #[cfg(target_os = "linux")]
    Uinput(UinputKeyboard),
}

impl DaemonKeyboard {
    /// Open the platform keyboard, or a [`LogKeyboard`] when `dry_run` is set
    /// or the platform has no supported backend.
    ///
    /// # Errors
    ///
    /// - `KeyboardError::Uinput` if the virtual keyboard cannot be created
    pub fn open(dry_run: bool) -> Result<Self, KeyboardError> {
        if dry_run {
            tracing::info!("dry run, key actions are logged only");
            return Ok(Self::Log(LogKeyboard));
        }

        #[cfg(target_os = "linux")]
        let keyboard = Self::Uinput(UinputKeyboard::new()?);

        #[cfg(not(target_os = "linux"))]
        let keyboard = {
            tracing::warn!("no key synthesis backend on this platform, key actions are logged only");
            Self::Log(LogKeyboard)
        };

        Ok(keyboard)
    }
}

impl Keyboard for DaemonKeyboard {
    fn press(&mut self, key: &KeyIdentifier) {
        match self {
            Self::Log(keyboard) => keyboard.press(key),
            #[cfg(target_os = "linux")]
            Self::Uinput(keyboard) => keyboard.press(key),
        }
    }

    fn release(&mut self, key: &KeyIdentifier) {
        match self {
            Self::Log(keyboard) => keyboard.release(key),
            #[cfg(target_os = "linux")]
            Self::Uinput(keyboard) => keyboard.release(key),
        }
    }

    fn tap(&mut self, key: &KeyIdentifier) {
        match self {
            Self::Log(keyboard) => keyboard.tap(key),
            #[cfg(target_os = "linux")]
            Self::Uinput(keyboard) => keyboard.tap(key),
        }
    }
}
