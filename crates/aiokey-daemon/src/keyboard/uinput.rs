//! uinput virtual keyboard.

use aiokey_core::{KeyIdentifier, Keyboard};
use evdev::{AttributeSet, EventType, InputEvent, KeyCode, uinput::VirtualDevice};

use super::{
    KeyboardError,
    keymap::{ShiftState, chord},
};

const DEVICE_NAME: &str = "aiokey virtual keyboard";

/// Keys registered with the virtual device: every keyboard key up to
/// `KEY_MICMUTE`. Pointer and gamepad buttons are left out so the device is
/// classified as a keyboard.
fn supported_keys() -> AttributeSet<KeyCode> {
    let mut keys = AttributeSet::new();
    for code in KeyCode::KEY_ESC.code()..=KeyCode::KEY_MICMUTE.code() {
        keys.insert(KeyCode::new(code));
    }
    keys
}

/// Keyboard backed by a `/dev/uinput` virtual device.
pub struct UinputKeyboard {
    device: VirtualDevice,
    shift: ShiftState,
}

impl UinputKeyboard {
    /// Create the virtual device.
    ///
    /// # Errors
    ///
    /// - `KeyboardError::Uinput` if `/dev/uinput` is missing or not writable
    pub fn new() -> Result<Self, KeyboardError> {
        let device =
            VirtualDevice::builder()?.name(DEVICE_NAME).with_keys(&supported_keys())?.build()?;
        tracing::info!(name = DEVICE_NAME, "virtual keyboard created");

        Ok(Self { device, shift: ShiftState::default() })
    }

    fn emit(&mut self, events: &[(KeyCode, bool)]) {
        let events: Vec<_> = events
            .iter()
            .map(|&(key, down)| InputEvent::new(EventType::KEY.0, key.code(), i32::from(down)))
            .collect();
        if let Err(err) = self.device.emit(&events) {
            tracing::error!(?events, error = %err, "uinput write failed");
        }
    }
}

impl Keyboard for UinputKeyboard {
    fn press(&mut self, key: &KeyIdentifier) {
        let Some(chord) = chord(key) else {
            tracing::warn!(%key, "unknown key, press skipped");
            return;
        };

        let events = self.shift.press(chord);
        self.emit(&events);
    }

    fn release(&mut self, key: &KeyIdentifier) {
        let Some(chord) = chord(key) else {
            tracing::warn!(%key, "unknown key, release skipped");
            return;
        };

        let events = self.shift.release(chord);
        self.emit(&events);
    }
}
