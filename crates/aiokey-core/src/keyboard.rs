//! Key synthesis seam.

use crate::{config::KeyIdentifier, dispatch::KeyAction};

/// OS-level key synthesis.
///
/// Calls are fire-and-forget: an implementation that fails to emit a key
/// logs the failure itself, the adapter does not react to it.
///
/// # Implementations
///
/// - **Daemon**: uinput virtual keyboard, or a logging keyboard for dry runs
/// - **Simulation**: records every action for assertions
pub trait Keyboard: Send {
    /// Key down.
    fn press(&mut self, key: &KeyIdentifier);

    /// Key up.
    fn release(&mut self, key: &KeyIdentifier);

    /// Key down immediately followed by key up.
    fn tap(&mut self, key: &KeyIdentifier) {
        self.press(key);
        self.release(key);
    }

    /// Execute a dispatcher action.
    fn apply(&mut self, action: &KeyAction) {
        match action {
            KeyAction::Press(key) => self.press(key),
            KeyAction::Release(key) => self.release(key),
            KeyAction::Tap(key) => self.tap(key),
        }
    }
}
