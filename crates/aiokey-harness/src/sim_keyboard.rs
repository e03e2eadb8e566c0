//! Keyboard that records strokes instead of injecting them.

use aiokey_core::{KeyIdentifier, Keyboard};

/// One key transition as the OS would see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStroke {
    /// Key down
    Down(KeyIdentifier),
    /// Key up
    Up(KeyIdentifier),
}

impl KeyStroke {
    /// Key down for `key`.
    pub fn down(key: impl Into<KeyIdentifier>) -> Self {
        Self::Down(key.into())
    }

    /// Key up for `key`.
    pub fn up(key: impl Into<KeyIdentifier>) -> Self {
        Self::Up(key.into())
    }
}

/// [`Keyboard`] that appends every stroke to a list.
#[derive(Debug, Default)]
pub struct RecordingKeyboard {
    strokes: Vec<KeyStroke>,
}

impl RecordingKeyboard {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Strokes so far, oldest first.
    pub fn strokes(&self) -> &[KeyStroke] {
        &self.strokes
    }

    /// Drain the recorded strokes.
    pub fn take(&mut self) -> Vec<KeyStroke> {
        std::mem::take(&mut self.strokes)
    }
}

impl Keyboard for RecordingKeyboard {
    fn press(&mut self, key: &KeyIdentifier) {
        tracing::trace!(%key, "sim key down");
        self.strokes.push(KeyStroke::Down(key.clone()));
    }

    fn release(&mut self, key: &KeyIdentifier) {
        tracing::trace!(%key, "sim key up");
        self.strokes.push(KeyStroke::Up(key.clone()));
    }
}
