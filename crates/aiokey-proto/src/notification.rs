//! Notification payload decoding.
//!
//! # Layout
//!
//! ```text
//!   byte b:  bit 7 6 | 5 4 | 3 2 | 1 0
//!            pin 4b+3 4b+2  4b+1  4b+0
//! ```
//!
//! | code | meaning                      |
//! |------|------------------------------|
//! | `01` | pressed                      |
//! | `00` | released                     |
//! | `10` | released                     |
//! | `11` | no change / not present      |
//!
//! Pins marked `11` never produce an event, but they still occupy their slot
//! so the numbering of the following pins is unaffected.

use std::iter::FusedIterator;

/// Number of pins packed into one payload byte.
pub const PINS_PER_BYTE: usize = 4;

/// 2-bit code reporting a pressed pin.
pub const CODE_PRESSED: u8 = 0b01;

/// Reserved 2-bit code: the pin is absent or unchanged and yields no event.
pub const CODE_ABSENT: u8 = 0b11;

/// Interpretation of one 2-bit group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinCode {
    /// `01`
    Pressed,
    /// `00` or `10`
    Released,
    /// `11`, skipped
    Absent,
}

/// Classify the two least significant bits of `code`.
pub fn classify(code: u8) -> PinCode {
    match code & 0b11 {
        CODE_PRESSED => PinCode::Pressed,
        CODE_ABSENT => PinCode::Absent,
        _ => PinCode::Released,
    }
}

/// State change reported for a single pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorEvent {
    /// Pin index: `byte_offset * 4 + group`.
    pub pin: usize,
    /// `true` for pressed, `false` for released.
    pub pressed: bool,
}

impl SensorEvent {
    /// Pressed event for `pin`.
    pub fn pressed(pin: usize) -> Self {
        Self { pin, pressed: true }
    }

    /// Released event for `pin`.
    pub fn released(pin: usize) -> Self {
        Self { pin, pressed: false }
    }
}

/// Decode a notification payload into events ordered by ascending pin.
///
/// The iterator borrows the payload and decodes lazily.
pub fn decode(payload: &[u8]) -> SensorEvents<'_> {
    SensorEvents { payload, slot: 0 }
}

/// Iterator returned by [`decode`].
#[derive(Debug, Clone)]
pub struct SensorEvents<'a> {
    payload: &'a [u8],
    slot: usize,
}

impl Iterator for SensorEvents<'_> {
    type Item = SensorEvent;

    fn next(&mut self) -> Option<SensorEvent> {
        loop {
            let byte = *self.payload.get(self.slot / PINS_PER_BYTE)?;
            let pin = self.slot;
            let shift = (pin % PINS_PER_BYTE) * 2;
            self.slot += 1;

            match classify(byte >> shift) {
                PinCode::Pressed => return Some(SensorEvent::pressed(pin)),
                PinCode::Released => return Some(SensorEvent::released(pin)),
                PinCode::Absent => {},
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let total = self.payload.len() * PINS_PER_BYTE;
        (0, Some(total.saturating_sub(self.slot)))
    }
}

impl FusedIterator for SensorEvents<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(payload: &[u8]) -> Vec<SensorEvent> {
        decode(payload).collect()
    }

    #[test]
    fn empty_payload_has_no_events() {
        assert!(events(&[]).is_empty());
    }

    #[test]
    fn all_absent_byte_has_no_events() {
        assert!(events(&[0xFF, 0xFF]).is_empty());
    }

    #[test]
    fn groups_decode_least_significant_first() {
        // pin0=01 pressed, pin1=00 released, pin2=11 absent, pin3=10 released
        let byte = 0b10_11_00_01;
        assert_eq!(events(&[byte]), vec![
            SensorEvent::pressed(0),
            SensorEvent::released(1),
            SensorEvent::released(3),
        ]);
    }

    #[test]
    fn pin_index_spans_bytes() {
        // byte 0 all absent, byte 1 pin 5 pressed
        let payload = [0xFF, 0b11_11_01_11];
        assert_eq!(events(&payload), vec![SensorEvent::pressed(5)]);
    }

    #[test]
    fn zero_byte_releases_four_pins() {
        let pins: Vec<_> = events(&[0x00]).into_iter().map(|e| (e.pin, e.pressed)).collect();
        assert_eq!(pins, vec![(0, false), (1, false), (2, false), (3, false)]);
    }

    #[test]
    fn classify_ignores_high_bits() {
        assert_eq!(classify(0b1111_0001), PinCode::Pressed);
        assert_eq!(classify(0b0000_0010), PinCode::Released);
        assert_eq!(classify(0b0000_0011), PinCode::Absent);
    }

    #[test]
    fn size_hint_bounds_remaining_slots() {
        let mut iter = decode(&[0x00, 0x00]);
        assert_eq!(iter.size_hint(), (0, Some(8)));
        iter.next();
        assert_eq!(iter.size_hint(), (0, Some(7)));
    }
}
