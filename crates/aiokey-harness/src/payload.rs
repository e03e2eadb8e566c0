//! Notification payload construction.

use aiokey_proto::{CODE_ABSENT, CODE_PRESSED, PINS_PER_BYTE};

/// Code written for released pins.
const CODE_RELEASED: u8 = 0b00;

/// Encode a notification reporting `pins` as `(pin, pressed)` pairs.
///
/// Every slot not listed is marked absent. The payload is just long enough
/// to hold the highest pin; an empty list yields an empty payload.
pub fn notification(pins: &[(usize, bool)]) -> Vec<u8> {
    let len = pins.iter().map(|&(pin, _)| pin / PINS_PER_BYTE + 1).max().unwrap_or(0);
    let mut payload = vec![0xFF; len];

    for &(pin, pressed) in pins {
        let shift = (pin % PINS_PER_BYTE) * 2;
        let code = if pressed { CODE_PRESSED } else { CODE_RELEASED };
        let byte = &mut payload[pin / PINS_PER_BYTE];
        *byte = (*byte & !(CODE_ABSENT << shift)) | (code << shift);
    }

    payload
}

#[cfg(test)]
mod tests {
    use aiokey_proto::{SensorEvent, decode};

    use super::*;

    #[test]
    fn unlisted_slots_are_absent() {
        assert_eq!(notification(&[(0, true), (2, true), (3, true)]), vec![0b0101_1101]);
        assert_eq!(notification(&[(5, false)]), vec![0xFF, 0b1111_0011]);
        assert!(notification(&[]).is_empty());
    }

    #[test]
    fn decodes_back_in_pin_order() {
        let payload = notification(&[(6, false), (1, true)]);
        let events: Vec<_> = decode(&payload).collect();

        assert_eq!(events, vec![SensorEvent::pressed(1), SensorEvent::released(6)]);
    }
}
