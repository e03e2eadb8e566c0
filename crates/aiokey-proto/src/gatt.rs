//! Fixed GATT identifiers of the Automation IO profile.

use uuid::Uuid;

/// Automation IO service (`0x1815`).
pub const AUTOMATION_IO_SERVICE: Uuid = Uuid::from_u128(0x0000_1815_0000_1000_8000_0080_5f9b_34fb);

/// Digital input characteristic (`0x2A56`). Must advertise `notify`.
pub const DIGITAL_INPUT_CHARACTERISTIC: Uuid =
    Uuid::from_u128(0x0000_2a56_0000_1000_8000_0080_5f9b_34fb);
