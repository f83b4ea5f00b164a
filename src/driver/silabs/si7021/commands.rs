pub const DEFAULT_ADDRESS: u8 = 0x40;
pub const DEFAULT_BUS: u8 = 1;

pub const MEASURE_HUMIDITY_NO_HOLD: u8 = 0xF5;
pub const MEASURE_TEMPERATURE_NO_HOLD: u8 = 0xF3;
pub const RESET: u8 = 0xFE;

pub const WRITE_USER_REGISTER: u8 = 0xE6;
pub const READ_USER_REGISTER: u8 = 0xE7;
pub const WRITE_HEATER_REGISTER: u8 = 0x51;
pub const READ_HEATER_REGISTER: u8 = 0x11;

pub const READ_ELECTRONIC_ID_1: [u8; 2] = [0xFA, 0x0F];
pub const READ_ELECTRONIC_ID_2: [u8; 2] = [0xFC, 0xC9];
pub const READ_FIRMWARE_REVISION: [u8; 2] = [0x84, 0xB8];

/// Worst-case conversion time in no-hold mode, with margin (14-bit
/// temperature plus 12-bit humidity is ~23 ms).
pub const CONVERSION_DELAY_MS: u32 = 100;
pub const RESET_DELAY_MS: u32 = 15;

/// Bit layout of RH/T user register 1.
pub mod user {
    pub const RES1: u8 = 1 << 7;
    pub const VDDS: u8 = 1 << 6;
    pub const HTRE: u8 = 1 << 2;
    pub const RES0: u8 = 1 << 0;
}

/// Heater control register, low nibble only.
pub const HEATER_MASK: u8 = 0x0F;
