use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::commands::user::{RES0, RES1};

/// Measurement resolution, as stored in RES1:RES0 of user register 1.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum Resolution {
    /// Humidity 12 bits, temperature 14 bits (the maximum, and the power-on default)
    Rh12Temp14 = 0,
    /// Humidity 8 bits, temperature 12 bits
    Rh8Temp12 = 1,
    /// Humidity 10 bits, temperature 13 bits
    Rh10Temp13 = 2,
    /// Humidity 11 bits, temperature 11 bits
    Rh11Temp11 = 3,
}

impl Resolution {
    #[cfg(test)]
    pub const ALL: [Resolution; 4] = [
        Resolution::Rh12Temp14,
        Resolution::Rh8Temp12,
        Resolution::Rh10Temp13,
        Resolution::Rh11Temp11,
    ];

    /// Decodes the resolution bits of a user register value.
    pub fn from_register(reg: u8) -> Self {
        match (reg & RES1 != 0, reg & RES0 != 0) {
            (false, false) => Resolution::Rh12Temp14,
            (false, true) => Resolution::Rh8Temp12,
            (true, false) => Resolution::Rh10Temp13,
            (true, true) => Resolution::Rh11Temp11,
        }
    }

    /// Merges this resolution into a user register value, leaving every
    /// other bit as it was.
    pub fn apply(self, reg: u8) -> u8 {
        let res = self as u8;
        (reg & !(RES1 | RES0)) | (res & 1) | ((res & 2) << 6)
    }
}

/// Heater current in mA for the levels the datasheet documents.
pub fn heater_current_ma(level: u8) -> Option<f32> {
    match level {
        0 => Some(3.09),
        1 => Some(9.18),
        2 => Some(15.24),
        4 => Some(27.39),
        8 => Some(51.69),
        15 => Some(94.20),
        _ => None,
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum FirmwareRevision {
    V1_0 = 0xFF,
    V2_0 = 0x20,
}

/// Device model, taken from SNB_3 (the top byte of the second electronic ID half).
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum Model {
    /// Engineering sample, reported as either 0x00 or 0xFF
    Sample = 0x00,
    Si7013 = 0x0D,
    Si7020 = 0x14,
    Si7021 = 0x15,
}

impl Model {
    pub fn from_electronic_id_2(id: u32) -> Option<Self> {
        match (id >> 24) as u8 {
            0xFF => Some(Model::Sample),
            snb3 => Model::from_u8(snb3),
        }
    }
}
