//! Driver for the Silicon Labs Si7021 humidity and temperature sensor.
//!
//! Measurements use the no-hold master mode commands: the command is written,
//! the driver waits out the conversion and then reads the result, so the bus is
//! never held by the sensor.

use embedded_hal::blocking::{
    delay::DelayMs,
    i2c::{Read, Write},
};
use thiserror::Error;
use tracing::{trace, warn};

pub mod commands;
pub mod crc;
pub mod register;

use commands::user::{HTRE, VDDS};
use crc::crc8;
use register::Resolution;

pub struct Si7021<I2C> {
    i2c: I2C,
    address: u8,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("i2c error")]
    I2c,
    #[error("checksum mismatch (expected {expected:#04x}, computed {computed:#04x})")]
    ChecksumMismatch { expected: u8, computed: u8 },
    #[error("invalid argument")]
    InvalidArgument,
}

pub fn temperature_from_raw(raw: u16) -> f32 {
    175.72 * raw as f32 / 65536.0 - 46.85
}

/// Not clamped: the sensor can report slightly below 0 % and above 100 %.
pub fn humidity_from_raw(raw: u16) -> f32 {
    125.0 * raw as f32 / 65536.0 - 6.0
}

pub fn fahrenheit(celsius: f32) -> f32 {
    celsius * 1.8 + 32.0
}

fn check_crc(data: &[u8], expected: u8) -> Result<(), Error> {
    let computed = crc8(data);
    if computed == expected {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch { expected, computed })
    }
}

impl<I2C> Si7021<I2C>
where
    I2C: Read + Write,
{
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Gives the transport back, ending the handle.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Closes the I2C session by dropping the transport.
    pub fn close(self) {
        trace!("closing si7021 at {:#04x}", self.address);
        drop(self.release());
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        self.i2c.write(self.address, buf).map_err(|_| Error::I2c)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        self.i2c.read(self.address, buf).map_err(|_| Error::I2c)
    }

    fn command(&mut self, cmd: &[u8], buf: &mut [u8]) -> Result<(), Error> {
        self.write(cmd)?;
        self.read(buf)
    }

    fn measure<DELAY: DelayMs<u32>>(&mut self, cmd: u8, delay: &mut DELAY) -> Result<u16, Error> {
        self.write(&[cmd])?;
        delay.delay_ms(commands::CONVERSION_DELAY_MS);

        let mut buf = [0u8; 3];
        self.read(&mut buf)?;
        trace!("measurement {cmd:#04x} returned {buf:02x?}");

        check_crc(&buf[..2], buf[2])?;
        Ok(u16::from_be_bytes([buf[0], buf[1]]))
    }

    /// Measures the temperature in degrees Celsius.
    pub fn temperature<DELAY: DelayMs<u32>>(&mut self, delay: &mut DELAY) -> Result<f32, Error> {
        let raw = self.measure(commands::MEASURE_TEMPERATURE_NO_HOLD, delay)?;
        Ok(temperature_from_raw(raw))
    }

    /// Measures the relative humidity in percent.
    pub fn humidity<DELAY: DelayMs<u32>>(&mut self, delay: &mut DELAY) -> Result<f32, Error> {
        let raw = self.measure(commands::MEASURE_HUMIDITY_NO_HOLD, delay)?;
        Ok(humidity_from_raw(raw))
    }

    /// Software reset. Registers return to their power-on defaults.
    pub fn reset<DELAY: DelayMs<u32>>(&mut self, delay: &mut DELAY) -> Result<(), Error> {
        self.write(&[commands::RESET])?;
        delay.delay_ms(commands::RESET_DELAY_MS);
        Ok(())
    }

    fn user_register(&mut self) -> Result<u8, Error> {
        let mut buf = [0u8; 1];
        self.command(&[commands::READ_USER_REGISTER], &mut buf)?;
        Ok(buf[0])
    }

    fn update_user_register(&mut self, f: impl FnOnce(u8) -> u8) -> Result<(), Error> {
        let reg = self.user_register()?;
        self.write(&[commands::WRITE_USER_REGISTER, f(reg)])
    }

    pub fn set_resolution(&mut self, res: Resolution) -> Result<(), Error> {
        self.update_user_register(|reg| res.apply(reg))
    }

    pub fn resolution(&mut self) -> Result<Resolution, Error> {
        Ok(Resolution::from_register(self.user_register()?))
    }

    pub fn switch_heater_on(&mut self) -> Result<(), Error> {
        self.update_user_register(|reg| reg | HTRE)
    }

    pub fn switch_heater_off(&mut self) -> Result<(), Error> {
        self.update_user_register(|reg| reg & !HTRE)
    }

    pub fn heater_enabled(&mut self) -> Result<bool, Error> {
        Ok(self.user_register()? & HTRE != 0)
    }

    /// True when the supply voltage has dropped below the sensor's minimum.
    pub fn vdd_low(&mut self) -> Result<bool, Error> {
        Ok(self.user_register()? & VDDS != 0)
    }

    /// Sets the heater current used while the heater is switched on. Only 0, 1,
    /// 2, 4, 8 and 15 are documented, see [`register::heater_current_ma`].
    pub fn set_heater_level(&mut self, level: u8) -> Result<(), Error> {
        if level > commands::HEATER_MASK {
            return Err(Error::InvalidArgument);
        }

        let mut buf = [0u8; 1];
        self.command(&[commands::READ_HEATER_REGISTER], &mut buf)?;
        let reg = (buf[0] & !commands::HEATER_MASK) | level;
        self.write(&[commands::WRITE_HEATER_REGISTER, reg])
    }

    pub fn heater_level(&mut self) -> Result<u8, Error> {
        let mut buf = [0u8; 1];
        self.command(&[commands::READ_HEATER_REGISTER], &mut buf)?;
        Ok(buf[0] & commands::HEATER_MASK)
    }

    /// 0xFF is revision 1.0, 0x20 is revision 2.0.
    pub fn firmware_revision(&mut self) -> Result<u8, Error> {
        let mut buf = [0u8; 1];
        self.command(&commands::READ_FIRMWARE_REVISION, &mut buf)?;
        Ok(buf[0])
    }

    /// First half of the serial number (SNA). Returns 0 if the checksum
    /// does not match.
    pub fn electronic_id_1(&mut self) -> Result<u32, Error> {
        let mut buf = [0u8; 8];
        self.command(&commands::READ_ELECTRONIC_ID_1, &mut buf)?;

        let id = [buf[0], buf[2], buf[4], buf[6]];
        Ok(self.checked_id(id, buf[7]))
    }

    /// Second half of the serial number (SNB). Returns 0 if the checksum
    /// does not match.
    pub fn electronic_id_2(&mut self) -> Result<u32, Error> {
        let mut buf = [0u8; 6];
        self.command(&commands::READ_ELECTRONIC_ID_2, &mut buf)?;

        let id = [buf[0], buf[1], buf[3], buf[4]];
        Ok(self.checked_id(id, buf[5]))
    }

    fn checked_id(&self, id: [u8; 4], crc: u8) -> u32 {
        match check_crc(&id, crc) {
            Ok(()) => u32::from_be_bytes(id),
            Err(err) => {
                warn!("unreadable electronic id: {err}");
                0
            }
        }
    }
}

#[cfg(test)]
mod test {
    use embedded_hal::blocking::{
        delay::DelayMs,
        i2c::{Read, Write},
    };
    use embedded_hal_mock::eh0::i2c::{Mock as I2cMock, Transaction};

    use super::{
        crc::crc8,
        register::{Model, Resolution},
        Error, Si7021,
    };

    const ADDR: u8 = 0x40;

    struct NoDelay;

    impl DelayMs<u32> for NoDelay {
        fn delay_ms(&mut self, _ms: u32) {}
    }

    /// Register-level model of the sensor, for read-modify-write round trips.
    struct FakeSi7021 {
        user: u8,
        heater: u8,
        reply: Vec<u8>,
    }

    impl Write for FakeSi7021 {
        type Error = ();

        fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), ()> {
            assert_eq!(address, ADDR);
            match bytes {
                [0xE7] => self.reply = vec![self.user],
                [0x11] => self.reply = vec![self.heater],
                [0xE6, v] => self.user = *v,
                [0x51, v] => self.heater = *v,
                _ => return Err(()),
            }
            Ok(())
        }
    }

    impl Read for FakeSi7021 {
        type Error = ();

        fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), ()> {
            assert_eq!(address, ADDR);
            if buffer.len() != self.reply.len() {
                return Err(());
            }
            buffer.copy_from_slice(&self.reply);
            Ok(())
        }
    }

    fn sensor(expectations: &[Transaction]) -> Si7021<I2cMock> {
        Si7021::new(I2cMock::new(expectations), ADDR)
    }

    fn measurement(cmd: u8, msb: u8, lsb: u8, crc: u8) -> [Transaction; 2] {
        [
            Transaction::write(ADDR, vec![cmd]),
            Transaction::read(ADDR, vec![msb, lsb, crc]),
        ]
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 0.01,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn temperature() {
        let mut s = sensor(&measurement(0xF3, 0x66, 0x4C, 0x4F));
        assert_close(s.temperature(&mut NoDelay).unwrap(), 23.367);
        s.release().done();
    }

    #[test]
    fn humidity() {
        let mut s = sensor(&measurement(0xF5, 0x7C, 0x80, 0xF5));
        assert_close(s.humidity(&mut NoDelay).unwrap(), 54.791);
        s.release().done();
    }

    #[test]
    fn conversion_limits_are_not_clamped() {
        let zero = crc8(&[0x00, 0x00]);
        let max = crc8(&[0xFF, 0xFF]);

        let mut expectations = Vec::new();
        expectations.extend(measurement(0xF3, 0x00, 0x00, zero));
        expectations.extend(measurement(0xF5, 0x00, 0x00, zero));
        expectations.extend(measurement(0xF3, 0xFF, 0xFF, max));
        expectations.extend(measurement(0xF5, 0xFF, 0xFF, max));
        let mut s = sensor(&expectations);

        assert_close(s.temperature(&mut NoDelay).unwrap(), -46.85);
        assert_close(s.humidity(&mut NoDelay).unwrap(), -6.0);
        assert_close(s.temperature(&mut NoDelay).unwrap(), 128.867);
        assert_close(s.humidity(&mut NoDelay).unwrap(), 118.998);
        s.release().done();
    }

    #[test]
    fn corrupt_checksum_is_an_error() {
        for bit in 0..8 {
            let mut s = sensor(&measurement(0xF3, 0x66, 0x4C, 0x4F ^ (1 << bit)));
            match s.temperature(&mut NoDelay) {
                Err(Error::ChecksumMismatch { expected, computed }) => {
                    assert_eq!(expected, 0x4F ^ (1 << bit));
                    assert_eq!(computed, 0x4F);
                }
                other => panic!("expected checksum mismatch, got {other:?}"),
            }
            s.release().done();
        }
    }

    #[test]
    fn reset() {
        let mut s = sensor(&[Transaction::write(ADDR, vec![0xFE])]);
        s.reset(&mut NoDelay).unwrap();
        s.release().done();
    }

    #[test]
    fn set_resolution_preserves_other_bits() {
        let mut s = sensor(&[
            Transaction::write(ADDR, vec![0xE7]),
            Transaction::read(ADDR, vec![0b0011_1110]),
            Transaction::write(ADDR, vec![0xE6, 0b1011_1111]),
        ]);
        s.set_resolution(Resolution::Rh11Temp11).unwrap();
        s.release().done();
    }

    #[test]
    fn resolution_round_trip() {
        let mut s = Si7021::new(
            FakeSi7021 {
                user: 0b0011_1010,
                heater: 0x00,
                reply: vec![],
            },
            ADDR,
        );

        for res in Resolution::ALL {
            s.set_resolution(res).unwrap();
            assert_eq!(s.resolution().unwrap(), res);
            assert!(!s.heater_enabled().unwrap());
        }

        let fake = s.release();
        assert_eq!(fake.user & 0b0111_1110, 0b0011_1010);
    }

    #[test]
    fn heater_level_round_trip() {
        let mut s = Si7021::new(
            FakeSi7021 {
                user: 0b1000_0001,
                heater: 0xA0,
                reply: vec![],
            },
            ADDR,
        );

        for level in [0, 1, 2, 4, 8, 15] {
            s.set_heater_level(level).unwrap();
            assert_eq!(s.heater_level().unwrap(), level);
            assert_eq!(s.resolution().unwrap(), Resolution::Rh11Temp11);
        }

        let fake = s.release();
        assert_eq!(fake.heater & 0xF0, 0xA0);
    }

    #[test]
    fn invalid_heater_level_sends_nothing() {
        let mut s = sensor(&[]);
        assert!(matches!(s.set_heater_level(16), Err(Error::InvalidArgument)));
        s.release().done();
    }

    #[test]
    fn heater_switch_leaves_resolution() {
        let mut s = Si7021::new(
            FakeSi7021 {
                user: 0b1000_0001,
                heater: 0x00,
                reply: vec![],
            },
            ADDR,
        );

        s.switch_heater_on().unwrap();
        assert!(s.heater_enabled().unwrap());
        assert_eq!(s.resolution().unwrap(), Resolution::Rh11Temp11);

        s.switch_heater_off().unwrap();
        assert!(!s.heater_enabled().unwrap());
        assert_eq!(s.resolution().unwrap(), Resolution::Rh11Temp11);

        assert_eq!(s.release().user, 0b1000_0001);
    }

    #[test]
    fn vdd_low() {
        let mut s = sensor(&[
            Transaction::write(ADDR, vec![0xE7]),
            Transaction::read(ADDR, vec![0b0111_1010]),
        ]);
        assert!(s.vdd_low().unwrap());
        s.release().done();
    }

    #[test]
    fn firmware_revision() {
        let mut s = sensor(&[
            Transaction::write(ADDR, vec![0x84, 0xB8]),
            Transaction::read(ADDR, vec![0x20]),
        ]);
        assert_eq!(s.firmware_revision().unwrap(), 0x20);
        s.release().done();
    }

    #[test]
    fn electronic_id_1() {
        let crc = crc8(&[0x12, 0x34, 0x56, 0x78]);
        let reply = vec![0x12, 0xAA, 0x34, 0xBB, 0x56, 0xCC, 0x78, crc];
        let mut corrupt = reply.clone();
        corrupt[7] ^= 0x01;

        let mut s = sensor(&[
            Transaction::write(ADDR, vec![0xFA, 0x0F]),
            Transaction::read(ADDR, reply),
            Transaction::write(ADDR, vec![0xFA, 0x0F]),
            Transaction::read(ADDR, corrupt),
        ]);
        assert_eq!(s.electronic_id_1().unwrap(), 0x1234_5678);
        assert_eq!(s.electronic_id_1().unwrap(), 0);
        s.release().done();
    }

    #[test]
    fn electronic_id_2_and_model() {
        let crc = crc8(&[0x15, 0xFF, 0x00, 0x00]);
        assert_eq!(crc, 0xE6);

        let reply = vec![0x15, 0xFF, 0x42, 0x00, 0x00, crc];
        let mut corrupt = reply.clone();
        corrupt[5] ^= 0x80;

        let mut s = sensor(&[
            Transaction::write(ADDR, vec![0xFC, 0xC9]),
            Transaction::read(ADDR, reply),
            Transaction::write(ADDR, vec![0xFC, 0xC9]),
            Transaction::read(ADDR, corrupt),
        ]);

        let id = s.electronic_id_2().unwrap();
        assert_eq!(id, 0x15FF_0000);
        assert_eq!(Model::from_electronic_id_2(id), Some(Model::Si7021));
        assert_eq!(s.electronic_id_2().unwrap(), 0);
        s.release().done();
    }

    #[test]
    fn transport_failure() {
        let mut s = Si7021::new(
            FakeSi7021 {
                user: 0,
                heater: 0,
                reply: vec![],
            },
            ADDR,
        );
        // the fake only answers register commands
        assert!(matches!(s.temperature(&mut NoDelay), Err(Error::I2c)));
    }
}
