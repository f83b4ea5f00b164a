use std::{thread::JoinHandle, time::Duration};

use anyhow::{bail, Context};
use embedded_hal::blocking::{
    delay::DelayMs,
    i2c::{Read, Write},
};
use num_traits::FromPrimitive;
use rppal::i2c::I2c;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{
    config::Config,
    driver::{
        silabs::si7021::{
            self,
            register::{heater_current_ma, FirmwareRevision, Model},
            Si7021,
        },
        ThreadDelay,
    },
    report::Reading,
    util::Interval,
};

/// How often cancellation is checked while waiting for the next reading.
const POLL_STEP: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Reading(Reading),
    /// A reading was discarded; polling continues.
    Error(String),
}

/// What the sensor reports about itself at start-up.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Identity {
    pub revision: u8,
    pub firmware: Option<FirmwareRevision>,
    /// 0 when the checksum did not match
    pub id1: u32,
    /// 0 when the checksum did not match
    pub id2: u32,
    pub model: Option<Model>,
}

pub fn spawn_thread(
    ct: CancellationToken,
    config: Config,
    evt_tx: flume::Sender<Event>,
) -> JoinHandle<anyhow::Result<()>> {
    std::thread::spawn(move || {
        // nothing is sent to the device until the first command
        let i2c = I2c::with_bus(config.bus)
            .with_context(|| format!("failed to open i2c bus {}", config.bus))?;
        let mut sensor = Si7021::new(i2c, config.address);
        debug!(
            "opened si7021 on bus {} at address {:#04x}",
            config.bus,
            sensor.address()
        );

        let result = run(&mut sensor, &mut ThreadDelay, &ct, &config, &evt_tx);
        sensor.close();

        debug!("exiting station loop");
        result
    })
}

fn configure<I2C: Read + Write, DELAY: DelayMs<u32>>(
    sensor: &mut Si7021<I2C>,
    delay: &mut DELAY,
    config: &Config,
) -> anyhow::Result<()> {
    if config.reset {
        sensor.reset(delay).context("failed to reset sensor")?;
        debug!("reset si7021");
    }

    sensor
        .set_resolution(config.resolution)
        .context("failed to set resolution")?;
    let res = sensor.resolution().context("failed to get resolution")?;
    if res != config.resolution {
        bail!("resolution reads back as {res:?}, expected {:?}", config.resolution);
    }
    debug!("resolution set to {res:?}");

    if let Some(level) = config.heater_level {
        sensor
            .set_heater_level(level)
            .context("failed to set heater level")?;
        let applied = sensor
            .heater_level()
            .context("failed to get heater level")?;
        if applied != level {
            bail!("heater level reads back as {applied}, expected {level}");
        }
        sensor
            .switch_heater_on()
            .context("failed to switch heater on")?;

        match heater_current_ma(level) {
            Some(ma) => debug!("heater on at level {level} ({ma} mA)"),
            None => warn!("heater on at undocumented level {level}"),
        }
    }

    Ok(())
}

fn describe<I2C: Read + Write>(sensor: &mut Si7021<I2C>) -> anyhow::Result<Identity> {
    let revision = sensor
        .firmware_revision()
        .context("failed to get firmware revision")?;
    let id1 = sensor
        .electronic_id_1()
        .context("failed to get electronic id")?;
    let id2 = sensor
        .electronic_id_2()
        .context("failed to get electronic id")?;

    if sensor.vdd_low().context("failed to read user register")? {
        warn!("si7021 reports low supply voltage");
    }
    if sensor.heater_enabled().context("failed to read user register")? {
        debug!("heater is on");
    }

    Ok(Identity {
        revision,
        firmware: FirmwareRevision::from_u8(revision),
        id1,
        id2,
        model: Model::from_electronic_id_2(id2),
    })
}

fn read<I2C: Read + Write, DELAY: DelayMs<u32>>(
    sensor: &mut Si7021<I2C>,
    delay: &mut DELAY,
) -> Result<Reading, si7021::Error> {
    let humidity = sensor.humidity(delay)?;
    let temperature = sensor.temperature(delay)?;

    Ok(Reading {
        temperature,
        humidity,
    })
}

/// Configures the sensor and polls it until cancelled. Without an interval
/// a single reading is taken.
pub fn run<I2C: Read + Write, DELAY: DelayMs<u32>>(
    sensor: &mut Si7021<I2C>,
    delay: &mut DELAY,
    ct: &CancellationToken,
    config: &Config,
    evt_tx: &flume::Sender<Event>,
) -> anyhow::Result<()> {
    configure(sensor, delay, config)?;

    let identity = describe(sensor)?;
    match identity.firmware {
        Some(firmware) => debug!("firmware {firmware:?}"),
        None => debug!("unknown firmware revision {:#04x}", identity.revision),
    }
    debug!(
        "id1={:08x} id2={:08x} model={:?}",
        identity.id1, identity.id2, identity.model
    );

    let mut interval = config.interval.map(Interval::new);

    loop {
        let evt = match read(sensor, delay) {
            Ok(reading) => {
                trace!("read {reading:?}");
                Event::Reading(reading)
            }
            Err(err @ si7021::Error::ChecksumMismatch { .. }) => {
                warn!("discarding reading: {err}");
                Event::Error(err.to_string())
            }
            Err(err) => return Err(err).context("failed to read si7021 sensor"),
        };

        if evt_tx.send(evt).is_err() {
            debug!("event receiver closed");
            break;
        }

        match interval.as_mut() {
            Some(interval) => {
                if !interval.tick(POLL_STEP, || ct.is_cancelled()) {
                    break;
                }
            }
            None => break,
        }
    }

    if config.heater_level.is_some() {
        sensor
            .switch_heater_off()
            .context("failed to switch heater off")?;
        debug!("heater off");
    }

    Ok(())
}
