use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use num_traits::FromPrimitive;

use crate::driver::silabs::si7021::{commands, register::Resolution};

const BUS: &str = "WEATHERPRESS_I2C_BUS";
const ADDRESS: &str = "WEATHERPRESS_I2C_ADDRESS";
const RESOLUTION: &str = "WEATHERPRESS_RESOLUTION";
const HEATER_LEVEL: &str = "WEATHERPRESS_HEATER_LEVEL";
const INTERVAL: &str = "WEATHERPRESS_INTERVAL_SECS";
const RESET: &str = "WEATHERPRESS_RESET";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bus: u8,
    pub address: u8,
    pub resolution: Resolution,
    /// When set, the heater is switched on at this level.
    pub heater_level: Option<u8>,
    /// `None` takes a single reading.
    pub interval: Option<Duration>,
    /// Software-reset the sensor before configuring it.
    pub reset: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bus: commands::DEFAULT_BUS,
            address: commands::DEFAULT_ADDRESS,
            resolution: Resolution::Rh12Temp14,
            heater_level: None,
            interval: None,
            reset: false,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Config::default();

        if let Some(v) = lookup(BUS) {
            config.bus = parse_u8(&v).with_context(|| format!("invalid {BUS}"))?;
        }

        if let Some(v) = lookup(ADDRESS) {
            let address = parse_u8(&v).with_context(|| format!("invalid {ADDRESS}"))?;
            if address > 0x7F {
                bail!("invalid {ADDRESS}: {address:#04x} is not a 7-bit address");
            }
            config.address = address;
        }

        if let Some(v) = lookup(RESOLUTION) {
            let res = parse_u8(&v).with_context(|| format!("invalid {RESOLUTION}"))?;
            config.resolution = Resolution::from_u8(res)
                .ok_or_else(|| anyhow!("invalid {RESOLUTION}: expected 0..=3, got {res}"))?;
        }

        if let Some(v) = lookup(HEATER_LEVEL) {
            let level = parse_u8(&v).with_context(|| format!("invalid {HEATER_LEVEL}"))?;
            if level > commands::HEATER_MASK {
                bail!("invalid {HEATER_LEVEL}: expected 0..=15, got {level}");
            }
            config.heater_level = Some(level);
        }

        if let Some(v) = lookup(INTERVAL) {
            let secs: u64 = v
                .trim()
                .parse()
                .with_context(|| format!("invalid {INTERVAL}"))?;
            if secs == 0 {
                bail!("invalid {INTERVAL}: must be at least 1");
            }
            config.interval = Some(Duration::from_secs(secs));
        }

        if let Some(v) = lookup(RESET) {
            config.reset = parse_bool(&v).with_context(|| format!("invalid {RESET}"))?;
        }

        Ok(config)
    }
}

fn parse_bool(s: &str) -> anyhow::Result<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => bail!("{other:?} is not a boolean"),
    }
}

/// Parses a decimal or `0x`-prefixed hexadecimal byte.
fn parse_u8(s: &str) -> anyhow::Result<u8> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.with_context(|| format!("{s:?} is not a byte value"))
}
