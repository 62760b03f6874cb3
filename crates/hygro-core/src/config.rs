use serde::{Deserialize, Serialize};

use crate::hal::Deadline;

/// Samples averaged per upload unless the firmware picks another capacity.
pub const DEFAULT_WINDOW_CAPACITY: usize = 15;

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    pub internet: InternetConfig<'a>,
    pub server: ServerConfig<'a>,
    pub sampling: SamplingConfig,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

/// Remote endpoint receiving `GET /update` requests.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct ServerConfig<'a> {
    pub host: &'a str,
    pub port: u16,
    pub api_key: &'a str,
    /// Selects the field pair written: `field(2u-1)` and `field(2u)`.
    pub unit: u8,
}

impl Default for ServerConfig<'_> {
    fn default() -> Self {
        Self {
            host: "api.thingspeak.com",
            port: 80,
            api_key: "",
            unit: 1,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingConfig {
    /// Ticks between sensor reads.
    pub interval_ticks: u16,
    /// Pulse widths above this are a `1` bit, below it a `0` bit.
    pub bit_threshold_ticks: u32,
    /// Bound on every wait for a sensor edge.
    pub sensor_deadline: Deadline,
    /// Bound on every wait for a radio byte.
    pub radio_deadline: Deadline,
    /// Treat `ERROR` / `FAIL` from the radio as a rejected command instead of noise.
    pub detect_failure_tokens: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ticks: 15,
            bit_threshold_ticks: 40,
            sensor_deadline: Deadline::Polls(10_000),
            radio_deadline: Deadline::Never,
            detect_failure_tokens: true,
        }
    }
}

impl Default for Config<'_> {
    fn default() -> Self {
        Self {
            internet: InternetConfig::default(),
            server: ServerConfig::default(),
            sampling: SamplingConfig::default(),
        }
    }
}

impl<'a> Config<'a> {
    /// Field numbers written for this unit: `(temperature, humidity)`.
    pub const fn field_numbers(&self) -> (u16, u16) {
        let unit = self.server.unit as u16;
        ((2 * unit).saturating_sub(1), 2 * unit)
    }
}
