//! Deployment credentials, baked in by `build.rs` from `.env`

use hygro_core::config::{Config, InternetConfig, SamplingConfig, ServerConfig};

pub const WIFI_SSID: &str = env!("WIFI_SSID");
pub const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");
pub const API_KEY: &str = env!("API_KEY");
/// Validated by `build.rs` to be 1..=255.
const UNIT_NUMBER: &str = env!("UNIT_NUMBER");

/// Runtime configuration for this board.
pub fn firmware_config(sampling: SamplingConfig) -> Config<'static> {
    let unit = UNIT_NUMBER.parse().unwrap_or_else(|_| {
        log::warn!("Invalid UNIT_NUMBER {:?}, using 1", UNIT_NUMBER);
        1
    });

    Config {
        internet: InternetConfig {
            ssid: WIFI_SSID,
            password: WIFI_PASSWORD,
        },
        server: ServerConfig {
            api_key: API_KEY,
            unit,
            ..ServerConfig::default()
        },
        sampling,
    }
}
