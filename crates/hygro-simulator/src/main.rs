//! Desktop simulator for the hygro-rs temperature/humidity uplink.
//!
//! Runs the hygro-core scheduler against a simulated DHT22 wire and a
//! simulated ESP8266, with synthetic readings so the whole sample/average/upload
//! cycle can be exercised without hardware. Every request that reaches the
//! simulated radio is logged.
//!
//! Run with `RUST_LOG=debug` to see the AT traffic and decoded frames.

use std::time::{Duration, Instant};

use log::{info, warn};

use hygro_core::app_state::{SampleScheduler, TickOutcome};
use hygro_core::config::{Config, DEFAULT_WINDOW_CAPACITY};
use hygro_core::hal::Deadline;
use hygro_core::radio::{AtDriver, RadioLink};
use hygro_core::reading::Reading;
use hygro_core::sensors::Dht22;
use hygro_core::sim::{SimRadio, SimWatchdog, SimWire};

// ---------------------------------------------------------------------------
// Timing constants
// ---------------------------------------------------------------------------

/// Wall-clock stand-in for the firmware's four-second tick.
const TICK_PERIOD: Duration = Duration::from_millis(10);

/// Stop after this many uploads.
const UPLOADS_TO_RUN: usize = 3;

/// Every Nth frame is sent with a wrong checksum.
const CORRUPT_EVERY: u32 = 11;

// ---------------------------------------------------------------------------
// Mock data generation
// ---------------------------------------------------------------------------

/// Generates synthetic sensor readings that vary over time.
struct MockSensorGenerator {
    /// Seconds of simulated time, four per tick.
    elapsed_secs: f64,
    frames: u32,
}

impl MockSensorGenerator {
    fn new() -> Self {
        Self {
            elapsed_secs: 0.0,
            frames: 0,
        }
    }

    /// Advance the internal clock and return a new reading.
    fn next_reading(&mut self, dt_secs: f64) -> Reading {
        self.elapsed_secs += dt_secs;
        let t = self.elapsed_secs;

        // Temperature: roughly -2 to 8 °C so negative values show up
        let temperature = 3.0 + 5.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos();

        // Humidity: 40–60 % with different period
        let humidity = 50.0 + 10.0 * (t / 180.0).sin() + 2.0 * (t / 23.0).cos();

        Reading::new((temperature * 10.0) as i16, (humidity * 10.0) as i16)
    }

    /// Put the next frame on the wire unless one is still waiting to be read.
    fn feed(&mut self, wire: &SimWire, dt_secs: f64) {
        if wire.pending_frames() > 0 {
            return;
        }
        let reading = self.next_reading(dt_secs);
        self.frames += 1;

        if self.frames % CORRUPT_EVERY == 0 {
            let word = reading.to_frame_word();
            let checksum = hygro_core::sensors::dht22::checksum_of(word).wrapping_add(1);
            wire.queue_frame(word, checksum);
        } else {
            wire.queue_reading(reading);
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting hygro-rs simulator");

    let mut config = Config::default();
    config.internet.ssid = "Wifi Name";
    config.internet.password = "WifiPassword";
    config.server.api_key = "XXXXXXXXXXXXXXXX";
    // The simulated radio always answers; bound the waits so a driver bug
    // shows up as an error instead of a hang.
    config.sampling.radio_deadline = Deadline::Polls(100_000);

    let wire = SimWire::new();
    let radio = SimRadio::new();

    let sensor = Dht22::new(
        wire.line(),
        wire.counter(),
        wire.delay(),
        SimWatchdog::new(),
        config.sampling.bit_threshold_ticks,
        config.sampling.sensor_deadline,
    );
    let driver = AtDriver::new(
        RadioLink::new(radio.clone(), SimWatchdog::new()),
        config.sampling.radio_deadline,
        config.sampling.detect_failure_tokens,
    );
    let mut app: SampleScheduler<'_, _, _, _, DEFAULT_WINDOW_CAPACITY> =
        SampleScheduler::new(config, sensor, driver);

    if let Err(e) = app.connect() {
        warn!("Continuing without a confirmed access point: {}", e);
    }

    let mut sensor_gen = MockSensorGenerator::new();
    let mut uploads = 0;
    let mut skipped = 0;

    while uploads < UPLOADS_TO_RUN {
        let tick_start = Instant::now();

        sensor_gen.feed(&wire, 4.0);
        match app.on_tick() {
            TickOutcome::Waiting => {}
            TickOutcome::Sampled(reading) => info!("Sample {}", reading),
            TickOutcome::Uploaded(mean) => {
                uploads += 1;
                info!("Upload {} of {}: mean {}", uploads, UPLOADS_TO_RUN, mean);
                if let Some(request) = radio.payloads().last() {
                    info!("Request: {:?}", String::from_utf8_lossy(request));
                }
            }
            TickOutcome::Skipped(e) => {
                skipped += 1;
                warn!("Cycle skipped: {}", e);
            }
        }

        // --- Tick pacing --------------------------------------------------
        let elapsed = tick_start.elapsed();
        if elapsed < TICK_PERIOD {
            std::thread::sleep(TICK_PERIOD - elapsed);
        }
    }

    info!(
        "Simulator exiting after {} uploads ({} skipped cycles, {} bytes sent to the radio)",
        uploads,
        skipped,
        radio.transmitted().len()
    );
}
