//! Tick-driven sample and upload cycle

use log::{debug, error, info, warn};

use super::{AppError, AppRunState};
use crate::config::Config;
use crate::hal::{SerialPort, Watchdog};
use crate::radio::AtDriver;
use crate::reading::Reading;
use crate::sensors::Sensor;
use crate::storage::{SampleWindow, WindowState};
use crate::upload::update_request;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Interval not reached yet.
    Waiting,
    /// A reading was stored; the window is not full.
    Sampled(Reading),
    /// The window filled and its mean was delivered.
    Uploaded(Reading),
    /// The cycle was abandoned; the next interval starts fresh.
    Skipped(AppError),
}

/// Owns the sensor, the radio and the sample window, and runs one
/// sequential cycle per sampling interval.
///
/// The caller supplies the time base by calling [`SampleScheduler::on_tick`]
/// once per period. Nothing here is re-entrant and nothing runs concurrently:
/// the reading completes before the window is touched, and the window is
/// updated before any radio traffic.
pub struct SampleScheduler<'a, S, P, W, const N: usize> {
    config: Config<'a>,
    sensor: S,
    radio: AtDriver<P, W>,
    window: SampleWindow<N>,
    elapsed_ticks: u16,
    run_state: AppRunState,
}

impl<'a, S, P, W, const N: usize> SampleScheduler<'a, S, P, W, N>
where
    S: Sensor,
    P: SerialPort,
    W: Watchdog,
{
    pub fn new(config: Config<'a>, sensor: S, radio: AtDriver<P, W>) -> Self {
        Self {
            config,
            sensor,
            radio,
            window: SampleWindow::new(),
            elapsed_ticks: 0,
            run_state: AppRunState::Uninitialized,
        }
    }

    pub const fn run_state(&self) -> AppRunState {
        self.run_state
    }

    pub fn window(&self) -> &SampleWindow<N> {
        &self.window
    }

    /// Bring up the radio and join the configured access point.
    pub fn connect(&mut self) -> Result<(), AppError> {
        self.run_state = AppRunState::WifiConnecting;
        let result = self.radio.initialize().and_then(|()| {
            self.radio
                .join_access_point(self.config.internet.ssid, self.config.internet.password)
        });

        match result {
            Ok(()) => {
                info!("Connected to access point \"{}\"", self.config.internet.ssid);
                self.run_state = AppRunState::WifiConnected;
                Ok(())
            }
            Err(e) => {
                error!("Radio bring-up failed: {}", e);
                self.run_state = AppRunState::Error;
                Err(e.into())
            }
        }
    }

    /// Advance by one period; runs a full cycle every `interval_ticks`.
    pub fn on_tick(&mut self) -> TickOutcome {
        self.elapsed_ticks += 1;
        if self.elapsed_ticks < self.config.sampling.interval_ticks.max(1) {
            return TickOutcome::Waiting;
        }
        self.elapsed_ticks = 0;

        match self.cycle() {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Skipping cycle: {}", e);
                TickOutcome::Skipped(e)
            }
        }
    }

    fn cycle(&mut self) -> Result<TickOutcome, AppError> {
        let reading = self.sensor.read()?;
        debug!("Sampled {}", reading);

        match self.window.push(reading) {
            WindowState::Accepted => Ok(TickOutcome::Sampled(reading)),
            WindowState::Full(mean) => {
                info!("Window of {} samples complete, mean {}", N, mean);
                self.upload(mean)?;
                Ok(TickOutcome::Uploaded(mean))
            }
        }
    }

    fn upload(&mut self, mean: Reading) -> Result<(), AppError> {
        let payload = update_request(&self.config, mean)?;
        self.radio
            .open_tcp(self.config.server.host, self.config.server.port)?;
        self.radio.send_payload(payload.as_bytes())?;
        info!("Uploaded {}", mean);
        Ok(())
    }
}
