//! Application-wide state and error types for hygro

mod scheduler;

pub use scheduler::*;

use thiserror_no_std::Error;

use crate::radio::RadioError;
use crate::sensors::SensorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRunState {
    Uninitialized,
    WifiConnecting,
    WifiConnected,
    Error,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppError {
    #[error("Sensor error: {0}")]
    Sensor(SensorError),
    #[error("Radio error: {0}")]
    Radio(RadioError),
}

impl From<SensorError> for AppError {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

impl From<RadioError> for AppError {
    fn from(e: RadioError) -> Self {
        Self::Radio(e)
    }
}
