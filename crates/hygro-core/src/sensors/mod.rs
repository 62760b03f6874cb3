pub mod dht22;
pub mod pulse;

use thiserror_no_std::Error;

use crate::reading::Reading;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// A wait for a sensor edge ran past its deadline.
    #[error("sensor not responding (waiting for {phase})")]
    NotResponding { phase: &'static str },
    /// The checksum byte disagrees with the sum of the data bytes.
    #[error("checksum mismatch: expected {expected:#04x}, received {received:#04x}")]
    ChecksumMismatch { expected: u8, received: u8 },
}

/// Trait for sensors that produce a temperature/humidity reading.
pub trait Sensor {
    /// Take one complete reading. Blocks for the duration of the transfer.
    fn read(&mut self) -> Result<Reading, SensorError>;
}

pub use dht22::Dht22;
pub use pulse::PulseTimer;
