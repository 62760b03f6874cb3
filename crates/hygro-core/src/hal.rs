//! Hardware capabilities consumed by the core
//!
//! The protocol engines never touch registers. Everything they need from the
//! board is expressed as one of the small traits below, implemented by the
//! firmware for real peripherals and by [`crate::sim`] for host tests.

use serde::{Deserialize, Serialize};

/// Logic level on a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub const fn from_high(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

/// A single digital line whose direction can be switched at runtime.
///
/// The single-wire sensor bus needs this: the host drives the start signal,
/// then releases the line to the pull-up and listens for the sensor.
pub trait DualModeLine {
    /// Release the line (high impedance, pull-up holds it high when idle).
    fn set_as_input(&mut self);

    /// Drive the line with the last level written.
    fn set_as_output(&mut self);

    fn set_high(&mut self);

    fn set_low(&mut self);

    /// Sample the current level of the line.
    fn level(&mut self) -> Level;
}

/// A free-running hardware counter that can be zeroed.
pub trait TickCounter {
    fn reset(&mut self);

    /// Ticks elapsed since the last [`TickCounter::reset`].
    fn ticks(&mut self) -> u32;
}

/// An unbuffered byte-wide serial channel.
pub trait SerialPort {
    fn write_byte(&mut self, byte: u8);

    /// True when [`SerialPort::read_byte`] would return immediately.
    fn read_ready(&mut self) -> bool;

    /// Take the received byte. Only meaningful after `read_ready()` returned true.
    fn read_byte(&mut self) -> u8;

    /// True while a receive overrun is latched.
    fn overrun(&mut self) -> bool;

    fn set_receiver_enabled(&mut self, enabled: bool);
}

/// Last-resort system reset used while blocked on the radio or sensor.
pub trait Watchdog {
    fn arm(&mut self);
    fn disarm(&mut self);
}

/// Upper bound on a busy wait.
///
/// `Never` keeps polling forever and relies on the watchdog, `Polls(n)` gives
/// up after `n` failed checks of the predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Deadline {
    #[default]
    Never,
    Polls(u32),
}

/// Marker returned when a [`Deadline`] ran out before the predicate held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expired;

/// Busy-wait until `ready` returns true or the deadline expires.
pub fn wait_until(deadline: Deadline, mut ready: impl FnMut() -> bool) -> Result<(), Expired> {
    match deadline {
        Deadline::Never => {
            while !ready() {}
            Ok(())
        }
        Deadline::Polls(limit) => {
            for _ in 0..=limit {
                if ready() {
                    return Ok(());
                }
            }
            Err(Expired)
        }
    }
}

/// Adapts any `embedded-io` serial peripheral to [`SerialPort`].
///
/// `embedded-io` has no notion of a latched overrun flag, so a failed read is
/// recorded as one and cleared when the receiver is toggled.
pub struct IoSerial<U> {
    uart: U,
    pending: Option<u8>,
    overrun: bool,
    receiver_enabled: bool,
}

impl<U> IoSerial<U>
where
    U: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady,
{
    pub const fn new(uart: U) -> Self {
        Self {
            uart,
            pending: None,
            overrun: false,
            receiver_enabled: true,
        }
    }

    pub fn release(self) -> U {
        self.uart
    }
}

impl<U> SerialPort for IoSerial<U>
where
    U: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady,
{
    fn write_byte(&mut self, byte: u8) {
        if let Err(e) = self.uart.write_all(&[byte]) {
            log::error!("Serial write failed: {:?}", e);
        }
    }

    fn read_ready(&mut self) -> bool {
        if self.pending.is_some() {
            return true;
        }
        if !self.receiver_enabled || self.overrun {
            return false;
        }
        match self.uart.read_ready() {
            Ok(true) => {
                let mut byte = [0u8; 1];
                match self.uart.read(&mut byte) {
                    Ok(1) => {
                        self.pending = Some(byte[0]);
                        true
                    }
                    Ok(_) => false,
                    Err(e) => {
                        log::warn!("Serial read failed, latching overrun: {:?}", e);
                        self.overrun = true;
                        false
                    }
                }
            }
            Ok(false) => false,
            Err(e) => {
                log::warn!("Serial status read failed, latching overrun: {:?}", e);
                self.overrun = true;
                false
            }
        }
    }

    fn read_byte(&mut self) -> u8 {
        self.pending.take().unwrap_or(0)
    }

    fn overrun(&mut self) -> bool {
        self.overrun
    }

    fn set_receiver_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.pending = None;
            self.overrun = false;
        }
        self.receiver_enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::VecDeque;
    use alloc::vec::Vec;

    #[test]
    fn test_wait_until_bounded_expires() {
        let mut polls = 0;
        let result = wait_until(Deadline::Polls(5), || {
            polls += 1;
            false
        });
        assert_eq!(result, Err(Expired));
        assert_eq!(polls, 6);
    }

    #[test]
    fn test_wait_until_stops_on_predicate() {
        let mut polls = 0;
        let result = wait_until(Deadline::Never, || {
            polls += 1;
            polls == 3
        });
        assert_eq!(result, Ok(()));
        assert_eq!(polls, 3);
    }

    #[test]
    fn test_level_from_high() {
        assert_eq!(Level::from_high(true), Level::High);
        assert_eq!(Level::from_high(false), Level::Low);
    }

    #[derive(Debug)]
    struct Broken;

    impl core::fmt::Display for Broken {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            f.write_str("broken uart")
        }
    }

    impl core::error::Error for Broken {}

    impl embedded_io::Error for Broken {
        fn kind(&self) -> embedded_io::ErrorKind {
            embedded_io::ErrorKind::Other
        }
    }

    /// UART double: scripted receive queue, optional one-shot read failure.
    struct FakeUart {
        rx: VecDeque<u8>,
        tx: Vec<u8>,
        fail_next_read: bool,
    }

    impl embedded_io::ErrorType for FakeUart {
        type Error = Broken;
    }

    impl embedded_io::Read for FakeUart {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Broken> {
            if self.fail_next_read {
                self.fail_next_read = false;
                return Err(Broken);
            }
            match self.rx.pop_front() {
                Some(b) => {
                    buf[0] = b;
                    Ok(1)
                }
                None => Ok(0),
            }
        }
    }

    impl embedded_io::ReadReady for FakeUart {
        fn read_ready(&mut self) -> Result<bool, Broken> {
            Ok(!self.rx.is_empty())
        }
    }

    impl embedded_io::Write for FakeUart {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Broken> {
            self.tx.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Broken> {
            Ok(())
        }
    }

    #[test]
    fn test_io_serial_reads_and_writes() {
        let uart = FakeUart {
            rx: VecDeque::from([b'O', b'K']),
            tx: Vec::new(),
            fail_next_read: false,
        };
        let mut serial = IoSerial::new(uart);

        serial.write_byte(b'A');
        assert!(serial.read_ready());
        assert_eq!(serial.read_byte(), b'O');
        assert!(serial.read_ready());
        assert_eq!(serial.read_byte(), b'K');
        assert!(!serial.read_ready());

        assert_eq!(serial.release().tx, b"A");
    }

    #[test]
    fn test_io_serial_latches_overrun_until_receiver_toggled() {
        let uart = FakeUart {
            rx: VecDeque::from([b'x']),
            tx: Vec::new(),
            fail_next_read: true,
        };
        let mut serial = IoSerial::new(uart);

        assert!(!serial.read_ready());
        assert!(serial.overrun());
        assert!(!serial.read_ready());

        serial.set_receiver_enabled(false);
        serial.set_receiver_enabled(true);
        assert!(!serial.overrun());
        assert!(serial.read_ready());
        assert_eq!(serial.read_byte(), b'x');
    }
}
