//! Byte transport to the radio module

use log::{debug, warn};

use super::RadioError;
use crate::hal::{Deadline, SerialPort, Watchdog, wait_until};

/// Byte-at-a-time link over an unbuffered serial port.
///
/// Receives block until a byte arrives. The watchdog is armed for the length
/// of each blocking wait, so a wedged radio resets the system instead of
/// hanging it forever.
pub struct RadioLink<S, W> {
    serial: S,
    watchdog: W,
}

impl<S: SerialPort, W: Watchdog> RadioLink<S, W> {
    pub const fn new(serial: S, watchdog: W) -> Self {
        Self { serial, watchdog }
    }

    pub fn send_byte(&mut self, byte: u8) {
        self.serial.write_byte(byte);
    }

    pub fn send(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.serial.write_byte(b);
        }
    }

    /// Block for the next received byte.
    pub fn recv_byte(
        &mut self,
        deadline: Deadline,
        waiting_for: &'static str,
    ) -> Result<u8, RadioError> {
        self.watchdog.arm();
        let serial = &mut self.serial;
        let ready = wait_until(deadline, || serial.read_ready());
        self.watchdog.disarm();

        match ready {
            Ok(()) => Ok(self.serial.read_byte()),
            Err(_) => Err(RadioError::Unresponsive { waiting_for }),
        }
    }

    /// Clear a latched receive overrun by cycling the receiver.
    ///
    /// Returns true if an overrun was cleared. Any byte in flight is lost.
    pub fn check_and_clear_overrun(&mut self) -> bool {
        if !self.serial.overrun() {
            return false;
        }
        warn!("Radio receive overrun, cycling receiver");
        self.serial.set_receiver_enabled(false);
        self.serial.set_receiver_enabled(true);
        debug!("Radio receiver re-enabled");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimRadio, SimWatchdog};

    #[test]
    fn test_recv_arms_and_disarms_watchdog() {
        let radio = SimRadio::scripted();
        let watchdog = SimWatchdog::new();
        radio.push_rx(b"K");
        let mut link = RadioLink::new(radio.clone(), watchdog.clone());

        assert_eq!(link.recv_byte(Deadline::Never, "test byte"), Ok(b'K'));
        assert_eq!(watchdog.counts(), (1, 1));
        assert!(!watchdog.is_armed());
    }

    #[test]
    fn test_recv_deadline() {
        let watchdog = SimWatchdog::new();
        let mut link = RadioLink::new(SimRadio::scripted(), watchdog.clone());

        assert_eq!(
            link.recv_byte(Deadline::Polls(10), "nothing"),
            Err(RadioError::Unresponsive {
                waiting_for: "nothing"
            })
        );
        assert!(!watchdog.is_armed());
    }

    #[test]
    fn test_overrun_cleared_once() {
        let radio = SimRadio::scripted();
        radio.inject_overrun();
        let mut link = RadioLink::new(radio.clone(), SimWatchdog::new());

        assert!(link.check_and_clear_overrun());
        assert!(!link.check_and_clear_overrun());
        assert_eq!(radio.receiver_toggles(), 1);
    }

    #[test]
    fn test_send_writes_bytes_in_order() {
        let radio = SimRadio::scripted();
        let mut link = RadioLink::new(radio.clone(), SimWatchdog::new());
        link.send(b"AT");
        link.send_byte(b'\r');
        assert_eq!(radio.transmitted(), b"AT\r");
    }
}
