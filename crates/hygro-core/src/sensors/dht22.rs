//! DHT22 / AM2302 single-wire protocol
//!
//! A read starts with the host pulling the line low for a few milliseconds and
//! releasing it. The sensor acknowledges with a low then a high pulse and
//! then clocks out 40 bits, each one encoded in how long the line stays at a
//! level. The first 32 bits carry humidity and temperature, the last 8 a
//! checksum.

use core::cmp::Ordering;

use embedded_hal::delay::DelayNs;
use log::{debug, error, warn};

use super::pulse::{MissedEdge, PulseTimer};
use super::{Sensor, SensorError};
use crate::hal::{Deadline, DualModeLine, Level, TickCounter, Watchdog, wait_until};
use crate::reading::Reading;

pub const DATA_BITS: usize = 32;
pub const CHECKSUM_BITS: usize = 8;

const START_LOW_US: u32 = 2_000;
const START_RELEASE_US: u32 = 40;

/// Outcome of comparing one pulse width to the bit threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDecision {
    One,
    Zero,
    /// Width exactly on the threshold: nothing is shifted in.
    Unset,
}

pub fn classify(width: u32, threshold: u32) -> BitDecision {
    match width.cmp(&threshold) {
        Ordering::Greater => BitDecision::One,
        Ordering::Less => BitDecision::Zero,
        Ordering::Equal => BitDecision::Unset,
    }
}

/// Low 8 bits of the sum of the four data bytes.
pub const fn checksum_of(word: u32) -> u8 {
    let [a, b, c, d] = word.to_be_bytes();
    a.wrapping_add(b).wrapping_add(c).wrapping_add(d)
}

/// Scratch accumulators for one decode attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawFrame {
    pub data: u32,
    pub checksum: u8,
}

impl RawFrame {
    pub fn push_data(&mut self, decision: BitDecision) {
        match decision {
            BitDecision::One => self.data = (self.data << 1) | 1,
            BitDecision::Zero => self.data <<= 1,
            BitDecision::Unset => {}
        }
    }

    pub fn push_checksum(&mut self, decision: BitDecision) {
        match decision {
            BitDecision::One => self.checksum = (self.checksum << 1) | 1,
            BitDecision::Zero => self.checksum <<= 1,
            BitDecision::Unset => {}
        }
    }

    /// Decode a frame from measured widths.
    pub fn from_widths(
        data: &[u32; DATA_BITS],
        checksum: &[u32; CHECKSUM_BITS],
        threshold: u32,
    ) -> Self {
        let mut frame = Self::default();
        for &width in data {
            frame.push_data(classify(width, threshold));
        }
        for &width in checksum {
            frame.push_checksum(classify(width, threshold));
        }
        frame
    }

    pub const fn expected_checksum(&self) -> u8 {
        checksum_of(self.data)
    }

    /// Check the checksum and split the data word into a reading.
    pub fn validate(&self) -> Result<Reading, SensorError> {
        let expected = self.expected_checksum();
        if expected != self.checksum {
            return Err(SensorError::ChecksumMismatch {
                expected,
                received: self.checksum,
            });
        }
        Ok(Reading::from_frame_word(self.data))
    }
}

/// DHT22 driver over an injected line, counter, delay and watchdog.
pub struct Dht22<L, C, D, W> {
    line: L,
    timer: PulseTimer<C>,
    delay: D,
    watchdog: W,
    threshold: u32,
    deadline: Deadline,
}

impl<L, C, D, W> Dht22<L, C, D, W>
where
    L: DualModeLine,
    C: TickCounter,
    D: DelayNs,
    W: Watchdog,
{
    pub fn new(
        mut line: L,
        counter: C,
        delay: D,
        watchdog: W,
        threshold: u32,
        deadline: Deadline,
    ) -> Self {
        line.set_as_output();
        line.set_high();
        Self {
            line,
            timer: PulseTimer::new(counter, deadline),
            delay,
            watchdog,
            threshold,
            deadline,
        }
    }

    /// Pull the line low, release it, and wait out the sensor's acknowledge.
    pub fn send_start_signal(&mut self) -> Result<(), SensorError> {
        self.line.set_as_output();
        self.line.set_low();
        self.delay.delay_us(START_LOW_US);
        self.line.set_high();
        self.delay.delay_us(START_RELEASE_US);
        self.line.set_as_input();

        let line = &mut self.line;
        wait_until(self.deadline, || line.level() == Level::Low)
            .map_err(|_| SensorError::NotResponding { phase: "acknowledge low" })?;
        wait_until(self.deadline, || line.level() == Level::High)
            .map_err(|_| SensorError::NotResponding { phase: "acknowledge high" })?;
        wait_until(self.deadline, || line.level() == Level::Low)
            .map_err(|_| SensorError::NotResponding { phase: "first data bit" })?;
        Ok(())
    }

    /// Clock in 32 data bits and 8 checksum bits and validate them.
    ///
    /// Data bits are the width of the high pulse. The checksum phase starts
    /// with the line already low, so its bits are timed low-to-high.
    pub fn read_frame(&mut self) -> Result<Reading, SensorError> {
        let mut frame = RawFrame::default();

        for bit in 0..DATA_BITS {
            let width = self
                .timer
                .measure(&mut self.line, Level::High)
                .map_err(|edge| missed(edge, "data bit", bit))?;
            frame.push_data(classify(width, self.threshold));
        }
        for bit in 0..CHECKSUM_BITS {
            let width = self
                .timer
                .measure(&mut self.line, Level::Low)
                .map_err(|edge| missed(edge, "checksum bit", bit))?;
            frame.push_checksum(classify(width, self.threshold));
        }

        debug!(
            "DHT22 frame: data={:#010x} checksum={:#04x}",
            frame.data, frame.checksum
        );
        frame.validate()
    }

    /// Leave the line driven high, ready for the next start signal.
    fn release_line(&mut self) {
        self.line.set_as_output();
        self.line.set_high();
    }
}

fn missed(edge: MissedEdge, what: &'static str, bit: usize) -> SensorError {
    warn!("DHT22 {} {} never saw its {:?} edge", what, bit, edge);
    SensorError::NotResponding {
        phase: match edge {
            MissedEdge::Start => "bit start edge",
            MissedEdge::End => "bit end edge",
        },
    }
}

impl<L, C, D, W> Sensor for Dht22<L, C, D, W>
where
    L: DualModeLine,
    C: TickCounter,
    D: DelayNs,
    W: Watchdog,
{
    fn read(&mut self) -> Result<Reading, SensorError> {
        self.watchdog.arm();
        let result = self.send_start_signal().and_then(|()| self.read_frame());
        self.watchdog.disarm();
        self.release_line();

        if let Err(e) = &result {
            error!("DHT22 read failed: {}", e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimCounter, SimDelay, SimLine, SimWatchdog, SimWire};

    const THRESHOLD: u32 = 40;

    fn widths_for(word: u32, checksum: u8) -> ([u32; DATA_BITS], [u32; CHECKSUM_BITS]) {
        let mut data = [0u32; DATA_BITS];
        for (i, w) in data.iter_mut().enumerate() {
            *w = if (word >> (31 - i)) & 1 == 1 { 70 } else { 26 };
        }
        let mut cs = [0u32; CHECKSUM_BITS];
        for (i, w) in cs.iter_mut().enumerate() {
            *w = if (checksum >> (7 - i)) & 1 == 1 { 70 } else { 26 };
        }
        (data, cs)
    }

    type SimDht22 = Dht22<SimLine, SimCounter, SimDelay, SimWatchdog>;

    fn driver(wire: &SimWire, watchdog: SimWatchdog) -> SimDht22 {
        Dht22::new(
            wire.line(),
            wire.counter(),
            wire.delay(),
            watchdog,
            THRESHOLD,
            Deadline::Polls(2_000),
        )
    }

    #[test]
    fn test_classify_three_way() {
        assert_eq!(classify(70, THRESHOLD), BitDecision::One);
        assert_eq!(classify(26, THRESHOLD), BitDecision::Zero);
        assert_eq!(classify(THRESHOLD, THRESHOLD), BitDecision::Unset);
    }

    #[test]
    fn test_classify_at_runtime_threshold() {
        let threshold = core::hint::black_box(48u32);
        let decisions = [47, 48, 49].map(|w| classify(w, threshold));
        assert_eq!(decisions, [BitDecision::Zero, BitDecision::Unset, BitDecision::One]);
    }

    #[test]
    fn test_decode_matches_bit_shift_reconstruction() {
        for &word in &[0u32, 0xFFFF_FFFF, 0x0064_0032, 0x8000_0001, 0x1234_ABCD] {
            let (data, cs) = widths_for(word, 0x5A);
            let frame = RawFrame::from_widths(&data, &cs, THRESHOLD);
            assert_eq!(frame.data, word);
            assert_eq!(frame.checksum, 0x5A);
        }
    }

    #[test]
    fn test_width_on_threshold_shifts_nothing() {
        let (mut data, cs) = widths_for(0xFFFF_FFFF, 0);
        data[0] = THRESHOLD;
        let frame = RawFrame::from_widths(&data, &cs, THRESHOLD);
        // 31 ones shifted in; the skipped bit leaves the top bit clear.
        assert_eq!(frame.data, 0x7FFF_FFFF);
    }

    #[test]
    fn test_checksum_validation() {
        let good = RawFrame {
            data: u32::from_be_bytes([0x00, 0x64, 0x00, 0x32]),
            checksum: 0x96,
        };
        assert_eq!(good.validate(), Ok(Reading::new(50, 100)));

        let bad = RawFrame {
            checksum: 0x97,
            ..good
        };
        assert_eq!(
            bad.validate(),
            Err(SensorError::ChecksumMismatch {
                expected: 0x96,
                received: 0x97
            })
        );
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(checksum_of(0xFFFF_FFFF), 0xFC);
    }

    #[test]
    fn test_reads_simulated_sensor() {
        let wire = SimWire::new();
        let watchdog = SimWatchdog::new();
        wire.queue_reading(Reading::new(215, 450));
        let mut dht = driver(&wire, watchdog.clone());

        assert_eq!(dht.read(), Ok(Reading::new(215, 450)));
        assert_eq!(watchdog.counts(), (1, 1));
        assert!(!watchdog.is_armed());
        assert!(wire.is_output(), "line must be driven again after a read");
    }

    #[test]
    fn test_consecutive_reads() {
        let wire = SimWire::new();
        wire.queue_reading(Reading::new(215, 450));
        wire.queue_reading(Reading::new(225, 470));
        let mut dht = driver(&wire, SimWatchdog::new());

        assert_eq!(dht.read(), Ok(Reading::new(215, 450)));
        assert_eq!(dht.read(), Ok(Reading::new(225, 470)));
    }

    #[test]
    fn test_silent_sensor_times_out() {
        let wire = SimWire::new();
        let watchdog = SimWatchdog::new();
        let mut dht = driver(&wire, watchdog.clone());

        assert_eq!(
            dht.read(),
            Err(SensorError::NotResponding {
                phase: "acknowledge low"
            })
        );
        assert!(!watchdog.is_armed());
        assert!(wire.is_output());
    }

    #[test]
    fn test_corrupted_frame_is_rejected() {
        let wire = SimWire::new();
        wire.queue_frame(0x0064_0032, 0x97);
        let mut dht = driver(&wire, SimWatchdog::new());

        assert_eq!(
            dht.read(),
            Err(SensorError::ChecksumMismatch {
                expected: 0x96,
                received: 0x97
            })
        );
    }
}
