//! Simulated hardware for host tests and the desktop simulator
//!
//! [`SimWire`] models the single-wire sensor bus on a virtual microsecond
//! clock: every line sample costs one tick, delays advance the clock, and a
//! queued sensor frame starts playing when the host releases the line after a
//! valid start pulse. [`SimRadio`] models an ESP8266 in AT mode that answers
//! complete command lines.
//!
//! Handles share state through `Rc<RefCell<_>>` so a test can keep one clone
//! for inspection after moving another into a driver.

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use embedded_hal::delay::DelayNs;

use crate::hal::{DualModeLine, Level, SerialPort, TickCounter, Watchdog};
use crate::reading::Reading;
use crate::sensors::dht22::checksum_of;

/// Host low pulse the simulated sensor needs before it answers, in ticks.
pub const MIN_START_HOLD: u64 = 1_000;

const RELEASE_TICKS: u32 = 30;
const ACK_LOW_TICKS: u32 = 80;
const ACK_HIGH_TICKS: u32 = 80;
const BIT_GAP_TICKS: u32 = 50;
const ZERO_TICKS: u32 = 26;
const ONE_TICKS: u32 = 70;

struct WireState {
    now: u64,
    output: bool,
    driven: Level,
    low_since: Option<u64>,
    last_hold: u64,
    /// Absolute start time and level of each waveform segment; idle high after the last.
    segments: VecDeque<(u64, Level)>,
    waveform_end: u64,
    counter_base: u64,
    frames: VecDeque<Vec<(Level, u32)>>,
}

impl WireState {
    fn level_now(&mut self) -> Level {
        if self.output {
            return self.driven;
        }
        while self.segments.len() > 1 && self.segments[1].0 <= self.now {
            self.segments.pop_front();
        }
        match self.segments.front() {
            Some(&(start, level)) if start <= self.now && self.now < self.waveform_end => level,
            _ => Level::High,
        }
    }

    fn play(&mut self, waveform: &[(Level, u32)]) {
        self.segments.clear();
        let mut t = self.now;
        for &(level, width) in waveform {
            self.segments.push_back((t, level));
            t += width as u64;
        }
        self.waveform_end = t;
    }
}

/// Simulated sensor data line plus the counter clocked alongside it.
#[derive(Clone)]
pub struct SimWire {
    state: Rc<RefCell<WireState>>,
}

impl Default for SimWire {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWire {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(WireState {
                now: 0,
                output: true,
                driven: Level::High,
                low_since: None,
                last_hold: 0,
                segments: VecDeque::new(),
                waveform_end: 0,
                counter_base: 0,
                frames: VecDeque::new(),
            })),
        }
    }

    pub fn line(&self) -> SimLine {
        SimLine(self.clone())
    }

    pub fn counter(&self) -> SimCounter {
        SimCounter(self.clone())
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay(self.clone())
    }

    /// Play `waveform` on the released line starting now.
    pub fn drive_waveform(&self, waveform: &[(Level, u32)]) {
        self.state.borrow_mut().play(waveform);
    }

    /// Queue a well-formed frame carrying `reading`.
    pub fn queue_reading(&self, reading: Reading) {
        let word = reading.to_frame_word();
        self.queue_frame(word, checksum_of(word));
    }

    /// Queue a frame with an explicit (possibly wrong) checksum byte.
    pub fn queue_frame(&self, word: u32, checksum: u8) {
        self.state
            .borrow_mut()
            .frames
            .push_back(frame_waveform(word, checksum));
    }

    pub fn pending_frames(&self) -> usize {
        self.state.borrow().frames.len()
    }

    /// Whether the host is currently driving the line.
    pub fn is_output(&self) -> bool {
        self.state.borrow().output
    }
}

/// Response waveform the sensor produces once released.
///
/// Data bits are encoded in the high time after a fixed low gap. The
/// checksum bits are encoded in the low time instead, matching the edge
/// order the decoder uses for that phase.
fn frame_waveform(word: u32, checksum: u8) -> Vec<(Level, u32)> {
    let width = |bit: bool| if bit { ONE_TICKS } else { ZERO_TICKS };
    let mut waveform = Vec::with_capacity(4 + 2 * 40);
    waveform.push((Level::High, RELEASE_TICKS));
    waveform.push((Level::Low, ACK_LOW_TICKS));
    waveform.push((Level::High, ACK_HIGH_TICKS));
    for i in (0..32).rev() {
        waveform.push((Level::Low, BIT_GAP_TICKS));
        waveform.push((Level::High, width((word >> i) & 1 == 1)));
    }
    for i in (0..8).rev() {
        waveform.push((Level::Low, width((checksum >> i) & 1 == 1)));
        waveform.push((Level::High, BIT_GAP_TICKS));
    }
    waveform
}

pub struct SimLine(SimWire);

impl DualModeLine for SimLine {
    fn set_as_input(&mut self) {
        let mut state = self.0.state.borrow_mut();
        if !state.output {
            return;
        }
        state.output = false;
        if state.last_hold >= MIN_START_HOLD {
            state.last_hold = 0;
            if let Some(frame) = state.frames.pop_front() {
                state.play(&frame);
            }
        }
    }

    fn set_as_output(&mut self) {
        let mut state = self.0.state.borrow_mut();
        state.output = true;
        if state.driven == Level::Low {
            state.low_since = Some(state.now);
        }
    }

    fn set_high(&mut self) {
        let mut state = self.0.state.borrow_mut();
        if let Some(since) = state.low_since.take() {
            state.last_hold = state.now - since;
        }
        state.driven = Level::High;
    }

    fn set_low(&mut self) {
        let mut state = self.0.state.borrow_mut();
        if state.output && state.driven == Level::High {
            state.low_since = Some(state.now);
        }
        state.driven = Level::Low;
    }

    fn level(&mut self) -> Level {
        let mut state = self.0.state.borrow_mut();
        state.now += 1;
        state.level_now()
    }
}

pub struct SimCounter(SimWire);

impl TickCounter for SimCounter {
    fn reset(&mut self) {
        let mut state = self.0.state.borrow_mut();
        state.counter_base = state.now;
    }

    fn ticks(&mut self) -> u32 {
        let state = self.0.state.borrow();
        (state.now - state.counter_base) as u32
    }
}

/// Delay that advances the wire clock, one tick per microsecond.
pub struct SimDelay(SimWire);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.state.borrow_mut().now += (ns / 1_000) as u64;
    }
}

struct RadioState {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    line: Vec<u8>,
    echo: bool,
    scripted: bool,
    overrun: bool,
    receiver_enabled: bool,
    receiver_toggles: u32,
    payload: Vec<u8>,
    payload_remaining: usize,
    rejected: Vec<String>,
    commands: Vec<String>,
    payloads: Vec<Vec<u8>>,
}

impl RadioState {
    fn reply(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    fn on_command(&mut self, command: String) {
        if self.echo {
            let mut echoed = command.clone().into_bytes();
            echoed.extend_from_slice(b"\r\r\n");
            self.reply(&echoed);
        }
        if self.rejected.iter().any(|p| command.starts_with(p.as_str())) {
            self.reply(b"\r\nERROR\r\n");
        } else if let Some(len) = command.strip_prefix("AT+CIPSEND=") {
            self.payload_remaining = len.trim().parse().unwrap_or(0);
            self.reply(b"\r\nOK\r\n> ");
        } else if command.starts_with("AT+CIPSTART") {
            self.reply(b"CONNECT\r\n\r\nOK\r\n");
        } else if command.starts_with("AT+CWJAP") {
            self.reply(b"WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n");
        } else {
            self.reply(b"\r\nOK\r\n");
        }
        self.commands.push(command);
    }
}

/// Simulated ESP8266 attached to a UART.
#[derive(Clone)]
pub struct SimRadio {
    state: Rc<RefCell<RadioState>>,
}

impl Default for SimRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRadio {
    /// A radio that answers every command line like an ESP8266 with echo on.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(RadioState {
                rx: VecDeque::new(),
                tx: Vec::new(),
                line: Vec::new(),
                echo: true,
                scripted: false,
                overrun: false,
                receiver_enabled: true,
                receiver_toggles: 0,
                payload: Vec::new(),
                payload_remaining: 0,
                rejected: Vec::new(),
                commands: Vec::new(),
                payloads: Vec::new(),
            })),
        }
    }

    /// A radio that never answers on its own; feed bytes with [`SimRadio::push_rx`].
    pub fn scripted() -> Self {
        let radio = Self::new();
        radio.state.borrow_mut().scripted = true;
        radio
    }

    pub fn set_echo(&self, echo: bool) {
        self.state.borrow_mut().echo = echo;
    }

    pub fn push_rx(&self, bytes: &[u8]) {
        self.state.borrow_mut().reply(bytes);
    }

    /// Answer commands starting with `prefix` with `ERROR`.
    pub fn reject(&self, prefix: &str) {
        self.state.borrow_mut().rejected.push(String::from(prefix));
    }

    pub fn inject_overrun(&self) {
        self.state.borrow_mut().overrun = true;
    }

    pub fn transmitted(&self) -> Vec<u8> {
        self.state.borrow().tx.clone()
    }

    /// Command lines received so far, without their `\r\n`.
    pub fn commands(&self) -> Vec<String> {
        self.state.borrow().commands.clone()
    }

    /// Bodies delivered through `AT+CIPSEND`.
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.state.borrow().payloads.clone()
    }

    pub fn receiver_toggles(&self) -> u32 {
        self.state.borrow().receiver_toggles
    }

    pub fn pending_rx(&self) -> usize {
        self.state.borrow().rx.len()
    }
}

impl SerialPort for SimRadio {
    fn write_byte(&mut self, byte: u8) {
        let mut state = self.state.borrow_mut();
        state.tx.push(byte);

        if state.payload_remaining > 0 {
            state.payload.push(byte);
            state.payload_remaining -= 1;
            if state.payload_remaining == 0 {
                let body = core::mem::take(&mut state.payload);
                let receipt = alloc::format!("\r\nRecv {} bytes\r\n\r\nSEND OK\r\n", body.len());
                state.payloads.push(body);
                if !state.scripted {
                    state.reply(receipt.as_bytes());
                }
            }
            return;
        }

        state.line.push(byte);
        if state.line.ends_with(b"\r\n") {
            let len = state.line.len() - 2;
            let command = String::from_utf8_lossy(&state.line[..len]).into_owned();
            state.line.clear();
            if state.scripted {
                state.commands.push(command);
            } else {
                state.on_command(command);
            }
        }
    }

    fn read_ready(&mut self) -> bool {
        let state = self.state.borrow();
        state.receiver_enabled && !state.overrun && !state.rx.is_empty()
    }

    fn read_byte(&mut self) -> u8 {
        self.state.borrow_mut().rx.pop_front().unwrap_or(0)
    }

    fn overrun(&mut self) -> bool {
        self.state.borrow().overrun
    }

    fn set_receiver_enabled(&mut self, enabled: bool) {
        let mut state = self.state.borrow_mut();
        if !enabled && state.receiver_enabled {
            state.receiver_toggles += 1;
            if state.overrun {
                state.overrun = false;
                // The byte stuck in the receive shift register is lost.
                state.rx.pop_front();
            }
        }
        state.receiver_enabled = enabled;
    }
}

#[derive(Default)]
struct WatchdogState {
    armed: bool,
    arms: u32,
    disarms: u32,
}

/// Watchdog that only counts; it never resets anything.
#[derive(Clone, Default)]
pub struct SimWatchdog {
    state: Rc<RefCell<WatchdogState>>,
}

impl SimWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.state.borrow().armed
    }

    /// `(arms, disarms)` seen so far.
    pub fn counts(&self) -> (u32, u32) {
        let state = self.state.borrow();
        (state.arms, state.disarms)
    }
}

impl Watchdog for SimWatchdog {
    fn arm(&mut self) {
        let mut state = self.state.borrow_mut();
        state.armed = true;
        state.arms += 1;
    }

    fn disarm(&mut self) {
        let mut state = self.state.borrow_mut();
        state.armed = false;
        state.disarms += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_needs_long_start_pulse() {
        let wire = SimWire::new();
        wire.queue_reading(Reading::new(215, 450));
        let mut line = wire.line();
        let mut delay = wire.delay();

        line.set_as_output();
        line.set_low();
        delay.delay_us(200);
        line.set_high();
        line.set_as_input();
        assert_eq!(wire.pending_frames(), 1, "short pulse must not trigger a frame");

        line.set_as_output();
        line.set_low();
        delay.delay_us(2_000);
        line.set_high();
        line.set_as_input();
        assert_eq!(wire.pending_frames(), 0);
    }

    #[test]
    fn test_radio_answers_commands() {
        let mut radio = SimRadio::new();
        radio.set_echo(false);
        for &b in b"AT\r\n" {
            radio.write_byte(b);
        }
        assert_eq!(radio.commands(), ["AT"]);

        let mut answer = Vec::new();
        while radio.read_ready() {
            answer.push(radio.read_byte());
        }
        assert_eq!(answer, b"\r\nOK\r\n");
    }

    #[test]
    fn test_radio_collects_payload() {
        let mut radio = SimRadio::new();
        radio.set_echo(false);
        for &b in b"AT+CIPSEND=3\r\nabc" {
            radio.write_byte(b);
        }
        assert_eq!(radio.payloads(), [b"abc".to_vec()]);
    }

    #[test]
    fn test_overrun_blocks_reception_until_toggled() {
        let mut radio = SimRadio::scripted();
        radio.push_rx(b"xy");
        radio.inject_overrun();
        assert!(!radio.read_ready());

        radio.set_receiver_enabled(false);
        radio.set_receiver_enabled(true);
        assert!(radio.read_ready());
        assert_eq!(radio.read_byte(), b'y');
        assert_eq!(radio.receiver_toggles(), 1);
    }
}
