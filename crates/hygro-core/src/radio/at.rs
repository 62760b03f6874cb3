//! AT command driver for ESP8266-class serial wifi radios
//!
//! Every command is a line of ASCII terminated by `\r\n`. The radio echoes,
//! chatters status lines, and finally answers `OK`. The driver does not parse
//! any of that: it scans the byte stream for `O` immediately followed by `K`.

use core::fmt::{self, Write as _};

use heapless::String;
use log::{debug, info, warn};

use super::RadioError;
use super::link::RadioLink;
use crate::hal::{Deadline, SerialPort, Watchdog};

pub const MAX_COMMAND_LEN: usize = 128;

pub const CMD_ATTENTION: &str = "AT";
pub const CMD_STATION_MODE: &str = "AT+CWMODE=1";

/// Tokens that end a wait with [`RadioError::Rejected`] when failure
/// detection is on.
const FAILURE_TOKENS: [&str; 2] = ["ERROR", "FAIL"];

/// Where a command is in its acknowledge cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckState {
    Idle,
    Sent,
    AwaitingO,
    AwaitingK,
    Acknowledged,
}

/// Byte-wise `OK` detector.
///
/// Only an `O` directly followed by `K` acknowledges. Any other byte after an
/// `O` drops the partial match; if that byte is itself an `O` it starts a new
/// one, so `XOOK` acknowledges where a scanner that consumes bytes in pairs
/// after an `O` would miss it.
#[derive(Debug, Clone, Copy)]
pub struct AckMatcher {
    state: AckState,
}

impl Default for AckMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl AckMatcher {
    pub const fn new() -> Self {
        Self {
            state: AckState::Idle,
        }
    }

    /// Mark the command as written; scanning starts from scratch.
    pub fn sent(&mut self) {
        self.state = AckState::Sent;
    }

    pub fn feed(&mut self, byte: u8) -> AckState {
        self.state = match (self.state, byte) {
            (AckState::Acknowledged, _) => AckState::Acknowledged,
            (AckState::AwaitingK, b'K') => AckState::Acknowledged,
            (_, b'O') => AckState::AwaitingK,
            _ => AckState::AwaitingO,
        };
        self.state
    }
}

/// Streaming matcher for a fixed ASCII token.
#[derive(Debug, Clone, Copy)]
struct TokenMatcher {
    token: &'static str,
    matched: usize,
}

impl TokenMatcher {
    const fn new(token: &'static str) -> Self {
        Self { token, matched: 0 }
    }

    fn feed(&mut self, byte: u8) -> bool {
        let token = self.token.as_bytes();
        if byte == token[self.matched] {
            self.matched += 1;
            if self.matched == token.len() {
                self.matched = 0;
                return true;
            }
        } else {
            self.matched = usize::from(byte == token[0]);
        }
        false
    }
}

/// Drives the radio through a [`RadioLink`] one command at a time.
pub struct AtDriver<S, W> {
    link: RadioLink<S, W>,
    deadline: Deadline,
    detect_failures: bool,
}

impl<S: SerialPort, W: Watchdog> AtDriver<S, W> {
    pub const fn new(link: RadioLink<S, W>, deadline: Deadline, detect_failures: bool) -> Self {
        Self {
            link,
            deadline,
            detect_failures,
        }
    }

    /// Write one `\r\n`-terminated command and wait for its `OK`.
    pub fn command(&mut self, args: fmt::Arguments<'_>) -> Result<(), RadioError> {
        self.write_line(args)?;
        self.wait_ok()
    }

    fn write_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), RadioError> {
        let mut line: String<MAX_COMMAND_LEN> = String::new();
        line.write_fmt(args)
            .and_then(|()| line.write_str("\r\n"))
            .map_err(|_| RadioError::Format { what: "AT command" })?;

        debug!("AT >> {}", line.trim_end());
        self.link.send(line.as_bytes());
        Ok(())
    }

    /// Consume bytes until `O` `K` arrives back to back.
    pub fn wait_ok(&mut self) -> Result<(), RadioError> {
        self.link.check_and_clear_overrun();

        let mut matcher = AckMatcher::new();
        matcher.sent();
        let mut failures = FAILURE_TOKENS.map(TokenMatcher::new);

        loop {
            let byte = self.link.recv_byte(self.deadline, "OK")?;
            if matcher.feed(byte) == AckState::Acknowledged {
                debug!("AT << OK");
                return Ok(());
            }
            self.check_failure(&mut failures, byte)?;
        }
    }

    /// Consume bytes until the `>` data prompt.
    fn wait_prompt(&mut self) -> Result<(), RadioError> {
        let mut failures = FAILURE_TOKENS.map(TokenMatcher::new);
        loop {
            let byte = self.link.recv_byte(self.deadline, "'>' prompt")?;
            if byte == b'>' {
                return Ok(());
            }
            self.check_failure(&mut failures, byte)?;
        }
    }

    fn check_failure(&self, failures: &mut [TokenMatcher; 2], byte: u8) -> Result<(), RadioError> {
        if !self.detect_failures {
            return Ok(());
        }
        for matcher in failures.iter_mut() {
            if matcher.feed(byte) {
                warn!("Radio answered {}", matcher.token);
                return Err(RadioError::Rejected {
                    token: matcher.token,
                });
            }
        }
        Ok(())
    }

    /// Check the radio is alive and put it in station mode.
    pub fn initialize(&mut self) -> Result<(), RadioError> {
        self.command(format_args!("{}", CMD_ATTENTION))?;
        self.command(format_args!("{}", CMD_STATION_MODE))?;
        info!("Radio ready in station mode");
        Ok(())
    }

    /// Join an access point and store it as the radio's default.
    pub fn join_access_point(&mut self, ssid: &str, password: &str) -> Result<(), RadioError> {
        info!("Joining access point \"{}\"", ssid);
        self.command(format_args!("AT+CWJAP_DEF=\"{}\",\"{}\"", ssid, password))
    }

    pub fn open_tcp(&mut self, host: &str, port: u16) -> Result<(), RadioError> {
        debug!("Opening TCP connection to {}:{}", host, port);
        self.command(format_args!("AT+CIPSTART=\"TCP\",\"{}\",{}", host, port))
    }

    /// Send `payload` over the open connection using length-prefixed send mode.
    pub fn send_payload(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        self.write_line(format_args!("AT+CIPSEND={}", payload.len()))?;
        self.wait_prompt()?;
        self.link.send(payload);
        self.wait_ok()
    }
}
