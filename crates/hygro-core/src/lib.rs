//! Hardware-independent core library for hygro-rs
//!
//! This crate contains all platform-agnostic logic for the hygro
//! temperature/humidity uplink: the DHT22 single-wire decoder, the tumbling
//! sample window, the ESP8266 AT-command driver, request formatting and the
//! tick-driven scheduler tying them together.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).
//! Hardware is reached only through the traits in [`hal`].

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod app_state;
pub mod config;
pub mod hal;
pub mod radio;
pub mod reading;
pub mod sensors;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod storage;
pub mod upload;
