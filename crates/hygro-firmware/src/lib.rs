//! ESP32-S3 firmware-specific modules for hygro-rs
//!
//! This crate contains hardware-specific code that cannot compile on desktop
//! targets: GPIO register manipulation for the sensor line, the microsecond
//! counter, the watchdog and UART bindings behind hygro-core's hardware
//! traits, and the credentials baked in at build time.

#![no_std]

extern crate alloc;

pub mod dual_mode_pin;
pub mod peripherals;
pub mod secrets;
