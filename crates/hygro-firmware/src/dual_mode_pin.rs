//! Dual-mode GPIO pin implementation for ESP32-S3
//!
//! This module provides raw register-level control to switch a GPIO pin between
//! input mode and output mode dynamically, bypassing Rust's ownership system.
//!
//! The DHT22 data line is driven low by the host for the start pulse and then
//! released so the sensor can answer on the same wire. The switch has to happen
//! within a few microseconds, so it goes straight to the W1TS/W1TC registers.

use core::ptr::{read_volatile, write_volatile};

use hygro_core::hal::{DualModeLine, Level};

// ESP32-S3 GPIO register addresses for GPIO 0-31 (low bank)
const GPIO_OUT_W1TS_REG: u32 = 0x6000_4008; // Set output bits
const GPIO_OUT_W1TC_REG: u32 = 0x6000_400C; // Clear output bits
const GPIO_ENABLE_W1TS_REG: u32 = 0x6000_4020; // Enable output mode
const GPIO_ENABLE_W1TC_REG: u32 = 0x6000_4024; // Disable output mode (enable input)
const GPIO_IN_REG: u32 = 0x6000_403C; // Input levels

// ESP32-S3 GPIO register addresses for GPIO 32-48 (high bank)
const GPIO_OUT1_W1TS_REG: u32 = 0x6000_4014;
const GPIO_OUT1_W1TC_REG: u32 = 0x6000_4018;
const GPIO_ENABLE1_W1TS_REG: u32 = 0x6000_4030;
const GPIO_ENABLE1_W1TC_REG: u32 = 0x6000_4034;
const GPIO_IN1_REG: u32 = 0x6000_4040;

struct Registers {
    out_set: u32,
    out_clr: u32,
    enable_set: u32,
    enable_clr: u32,
    input: u32,
    bit: u32,
}

/// A GPIO pin that can be dynamically switched between input and output modes
/// using raw register manipulation.
///
/// The const generic `PIN` parameter specifies the GPIO number (0-48 for ESP32-S3).
/// The pad itself (input enable, pull-up) must be configured through esp-hal
/// before the first use; this type only flips the output enable and level.
///
/// # Example
/// ```no_run
/// // Sensor data line on GPIO4
/// let line: DualModePin<4> = DualModePin::new();
/// ```
pub struct DualModePin<const PIN: u8> {
    _private: (),
}

impl<const PIN: u8> Default for DualModePin<PIN> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const PIN: u8> DualModePin<PIN> {
    /// Creates a new DualModePin for the specified GPIO number.
    ///
    /// The caller must ensure no esp-hal driver owns the pin as an output at
    /// the same time.
    pub const fn new() -> Self {
        Self { _private: () }
    }

    #[inline]
    const fn registers(&self) -> Registers {
        if PIN < 32 {
            Registers {
                out_set: GPIO_OUT_W1TS_REG,
                out_clr: GPIO_OUT_W1TC_REG,
                enable_set: GPIO_ENABLE_W1TS_REG,
                enable_clr: GPIO_ENABLE_W1TC_REG,
                input: GPIO_IN_REG,
                bit: 1u32 << PIN,
            }
        } else {
            Registers {
                out_set: GPIO_OUT1_W1TS_REG,
                out_clr: GPIO_OUT1_W1TC_REG,
                enable_set: GPIO_ENABLE1_W1TS_REG,
                enable_clr: GPIO_ENABLE1_W1TC_REG,
                input: GPIO_IN1_REG,
                bit: 1u32 << (PIN - 32),
            }
        }
    }

    fn write(register: u32, bit: u32) {
        critical_section::with(|_| unsafe {
            write_volatile(register as *mut u32, bit);
        });
    }
}

impl<const PIN: u8> DualModeLine for DualModePin<PIN> {
    fn set_as_input(&mut self) {
        let regs = self.registers();
        Self::write(regs.enable_clr, regs.bit);
    }

    fn set_as_output(&mut self) {
        let regs = self.registers();
        Self::write(regs.enable_set, regs.bit);
    }

    fn set_high(&mut self) {
        let regs = self.registers();
        Self::write(regs.out_set, regs.bit);
    }

    fn set_low(&mut self) {
        let regs = self.registers();
        Self::write(regs.out_clr, regs.bit);
    }

    fn level(&mut self) -> Level {
        let regs = self.registers();
        // Single aligned read of a read-only register; no critical section.
        let value = unsafe { read_volatile(regs.input as *const u32) };
        Level::from_high(value & regs.bit != 0)
    }
}
