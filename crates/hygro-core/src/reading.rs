//! Fixed-point temperature/humidity reading

use core::fmt;

/// One decoded sensor sample.
///
/// Both fields are in tenths: `215` is 21.5 °C, `450` is 45.0 %RH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reading {
    pub temperature: i16,
    pub humidity: i16,
}

impl Reading {
    pub const fn new(temperature: i16, humidity: i16) -> Self {
        Self {
            temperature,
            humidity,
        }
    }

    /// Split the 32-bit data word of a sensor frame.
    ///
    /// The low half is temperature, the high half humidity. The halves are
    /// reinterpreted as two's complement; the sensor's sign-magnitude
    /// encoding of negative temperatures is not applied.
    pub const fn from_frame_word(word: u32) -> Self {
        Self {
            temperature: word as u16 as i16,
            humidity: (word >> 16) as u16 as i16,
        }
    }

    /// Inverse of [`Reading::from_frame_word`].
    pub const fn to_frame_word(&self) -> u32 {
        ((self.humidity as u16 as u32) << 16) | self.temperature as u16 as u32
    }

    pub const fn temperature_tenths(&self) -> Tenths {
        Tenths(self.temperature as i32)
    }

    pub const fn humidity_tenths(&self) -> Tenths {
        Tenths(self.humidity as i32)
    }
}

/// Formats a tenths value as `<whole>.<first decimal>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tenths(pub i32);

impl fmt::Display for Tenths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        write!(f, "{}{}.{}", sign, magnitude / 10, magnitude % 10)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} C, {} %RH",
            self.temperature_tenths(),
            self.humidity_tenths()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_frame_word_split() {
        let reading = Reading::from_frame_word(0x0064_0032);
        assert_eq!(reading.humidity, 100);
        assert_eq!(reading.temperature, 50);

        let negative = Reading::new(-15, 450);
        assert_eq!(negative.to_frame_word(), 0x01C2_FFF1);
        assert_eq!(Reading::from_frame_word(0x01C2_FFF1), negative);
    }

    #[test]
    fn test_tenths_display() {
        assert_eq!(Tenths(215).to_string(), "21.5");
        assert_eq!(Tenths(460).to_string(), "46.0");
        assert_eq!(Tenths(7).to_string(), "0.7");
        assert_eq!(Tenths(-25).to_string(), "-2.5");
    }

    #[test]
    fn test_reading_display() {
        assert_eq!(Reading::new(220, 460).to_string(), "22.0 C, 46.0 %RH");
    }
}
