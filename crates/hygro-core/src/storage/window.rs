use crate::reading::Reading;

/// Result of pushing a reading into a [`SampleWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Accepted,
    /// The push completed the window; carries the mean of all `N` slots.
    Full(Reading),
}

/// Fixed-capacity tumbling window of readings
///
/// Readings are written round-robin into `N` slots. When the write index
/// wraps back to slot 0 the window is full, the mean of every slot is
/// reported once, and accumulation restarts; consecutive windows never
/// overlap.
///
/// ## Usage
///
/// ```rust,ignore
/// let mut window = SampleWindow::<15>::new();
///
/// if let WindowState::Full(mean) = window.push(reading) {
///     upload(mean);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SampleWindow<const N: usize> {
    slots: [Reading; N],
    write_index: usize,
    full: bool,
}

impl<const N: usize> Default for SampleWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SampleWindow<N> {
    pub const fn new() -> Self {
        const { assert!(N > 0, "window capacity must be non-zero") };
        Self {
            slots: [Reading::new(0, 0); N],
            write_index: 0,
            full: false,
        }
    }

    /// Next slot to be written.
    pub const fn write_index(&self) -> usize {
        self.write_index
    }

    /// Store a reading; reports the mean when this push completes the window.
    pub fn push(&mut self, reading: Reading) -> WindowState {
        self.slots[self.write_index] = reading;
        self.write_index += 1;
        if self.write_index >= N {
            self.write_index = 0;
            self.full = true;
        }

        if self.full {
            self.full = false;
            WindowState::Full(self.mean())
        } else {
            WindowState::Accepted
        }
    }

    /// Mean over every slot, per field, with truncating division.
    pub fn mean(&self) -> Reading {
        let (temperature_sum, humidity_sum) = self
            .slots
            .iter()
            .fold((0i32, 0i32), |(t, h), r| (t + r.temperature as i32, h + r.humidity as i32));

        let count = N as i32;
        Reading::new((temperature_sum / count) as i16, (humidity_sum / count) as i16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_only_on_last_push() {
        let mut window = SampleWindow::<3>::new();
        assert_eq!(window.push(Reading::new(200, 400)), WindowState::Accepted);
        assert_eq!(window.push(Reading::new(210, 410)), WindowState::Accepted);
        assert_eq!(
            window.push(Reading::new(220, 420)),
            WindowState::Full(Reading::new(210, 410))
        );
        assert_eq!(window.write_index(), 0);
    }

    #[test]
    fn test_mean_truncates() {
        let mut window = SampleWindow::<4>::new();
        let mut last = WindowState::Accepted;
        for value in [10, 10, 10, 11] {
            last = window.push(Reading::new(value, value));
        }
        assert_eq!(last, WindowState::Full(Reading::new(10, 10)));
    }

    #[test]
    fn test_fields_are_independent() {
        let mut window = SampleWindow::<2>::new();
        window.push(Reading::new(215, 450));
        let state = window.push(Reading::new(225, 470));
        assert_eq!(state, WindowState::Full(Reading::new(220, 460)));
    }

    #[test]
    fn test_tumbling_windows_do_not_overlap() {
        let mut window = SampleWindow::<2>::new();
        window.push(Reading::new(100, 100));
        window.push(Reading::new(100, 100));

        assert_eq!(window.push(Reading::new(300, 300)), WindowState::Accepted);
        assert_eq!(
            window.push(Reading::new(500, 500)),
            WindowState::Full(Reading::new(400, 400))
        );
    }

    #[test]
    fn test_one_full_per_capacity_pushes() {
        let mut window = SampleWindow::<5>::new();
        let fulls = (0..15)
            .map(|i| window.push(Reading::new(i, i)))
            .filter(|s| matches!(s, WindowState::Full(_)))
            .count();
        assert_eq!(fulls, 3);
    }
}
