//! Edge-to-edge pulse width measurement

use crate::hal::{Deadline, DualModeLine, Level, TickCounter, wait_until};

/// Which edge of a measurement never arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissedEdge {
    /// The line never reached the measured level.
    Start,
    /// The line never left the measured level.
    End,
}

/// Measures how long a line stays at one level using a resettable counter.
///
/// Only one measurement runs at a time; the caller sequences them.
pub struct PulseTimer<C> {
    counter: C,
    deadline: Deadline,
}

impl<C: TickCounter> PulseTimer<C> {
    pub const fn new(counter: C, deadline: Deadline) -> Self {
        Self { counter, deadline }
    }

    /// Wait for `line` to reach `level`, zero the counter, wait for it to
    /// leave `level`, and return the counter.
    pub fn measure<L: DualModeLine>(
        &mut self,
        line: &mut L,
        level: Level,
    ) -> Result<u32, MissedEdge> {
        wait_until(self.deadline, || line.level() == level).map_err(|_| MissedEdge::Start)?;
        self.counter.reset();
        wait_until(self.deadline, || line.level() != level).map_err(|_| MissedEdge::End)?;
        Ok(self.counter.ticks())
    }
}
