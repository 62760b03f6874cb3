//! esp-hal bindings for the core's hardware traits

use core::cell::RefCell;

use critical_section::Mutex;
use esp_hal::peripherals::TIMG1;
use esp_hal::time::{Duration, Instant};
use esp_hal::timer::timg::{MwdtStage, MwdtStageAction, Wdt};
use hygro_core::hal::{TickCounter, Watchdog};

/// Microsecond counter built on the system timer.
pub struct MicrosCounter {
    start: Instant,
}

impl MicrosCounter {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MicrosCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TickCounter for MicrosCounter {
    fn reset(&mut self) {
        self.start = Instant::now();
    }

    fn ticks(&mut self) -> u32 {
        self.start.elapsed().as_micros() as u32
    }
}

pub type SystemWdt = Wdt<TIMG1<'static>>;

/// The TIMG1 watchdog, shared by the sensor and the radio.
pub type WatchdogCell = Mutex<RefCell<SystemWdt>>;

/// Configure `wdt` to reset the chip once `timeout` passes without a feed.
/// It is left disabled until the first [`Watchdog::arm`].
pub fn configure_watchdog(mut wdt: SystemWdt, timeout: Duration) -> WatchdogCell {
    wdt.disable();
    wdt.set_timeout(MwdtStage::Stage0, timeout);
    wdt.set_stage_action(MwdtStage::Stage0, MwdtStageAction::ResetSystem);
    Mutex::new(RefCell::new(wdt))
}

/// Handle to the shared watchdog; cheap to copy into each driver.
#[derive(Clone, Copy)]
pub struct SharedWatchdog {
    cell: &'static WatchdogCell,
}

impl SharedWatchdog {
    pub const fn new(cell: &'static WatchdogCell) -> Self {
        Self { cell }
    }
}

impl Watchdog for SharedWatchdog {
    fn arm(&mut self) {
        critical_section::with(|cs| {
            let mut wdt = self.cell.borrow_ref_mut(cs);
            wdt.feed();
            wdt.enable();
        });
    }

    fn disarm(&mut self) {
        critical_section::with(|cs| self.cell.borrow_ref_mut(cs).disable());
    }
}
