#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_time::{Duration, Ticker};
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{DriveMode, Flex, InputConfig, OutputConfig, Pull};
use esp_hal::timer::timg::TimerGroup;
use esp_hal::uart::{Config as UartConfig, Uart};
use log::{error, info};
use static_cell::StaticCell;

use hygro_core::app_state::{SampleScheduler, TickOutcome};
use hygro_core::config::{DEFAULT_WINDOW_CAPACITY, SamplingConfig};
use hygro_core::hal::{Deadline, IoSerial};
use hygro_core::radio::{AtDriver, RadioLink};
use hygro_core::sensors::Dht22;
use hygro_firmware::dual_mode_pin::DualModePin;
use hygro_firmware::peripherals::{MicrosCounter, SharedWatchdog, WatchdogCell, configure_watchdog};
use hygro_firmware::secrets::firmware_config;

/// Base period of the sample scheduler.
const TICK_PERIOD: Duration = Duration::from_secs(4);

/// Longest the chip may stay blocked on the sensor or a single radio byte.
const WATCHDOG_TIMEOUT: esp_hal::time::Duration = esp_hal::time::Duration::from_secs(8);

const RADIO_BAUD: u32 = 115_200;

/// GPIO carrying the DHT22 data line; must match the pad handed to `Flex::new`.
const SENSOR_PIN: u8 = 4;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(size: 32 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    static WATCHDOG: StaticCell<WatchdogCell> = StaticCell::new();
    let timg1 = TimerGroup::new(peripherals.TIMG1);
    let watchdog_cell = WATCHDOG.init(configure_watchdog(timg1.wdt, WATCHDOG_TIMEOUT));
    let watchdog = SharedWatchdog::new(watchdog_cell);

    // The pad is configured once through esp-hal and must stay alive; the
    // sensor driver then flips its direction through the GPIO registers.
    let mut sensor_pad = Flex::new(peripherals.GPIO4);
    sensor_pad.apply_input_config(&InputConfig::default().with_pull(Pull::Up));
    sensor_pad.apply_output_config(
        &OutputConfig::default()
            .with_drive_mode(DriveMode::OpenDrain)
            .with_pull(Pull::Up),
    );
    sensor_pad.set_input_enable(true);

    let sampling = SamplingConfig {
        // Zero bits are ~27 us high, one bits ~70 us.
        bit_threshold_ticks: 48,
        sensor_deadline: Deadline::Polls(10_000),
        radio_deadline: Deadline::Never,
        ..SamplingConfig::default()
    };
    let config = firmware_config(sampling);

    let sensor = Dht22::new(
        DualModePin::<SENSOR_PIN>::new(),
        MicrosCounter::new(),
        Delay::new(),
        watchdog,
        config.sampling.bit_threshold_ticks,
        config.sampling.sensor_deadline,
    );

    let uart = Uart::new(
        peripherals.UART1,
        UartConfig::default().with_baudrate(RADIO_BAUD),
    )
    .expect("Failed to initialize radio UART")
    .with_rx(peripherals.GPIO18)
    .with_tx(peripherals.GPIO17);

    let radio = AtDriver::new(
        RadioLink::new(IoSerial::new(uart), watchdog),
        config.sampling.radio_deadline,
        config.sampling.detect_failure_tokens,
    );

    let mut app: SampleScheduler<'_, _, _, _, DEFAULT_WINDOW_CAPACITY> =
        SampleScheduler::new(config, sensor, radio);

    if let Err(e) = app.connect() {
        error!("Radio setup failed, uploads will be attempted anyway: {}", e);
    }

    info!(
        "Sampling every {} ticks of {} s, {} samples per upload",
        config.sampling.interval_ticks,
        TICK_PERIOD.as_secs(),
        DEFAULT_WINDOW_CAPACITY
    );

    let mut ticker = Ticker::every(TICK_PERIOD);
    loop {
        ticker.next().await;
        if let TickOutcome::Uploaded(mean) = app.on_tick() {
            info!("Uploaded mean {}", mean);
        }
    }
}
