//! Jib - Pan/Tilt Camera Head Firmware
//!
//! Main firmware binary for RP2040-based pan/tilt heads. Two stepper axes
//! with a limit switch each, driven by a cooperative tick loop and
//! commanded over UART by a control panel.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_time::Delay;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use jib_core::axis::AxisController;
use jib_core::config::{parse_config, AxisConfig, HeadConfig};
use jib_core::head::MotionCoordinator;
use jib_drivers::{LimitSwitch, StepDirDriver, StepTiming};

mod channels;
mod tasks;

/// Embedded head configuration (compiled into firmware)
/// Edit head.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../head.toml");

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Jib firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();
    let pan_config = axis_config(&config, "pan", 26_000);
    let tilt_config = axis_config(&config, "tilt", 6_500);
    info!(
        "Axes: pan {}..{} @ {} steps/s, tilt {}..{} @ {} steps/s",
        pan_config.min_position,
        pan_config.max_position,
        pan_config.max_speed,
        tilt_config.min_position,
        tilt_config.max_position,
        tilt_config.max_speed
    );

    // Setup UART for panel communication
    let uart_config = UartConfig::default(); // 115200 baud default

    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();

    info!("UART initialized for panel communication");

    // Pin assignments are board-specific (SKR Pico: X = STEP 11 / DIR 10 /
    // STOP 4, Y = STEP 6 / DIR 5 / STOP 3). Endstops are normally-open
    // switches to ground, hence the pull-ups.
    let pan_stepper = StepDirDriver::new(
        Output::new(p.PIN_11, Level::Low),
        Output::new(p.PIN_10, Level::Low),
        Delay,
        StepTiming::default(),
    );
    let pan_limit = LimitSwitch::new(Input::new(p.PIN_4, Pull::Up));

    let tilt_stepper = StepDirDriver::new(
        Output::new(p.PIN_6, Level::Low),
        Output::new(p.PIN_5, Level::Low),
        Delay,
        StepTiming::default(),
    );
    let tilt_limit = LimitSwitch::new(Input::new(p.PIN_3, Pull::Up));

    // Enable lines of both drivers (shared, active low)
    let _enable = Output::new(p.PIN_12, Level::Low);

    let head = MotionCoordinator::new([
        AxisController::new(pan_config, pan_stepper, pan_limit),
        AxisController::new(tilt_config, tilt_stepper, tilt_limit),
    ]);

    info!("Spawning tasks...");

    unwrap!(spawner.spawn(tasks::command_rx_task(rx)));
    unwrap!(spawner.spawn(tasks::status_tx_task(tx)));
    unwrap!(spawner.spawn(tasks::motion_task(head)));

    info!("All tasks spawned, firmware running");

    // Keep the enable line driven for the life of the firmware
    core::future::pending::<()>().await;
}

/// Parse the embedded head.toml
fn load_config() -> HeadConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            match config.validate() {
                Ok(()) => info!("Loaded {} axes from head.toml", config.axes.len()),
                Err((i, e)) => error!("head.toml axis {} invalid: {:?}", i, e),
            }
            config
        }
        Err(e) => {
            error!("Failed to parse head.toml: {:?}, using defaults", e);
            HeadConfig::new()
        }
    }
}

/// Look up an axis, falling back to a conservative default
fn axis_config(config: &HeadConfig, name: &str, travel: i32) -> AxisConfig {
    match config.find_axis(name) {
        Some(axis) => axis.clone(),
        None => {
            warn!("No [axis.{}] in head.toml, using defaults", name);
            AxisConfig::new(name, 0, travel)
        }
    }
}
