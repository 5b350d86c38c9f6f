//! Motion task
//!
//! Owns the head. Runs the cooperative tick loop: apply queued commands,
//! advance every axis, publish status, yield. Nothing in the loop blocks, so
//! step timing is bounded by how quickly the other tasks hand back control.

use defmt::*;
use embassy_futures::yield_now;
use embassy_rp::gpio::{Input, Output};
use embassy_time::{Delay, Instant};

use jib_core::axis::AxisStatus;
use jib_core::head::{HomingOutcome, MotionCoordinator};
use jib_drivers::{LimitSwitch, StepDirDriver};

use crate::channels::{COMMAND_CHANNEL, HEAD_STATUS};

/// Step/dir driver on two GPIO outputs
pub type Stepper = StepDirDriver<Output<'static>, Output<'static>, Delay>;

/// Pan/tilt head on RP2040 GPIO
pub type Head = MotionCoordinator<Stepper, LimitSwitch<Input<'static>>, 2>;

/// Status publish interval
const STATUS_INTERVAL_US: u32 = 50_000;

const AXIS_NAMES: [&str; 2] = ["pan", "tilt"];

fn axis_name(index: usize) -> &'static str {
    AXIS_NAMES.get(index).copied().unwrap_or("?")
}

/// Microsecond clock for the step engines; wraps every ~71 minutes
fn now_us() -> u32 {
    Instant::now().as_micros() as u32
}

#[embassy_executor::task]
pub async fn motion_task(mut head: Head) {
    info!("Motion task started");

    match head.home_all() {
        Ok(()) => info!("Homing started"),
        Err(e) => error!(
            "Homing refused on {}: {:?}",
            axis_name(e.axis),
            e.kind
        ),
    }

    let mut last_outcome = head.homing_outcome();
    let mut last_publish = now_us();

    loop {
        // Commands land between ticks, never inside one
        while let Ok(cmd) = COMMAND_CHANNEL.try_receive() {
            if let Err(e) = head.apply(&cmd) {
                warn!(
                    "{:?} refused on {}: {:?}",
                    cmd,
                    axis_name(e.axis),
                    e.kind
                );
            }
        }

        let now = now_us();
        let statuses = head.tick_axes(now);
        for (name, status) in AXIS_NAMES.iter().zip(statuses) {
            if status == AxisStatus::AtEndLimit {
                warn!("{}: end limit reached", name);
            }
        }

        let outcome = head.homing_outcome();
        if outcome != last_outcome {
            match outcome {
                HomingOutcome::Complete => info!("Homing complete"),
                HomingOutcome::Failed(mask) => {
                    for (i, name) in AXIS_NAMES.iter().enumerate() {
                        if mask.contains(i) {
                            error!("Homing failed on {}", name);
                        }
                    }
                }
                HomingOutcome::NotHomed(mask) => {
                    for (i, name) in AXIS_NAMES.iter().enumerate() {
                        if mask.contains(i) {
                            warn!("{} is not homed", name);
                        }
                    }
                }
                HomingOutcome::InProgress => debug!("Homing in progress"),
            }
            last_outcome = outcome;
        }

        if now.wrapping_sub(last_publish) >= STATUS_INTERVAL_US {
            HEAD_STATUS.signal(head.status().to_report());
            last_publish = now;
        }

        yield_now().await;
    }
}
