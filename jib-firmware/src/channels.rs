//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy tasks.
//! Uses embassy-sync primitives for safe async communication.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use jib_protocol::{HeadCommand, StatusReport};

/// Channel capacity for decoded panel commands
const COMMAND_CHANNEL_SIZE: usize = 8;

/// Motion commands from the panel, applied by the motion task between ticks
pub static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, HeadCommand, COMMAND_CHANNEL_SIZE> =
    Channel::new();

/// Latest head status (published by the motion task)
pub static HEAD_STATUS: Signal<CriticalSectionRawMutex, StatusReport> = Signal::new();

/// Signal that a heartbeat (PING) was received from the panel
pub static HEARTBEAT_RECEIVED: Signal<CriticalSectionRawMutex, ()> = Signal::new();
