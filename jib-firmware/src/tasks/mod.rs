//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod command_rx;
pub mod motion;
pub mod status_tx;

pub use command_rx::command_rx_task;
pub use motion::{motion_task, Head};
pub use status_tx::status_tx_task;
