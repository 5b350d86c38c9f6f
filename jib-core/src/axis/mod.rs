//! Single-axis control
//!
//! An [`AxisController`] turns operator intents into engine calls while
//! enforcing the limit switch and soft limits.

pub mod controller;
pub mod homing;

pub use controller::{AxisController, AxisError, AxisSnapshot, AxisStatus};
pub use homing::{HomingEvent, HomingPhase};
