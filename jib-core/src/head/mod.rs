//! Multi-axis head
//!
//! Fans commands out to every axis and aggregates their status.

pub mod coordinator;
pub mod status;

pub use coordinator::{HeadError, MotionCoordinator};
pub use status::{AxisMask, HeadStatus, HomingOutcome};
