//! Step timing
//!
//! The trapezoidal ramp that turns speed and acceleration requests into
//! pulse intervals.

pub mod engine;

pub use engine::{RampState, StepTimingEngine, MIN_ACCELERATION, SETTLED};
