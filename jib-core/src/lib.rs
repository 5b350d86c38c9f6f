//! Board-agnostic motion core for the jib camera head firmware
//!
//! This crate contains all motion logic that does not depend on specific
//! hardware implementations:
//!
//! - Hardware abstraction traits (step/dir output, limit input)
//! - Step timing engine (trapezoidal ramp recurrence)
//! - Axis controller (limit switch, soft limits, homing)
//! - Motion coordinator for a multi-axis head
//! - Configuration types and the `head.toml` parser

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod axis;
pub mod config;
pub mod head;
pub mod motion;
pub mod traits;
