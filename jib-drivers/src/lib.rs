//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in jib-core on top of `embedded-hal` pins:
//!
//! - Step/dir stepper drivers (A4988, DRV8825, TMC2209 standalone)
//! - Limit switch inputs

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod limit;
pub mod step_dir;

pub use limit::LimitSwitch;
pub use step_dir::{StepDirDriver, StepTiming};
