//! Jib Head Command Protocol
//!
//! This crate defines the serial protocol between a control panel (joystick
//! box, network bridge) and the pan/tilt head controller.
//!
//! # Protocol Overview
//!
//! All messages use a simple binary frame format:
//! ```text
//! ┌───────┬────────┬──────┬─────────────┬──────────┐
//! │ START │ LENGTH │ KIND │ PAYLOAD     │ CHECKSUM │
//! │ 0x80  │ 1B     │ 1B   │ 0–32B       │ 1B       │
//! └───────┴────────┴──────┴─────────────┴──────────┘
//! ```
//!
//! Speeds and accelerations travel as percentages in hundredths of a percent
//! (`i16`, so `10000` is 100.00 %). Positions are signed step counts (`i32`).
//! Multi-byte fields are little-endian.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod frame;
pub mod messages;
pub mod percent;

pub use frame::{Frame, FrameError, FrameParser, Payload, FRAME_START, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use messages::{HeadCommand, HeadMessage, StatusFlags, StatusReport};
pub use percent::Percent;
