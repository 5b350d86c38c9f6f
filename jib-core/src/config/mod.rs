//! Configuration types
//!
//! Board-agnostic axis configuration and the `head.toml` parser.

pub mod axis;
pub mod toml;

pub use axis::*;
pub use toml::{parse_config, ParseError};
