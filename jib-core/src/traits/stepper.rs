//! Step/direction output trait
//!
//! This trait abstracts over the pins of a step/dir stepper driver
//! (A4988, DRV8825, TMC2209 in standalone mode, etc.)

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Direction of travel along an axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Towards `max_position`
    Forward,
    /// Towards `min_position` (and the limit switch)
    Reverse,
}

impl Direction {
    /// Get the opposite direction
    pub fn opposite(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }

    /// Direction of a signed speed or delta; zero counts as forward
    pub fn of(value: f32) -> Self {
        if value >= 0.0 {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }

    /// +1 or -1
    pub fn sign(self) -> i32 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }
}

/// Trait for step/dir driver outputs
///
/// Implementations must hold each level for the driver's minimum pulse
/// width and return promptly; the engine calls these from the tick loop.
pub trait StepOutput {
    /// Drive the direction line to `high`
    ///
    /// The engine applies any configured direction inversion before calling.
    fn set_direction_level(&mut self, high: bool);

    /// Emit a single step pulse
    fn pulse(&mut self);
}
