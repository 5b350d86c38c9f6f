//! Aggregate head status
//!
//! Built on demand from the axis controllers; nothing here is stored
//! between ticks.

use jib_protocol::{StatusFlags, StatusReport};

use crate::axis::{AxisSnapshot, HomingPhase};

/// Set of axes by index (bit `i` is axis `i`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisMask(u8);

impl AxisMask {
    pub const EMPTY: Self = Self(0);

    /// Highest axis count a mask can describe
    pub const CAPACITY: usize = u8::BITS as usize;

    fn bit(axis: usize) -> u8 {
        u32::try_from(axis)
            .ok()
            .and_then(|shift| 1u8.checked_shl(shift))
            .unwrap_or(0)
    }

    /// Add `axis`; indices past `CAPACITY` are ignored
    pub fn with(self, axis: usize) -> Self {
        Self(self.0 | Self::bit(axis))
    }

    pub fn contains(self, axis: usize) -> bool {
        self.0 & Self::bit(axis) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Lowest axis index in the set
    pub fn first(self) -> Option<usize> {
        (!self.is_empty()).then(|| self.0.trailing_zeros() as usize)
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

/// Overall result of `home_all`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingOutcome {
    /// At least one axis is still homing
    InProgress,
    /// Every axis reached its home position
    Complete,
    /// These axes reported a homing failure; none is still homing
    Failed(AxisMask),
    /// No failures, but these axes were never homed or had homing stopped
    NotHomed(AxisMask),
}

/// Snapshot of every axis plus the aggregate flags
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeadStatus<const N: usize> {
    pub axes: [AxisSnapshot; N],
}

impl<const N: usize> HeadStatus<N> {
    pub fn any_moving(&self) -> bool {
        self.axes.iter().any(|a| a.moving)
    }

    pub fn any_relative(&self) -> bool {
        self.axes.iter().any(|a| a.relative)
    }

    pub fn any_positional(&self) -> bool {
        self.axes.iter().any(|a| a.positional)
    }

    pub fn any_end_limit(&self) -> bool {
        self.axes.iter().any(|a| a.at_end_limit)
    }

    pub fn homing(&self, axis: usize) -> Option<HomingPhase> {
        self.axes.get(axis).map(|a| a.homing)
    }

    pub fn flags(&self) -> StatusFlags {
        StatusFlags::new(
            self.any_moving(),
            self.any_relative(),
            self.any_positional(),
            self.any_end_limit(),
        )
    }
}

impl HeadStatus<2> {
    /// Wire report for a pan/tilt head
    pub fn to_report(&self) -> StatusReport {
        let [x, y] = self.axes;
        StatusReport {
            x: x.position,
            y: y.position,
            flags: self.flags(),
            phase_x: x.homing.code(),
            phase_y: y.homing.code(),
        }
    }
}
