//! Axis and head configuration types
//!
//! An `AxisConfig` is built once at startup (from `head.toml` or code) and
//! handed to its `AxisController`, which owns it for the life of the process.

use heapless::{String, Vec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum axis name length
pub const MAX_NAME_LEN: usize = 16;

/// Maximum axes per head
pub const MAX_AXES: usize = 4;

/// Largest position magnitude the step counter is allowed to reach
pub const MAX_POSITION: i32 = 0x3fff_fff0;

/// Slowest speed the step timer can resolve (steps/s)
pub const MIN_RESOLVABLE_SPEED: f32 = 0.0003;

/// Logic level that means "switch pressed"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LimitPolarity {
    /// Switch pulls the input low when pressed (input has a pull-up)
    #[default]
    ActiveLow,
    /// Switch drives the input high when pressed
    ActiveHigh,
}

impl LimitPolarity {
    /// Translate a raw pin level into "triggered"
    pub fn is_triggered(self, level_high: bool) -> bool {
        match self {
            LimitPolarity::ActiveLow => !level_high,
            LimitPolarity::ActiveHigh => level_high,
        }
    }
}

/// Percentage-to-rate scaling
///
/// Each field is the percentage that maps to the configured full-scale
/// rate. `100.0` gives a linear mapping; `50.0` doubles every request, which
/// matches panels that send half-scale values for normal operation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PercentScaling {
    /// Speed percentage equivalent to `max_speed`
    pub speed_full_scale: f32,
    /// Acceleration percentage equivalent to `default_acceleration`
    pub accel_full_scale: f32,
}

impl PercentScaling {
    /// 100 % means full scale
    pub const LINEAR: Self = Self {
        speed_full_scale: 100.0,
        accel_full_scale: 100.0,
    };

    /// Speed `percent` (-100..=100) to a signed speed in steps/s
    pub fn speed(&self, percent: f32, max_speed: f32) -> f32 {
        let percent = clamp_percent(percent, -100.0);
        max_speed * percent / self.speed_full_scale
    }

    /// Acceleration `percent` to steps/s², never below 1 % of full scale
    pub fn acceleration(&self, percent: f32, default_acceleration: f32) -> f32 {
        let percent = clamp_percent(percent, 1.0).max(1.0);
        default_acceleration * percent / self.accel_full_scale
    }
}

impl Default for PercentScaling {
    fn default() -> Self {
        Self::LINEAR
    }
}

fn clamp_percent(percent: f32, low: f32) -> f32 {
    if percent.is_nan() {
        return 0.0;
    }
    percent.clamp(low, 100.0)
}

/// Configuration errors
///
/// An axis built with an invalid configuration stays stopped until it is
/// reconfigured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// `min_position > max_position`
    InvertedLimits,
    /// `min_position == max_position`
    ZeroWidthLimits,
    /// A limit lies beyond `±MAX_POSITION`
    LimitsOutOfRange,
    /// Safe zone negative or leaves no usable travel
    SafeZoneTooWide,
    /// Home position outside the safe travel range
    HomeOutOfRange,
    /// `max_speed` not a positive finite number
    InvalidSpeed,
    /// `default_acceleration` not a positive finite number
    InvalidAcceleration,
    /// A scaling full-scale value is not positive
    InvalidScaling,
}

/// Per-axis configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisConfig {
    /// Axis name (e.g., "pan", "tilt")
    pub name: String<MAX_NAME_LEN>,
    /// Full-scale speed in steps/s
    pub max_speed: f32,
    /// Full-scale acceleration in steps/s²
    pub default_acceleration: f32,
    /// Lower soft limit; the limit switch sits here
    pub min_position: i32,
    /// Upper soft limit
    pub max_position: i32,
    /// Where homing parks the axis
    pub home_position: i32,
    /// Margin kept clear of each soft limit by commanded moves
    pub safe_zone: i32,
    /// Which level of the limit input means "pressed"
    pub limit_polarity: LimitPolarity,
    /// Invert the direction line
    pub direction_inverted: bool,
    /// Speed used while seeking the limit switch, percent of `max_speed`
    pub homing_speed_percent: u8,
    /// Slowest speed that is treated as motion (steps/s)
    pub min_speed: f32,
    /// Percentage-to-rate formula
    pub scaling: PercentScaling,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_speed: 1000.0,
            default_acceleration: 500.0,
            min_position: 0,
            max_position: 6000,
            home_position: 3000,
            safe_zone: 20,
            limit_polarity: LimitPolarity::ActiveLow,
            direction_inverted: false,
            homing_speed_percent: 25,
            min_speed: 1.0,
            scaling: PercentScaling::LINEAR,
        }
    }
}

impl AxisConfig {
    /// Create a config with the given name and travel, homing to the midpoint
    pub fn new(name: &str, min_position: i32, max_position: i32) -> Self {
        let mut config = Self {
            min_position,
            max_position,
            home_position: midpoint(min_position, max_position),
            ..Default::default()
        };
        let _ = config.name.push_str(name);
        config
    }

    /// Check the configuration for consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_position > self.max_position {
            return Err(ConfigError::InvertedLimits);
        }
        if self.min_position == self.max_position {
            return Err(ConfigError::ZeroWidthLimits);
        }
        if self.min_position < -MAX_POSITION || self.max_position > MAX_POSITION {
            return Err(ConfigError::LimitsOutOfRange);
        }
        let span = self.max_position as i64 - self.min_position as i64;
        if self.safe_zone < 0 || 2 * self.safe_zone as i64 >= span {
            return Err(ConfigError::SafeZoneTooWide);
        }
        let (low, high) = self.safe_range();
        if self.home_position < low || self.home_position > high {
            return Err(ConfigError::HomeOutOfRange);
        }
        if !(self.max_speed.is_finite() && self.max_speed > 0.0) {
            return Err(ConfigError::InvalidSpeed);
        }
        if !(self.default_acceleration.is_finite() && self.default_acceleration > 0.0) {
            return Err(ConfigError::InvalidAcceleration);
        }
        if !(self.scaling.speed_full_scale > 0.0 && self.scaling.accel_full_scale > 0.0) {
            return Err(ConfigError::InvalidScaling);
        }
        Ok(())
    }

    /// Inclusive range that commanded positions are clamped into
    pub fn safe_range(&self) -> (i32, i32) {
        (
            self.min_position + self.safe_zone,
            self.max_position - self.safe_zone,
        )
    }

    /// Clamp a commanded position into the safe range
    pub fn clamp_position(&self, position: i32) -> i32 {
        let (low, high) = self.safe_range();
        position.clamp(low, high.max(low))
    }

    /// Signed speed in steps/s for a speed percentage
    pub fn speed_for(&self, percent: f32) -> f32 {
        self.scaling.speed(percent, self.max_speed)
    }

    /// Acceleration in steps/s² for an acceleration percentage
    pub fn acceleration_for(&self, percent: f32) -> f32 {
        self.scaling.acceleration(percent, self.default_acceleration)
    }

    /// Seek speed used during homing (steps/s, unsigned)
    pub fn homing_speed(&self) -> f32 {
        let percent = self.homing_speed_percent.clamp(1, 100) as f32;
        self.max_speed * percent / 100.0
    }
}

/// Midpoint without overflow
pub fn midpoint(a: i32, b: i32) -> i32 {
    ((a as i64 + b as i64) / 2) as i32
}

/// Configuration of a whole head
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeadConfig {
    /// Axis configurations in wiring order (pan first)
    pub axes: Vec<AxisConfig, MAX_AXES>,
}

impl HeadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find an axis by name
    pub fn find_axis(&self, name: &str) -> Option<&AxisConfig> {
        self.axes.iter().find(|a| a.name.as_str() == name)
    }

    /// Validate every axis, returning the index of the first bad one
    pub fn validate(&self) -> Result<(), (usize, ConfigError)> {
        for (i, axis) in self.axes.iter().enumerate() {
            axis.validate().map_err(|e| (i, e))?;
        }
        Ok(())
    }
}
