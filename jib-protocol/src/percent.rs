//! Fixed-point percentage used for speed and acceleration fields

/// Signed percentage in hundredths of a percent
///
/// `Percent::from_hundredths(10000)` is 100.00 %. Values are clamped to
/// ±100.00 % on construction so a decoded command can never request more
/// than full scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Percent(i16);

impl Percent {
    /// 0 %
    pub const ZERO: Self = Self(0);
    /// 100 %
    pub const FULL: Self = Self(Self::SCALE);

    const SCALE: i16 = 10_000;

    /// Build from a raw wire value
    pub const fn from_hundredths(raw: i16) -> Self {
        let clamped = if raw > Self::SCALE {
            Self::SCALE
        } else if raw < -Self::SCALE {
            -Self::SCALE
        } else {
            raw
        };
        Self(clamped)
    }

    /// Build from a floating point percentage, rounding to the nearest hundredth
    pub fn from_percent(value: f32) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        let scaled = value * 100.0;
        let rounded = if scaled >= 0.0 { scaled + 0.5 } else { scaled - 0.5 };
        let clamped = rounded.clamp(-(Self::SCALE as f32), Self::SCALE as f32);
        Self(clamped as i16)
    }

    /// Raw wire value
    pub const fn hundredths(self) -> i16 {
        self.0
    }

    /// Value as a floating point percentage (-100.0 ..= 100.0)
    pub fn as_percent(self) -> f32 {
        self.0 as f32 / 100.0
    }

    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    pub fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self::from_hundredths(i16::from_le_bytes(bytes))
    }
}
