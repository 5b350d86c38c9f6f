//! Limit switch input trait

/// A digital input wired to an axis limit switch
///
/// Implementations report the raw pin level; the axis applies the configured
/// polarity. Reads are synchronous and must not block.
pub trait LimitInput {
    /// Returns true if the input is currently high
    fn is_high(&mut self) -> bool;
}
