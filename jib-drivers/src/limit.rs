//! Limit switch input
//!
//! Reports the raw level of the switch pin; the axis applies the configured
//! polarity. No debouncing here: the axis samples on every tick and only
//! acts on a trip while travelling toward the switch.

use core::convert::Infallible;

use embedded_hal::digital::InputPin;
use jib_core::traits::LimitInput;

/// Limit switch on a GPIO input
pub struct LimitSwitch<P> {
    pin: P,
}

impl<P: InputPin<Error = Infallible>> LimitSwitch<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn free(self) -> P {
        self.pin
    }
}

impl<P: InputPin<Error = Infallible>> LimitInput for LimitSwitch<P> {
    fn is_high(&mut self) -> bool {
        self.pin.is_high().unwrap_or_else(|e| match e {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::ErrorType;
    use jib_core::config::LimitPolarity;

    /// Mock GPIO pin for testing
    struct MockPin {
        high: bool,
    }

    impl ErrorType for MockPin {
        type Error = Infallible;
    }

    impl InputPin for MockPin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.high)
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.high)
        }
    }

    #[test]
    fn test_reports_raw_level() {
        let mut switch = LimitSwitch::new(MockPin { high: true });
        assert!(switch.is_high());

        switch.pin.high = false;
        assert!(!switch.is_high());
    }

    #[test]
    fn test_with_pull_up_switch() {
        // Normally-open switch to ground with a pull-up: pressed reads low
        let mut switch = LimitSwitch::new(MockPin { high: false });
        assert!(LimitPolarity::ActiveLow.is_triggered(switch.is_high()));

        let mut released = LimitSwitch::new(MockPin { high: true });
        assert!(!LimitPolarity::ActiveLow.is_triggered(released.is_high()));
    }
}
