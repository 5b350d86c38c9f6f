//! Step/dir stepper driver output
//!
//! Drives the STEP and DIR inputs of a standalone stepper driver (A4988,
//! DRV8825, TMC2209 without UART) from two GPIO outputs.
//!
//! Pulse widths are held with a short busy delay. They are a few
//! microseconds, well below the shortest step interval.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use jib_core::traits::StepOutput;

/// Driver timing requirements in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepTiming {
    /// Minimum STEP high time
    pub pulse_ns: u32,
    /// DIR must be stable this long before the next STEP edge
    pub dir_setup_ns: u32,
}

impl StepTiming {
    /// A4988: 1 µs high, 200 ns setup
    pub const A4988: Self = Self {
        pulse_ns: 1_000,
        dir_setup_ns: 200,
    };

    /// DRV8825: 1.9 µs high, 650 ns setup
    pub const DRV8825: Self = Self {
        pulse_ns: 1_900,
        dir_setup_ns: 650,
    };
}

impl Default for StepTiming {
    /// Slow enough for every common driver
    fn default() -> Self {
        Self {
            pulse_ns: 2_000,
            dir_setup_ns: 1_000,
        }
    }
}

/// Step/dir output on two GPIO pins
///
/// Pins must be infallible, as on-chip GPIO is.
pub struct StepDirDriver<STEP, DIR, D> {
    step: STEP,
    dir: DIR,
    delay: D,
    timing: StepTiming,
}

impl<STEP, DIR, D> StepDirDriver<STEP, DIR, D>
where
    STEP: OutputPin<Error = Infallible>,
    DIR: OutputPin<Error = Infallible>,
    D: DelayNs,
{
    /// Create a driver with STEP low
    pub fn new(mut step: STEP, dir: DIR, delay: D, timing: StepTiming) -> Self {
        step.set_low().unwrap_or_else(|e| match e {});
        Self {
            step,
            dir,
            delay,
            timing,
        }
    }

    pub fn timing(&self) -> StepTiming {
        self.timing
    }

    /// Release the pins
    pub fn free(self) -> (STEP, DIR, D) {
        (self.step, self.dir, self.delay)
    }
}

impl<STEP, DIR, D> StepOutput for StepDirDriver<STEP, DIR, D>
where
    STEP: OutputPin<Error = Infallible>,
    DIR: OutputPin<Error = Infallible>,
    D: DelayNs,
{
    fn set_direction_level(&mut self, high: bool) {
        self.dir
            .set_state(high.into())
            .unwrap_or_else(|e| match e {});
        self.delay.delay_ns(self.timing.dir_setup_ns);
    }

    fn pulse(&mut self) {
        self.step.set_high().unwrap_or_else(|e| match e {});
        self.delay.delay_ns(self.timing.pulse_ns);
        self.step.set_low().unwrap_or_else(|e| match e {});
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::ErrorType;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Pin/delay event log shared by the mocks
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Step(bool),
        Dir(bool),
        Delay(u32),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    /// Mock GPIO pin for testing
    struct MockPin {
        log: Log,
        is_step: bool,
    }

    impl ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            let event = if self.is_step {
                Event::Step(false)
            } else {
                Event::Dir(false)
            };
            self.log.borrow_mut().push(event);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            let event = if self.is_step {
                Event::Step(true)
            } else {
                Event::Dir(true)
            };
            self.log.borrow_mut().push(event);
            Ok(())
        }
    }

    struct MockDelay {
        log: Log,
    }

    impl DelayNs for MockDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.log.borrow_mut().push(Event::Delay(ns));
        }
    }

    fn driver(log: &Log) -> StepDirDriver<MockPin, MockPin, MockDelay> {
        StepDirDriver::new(
            MockPin {
                log: log.clone(),
                is_step: true,
            },
            MockPin {
                log: log.clone(),
                is_step: false,
            },
            MockDelay { log: log.clone() },
            StepTiming::DRV8825,
        )
    }

    #[test]
    fn test_starts_with_step_low() {
        let log = Log::default();
        let _driver = driver(&log);
        assert_eq!(*log.borrow(), vec![Event::Step(false)]);
    }

    #[test]
    fn test_pulse_holds_width() {
        let log = Log::default();
        let mut driver = driver(&log);
        log.borrow_mut().clear();

        driver.pulse();
        assert_eq!(
            *log.borrow(),
            vec![Event::Step(true), Event::Delay(1_900), Event::Step(false)]
        );
    }

    #[test]
    fn test_direction_setup_time() {
        let log = Log::default();
        let mut driver = driver(&log);
        log.borrow_mut().clear();

        driver.set_direction_level(true);
        driver.set_direction_level(false);
        assert_eq!(
            *log.borrow(),
            vec![
                Event::Dir(true),
                Event::Delay(650),
                Event::Dir(false),
                Event::Delay(650),
            ]
        );
    }

    #[test]
    fn test_default_timing_covers_drivers() {
        let timing = StepTiming::default();
        for driver in [StepTiming::A4988, StepTiming::DRV8825] {
            assert!(timing.pulse_ns >= driver.pulse_ns);
            assert!(timing.dir_setup_ns >= driver.dir_setup_ns);
        }
    }
}
