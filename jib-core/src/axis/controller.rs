//! Axis controller
//!
//! Wraps a [`StepTimingEngine`] with the limit switch, soft limits, the
//! homing sequence and percentage-scaled commands. One controller owns one
//! axis: its config, its pins and its runtime state.

use libm::fabsf;

use crate::config::{AxisConfig, ConfigError};
use crate::motion::StepTimingEngine;
use crate::traits::{Direction, LimitInput, StepOutput};

use super::homing::{HomingEvent, HomingPhase};

/// Result of one controller tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisStatus {
    /// A ramp is active or about to start
    Moving,
    /// At rest
    Stopped,
    /// Limit switch tripped outside homing; axis hard-stopped and re-referenced
    AtEndLimit,
}

/// Reasons a command was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisError {
    /// The axis configuration is invalid; the axis stays stopped
    Misconfigured(ConfigError),
    /// Positional moves need a completed homing run
    NotReferenced,
    /// Homing owns the axis until it finishes or is stopped
    HomingInProgress,
}

impl From<ConfigError> for AxisError {
    fn from(e: ConfigError) -> Self {
        AxisError::Misconfigured(e)
    }
}

/// What the axis was last told to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum MoveMode {
    Idle,
    /// Jogging at a percentage of full speed
    Speed,
    /// Travelling to an absolute position
    Absolute,
    /// Travelling by a delta
    Relative,
}

/// Point-in-time view of one axis
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisSnapshot {
    pub position: i32,
    /// Signed speed in steps/s
    pub speed: f32,
    pub homing: HomingPhase,
    pub referenced: bool,
    pub moving: bool,
    pub relative: bool,
    pub positional: bool,
    pub at_end_limit: bool,
}

/// Controller for a single axis
pub struct AxisController<S, L> {
    config: AxisConfig,
    config_error: Option<ConfigError>,
    engine: StepTimingEngine<S>,
    limit: L,
    homing: HomingPhase,
    /// Position is tied to the limit switch by a homing run
    referenced: bool,
    mode: MoveMode,
    /// Last trip has not been followed by a new command yet
    at_end_limit: bool,
}

impl<S: StepOutput, L: LimitInput> AxisController<S, L> {
    /// Build a controller; never fails
    ///
    /// An invalid config is recorded and every motion command is refused with
    /// [`AxisError::Misconfigured`] until [`reconfigure`] succeeds. The
    /// position is unknown until homing, so it starts at the home position.
    ///
    /// [`reconfigure`]: AxisController::reconfigure
    pub fn new(config: AxisConfig, output: S, limit: L) -> Self {
        let engine = StepTimingEngine::new(output, config.max_speed, config.default_acceleration);
        let mut axis = Self {
            config,
            config_error: None,
            engine,
            limit,
            homing: HomingPhase::Idle,
            referenced: false,
            mode: MoveMode::Idle,
            at_end_limit: false,
        };
        let config = axis.config.clone();
        // Error is kept in `config_error`
        let _ = axis.apply_config(config);
        axis
    }

    /// Replace the configuration
    ///
    /// Stops the axis immediately and drops the position reference. Meant to
    /// be called at rest.
    pub fn reconfigure(&mut self, config: AxisConfig) -> Result<(), ConfigError> {
        self.engine.hard_stop();
        self.homing = HomingPhase::Idle;
        self.referenced = false;
        self.mode = MoveMode::Idle;
        self.at_end_limit = false;
        self.apply_config(config)
    }

    fn apply_config(&mut self, config: AxisConfig) -> Result<(), ConfigError> {
        let result = config.validate();
        self.config = config;
        self.config_error = result.err();

        if let Err(e) = result {
            #[cfg(feature = "defmt")]
            defmt::error!("axis {}: invalid config {}", self.config.name.as_str(), e);
            return Err(e);
        }

        let c = &self.config;
        self.engine.set_min_speed(c.min_speed);
        self.engine.set_max_speed(c.max_speed);
        self.engine.set_acceleration(c.default_acceleration);
        self.engine.set_direction_inverted(c.direction_inverted);
        self.engine.set_limits(c.min_position, c.max_position);
        self.engine.set_position(c.home_position);
        Ok(())
    }

    fn check_ready(&self, needs_reference: bool) -> Result<(), AxisError> {
        if let Some(e) = self.config_error {
            return Err(AxisError::Misconfigured(e));
        }
        if self.homing.is_active() {
            return Err(AxisError::HomingInProgress);
        }
        if needs_reference && !self.referenced {
            return Err(AxisError::NotReferenced);
        }
        Ok(())
    }

    fn advance_homing(&mut self, event: HomingEvent) {
        let next = self.homing.transition(event);
        if next != self.homing {
            #[cfg(feature = "defmt")]
            defmt::debug!(
                "axis {}: homing {} -> {}",
                self.config.name.as_str(),
                self.homing,
                next
            );
            self.homing = next;
        }
    }

    // ---- commands ----

    /// Jog at `speed_percent` of full speed (-100..=100)
    ///
    /// Travel ends at the safe-zone boundary in the direction of motion with
    /// a controlled deceleration. A speed below the minimum is a stop.
    pub fn move_at_speed(&mut self, speed_percent: f32, accel_percent: f32) -> Result<(), AxisError> {
        self.check_ready(false)?;
        self.at_end_limit = false;
        self.engine
            .set_acceleration(self.config.acceleration_for(accel_percent));

        let speed = self.config.speed_for(speed_percent);
        if fabsf(speed) < self.config.min_speed {
            self.engine.clear_target();
            self.engine.stop();
            return Ok(());
        }

        let (low, high) = self.config.safe_range();
        let direction = Direction::of(speed);
        let boundary = match direction {
            Direction::Forward => high,
            Direction::Reverse => low,
        };

        // Already at or past the boundary: nothing left to travel
        if (boundary - self.engine.position()) * direction.sign() <= 0 {
            self.engine.clear_target();
            self.engine.stop();
            return Ok(());
        }

        self.engine.move_to(boundary, fabsf(speed));
        self.mode = MoveMode::Speed;
        Ok(())
    }

    /// Travel to `position`, clamped into the safe range
    pub fn move_to_absolute(
        &mut self,
        position: i32,
        speed_percent: f32,
        accel_percent: f32,
    ) -> Result<(), AxisError> {
        self.check_ready(true)?;
        self.start_positional(position, speed_percent, accel_percent, MoveMode::Absolute);
        Ok(())
    }

    /// Travel by `delta` steps from the current position
    pub fn move_relative(
        &mut self,
        delta: i32,
        speed_percent: f32,
        accel_percent: f32,
    ) -> Result<(), AxisError> {
        self.check_ready(true)?;
        let target = self.engine.position().saturating_add(delta);
        self.start_positional(target, speed_percent, accel_percent, MoveMode::Relative);
        Ok(())
    }

    /// Travel to the configured home position
    pub fn move_to_home(&mut self, speed_percent: f32, accel_percent: f32) -> Result<(), AxisError> {
        self.check_ready(true)?;
        let home = self.config.home_position;
        self.start_positional(home, speed_percent, accel_percent, MoveMode::Absolute);
        Ok(())
    }

    fn start_positional(&mut self, target: i32, speed_percent: f32, accel_percent: f32, mode: MoveMode) {
        self.at_end_limit = false;
        self.engine
            .set_acceleration(self.config.acceleration_for(accel_percent));
        let target = self.config.clamp_position(target);
        let speed = fabsf(self.config.speed_for(speed_percent));
        self.engine.move_to(target, speed);
        self.mode = mode;
    }

    /// Change the cruise speed of the current move, keeping its target
    ///
    /// Has no effect while at rest.
    pub fn adjust_speed(&mut self, speed_percent: f32) -> Result<(), AxisError> {
        self.check_ready(false)?;
        if let Some(target) = self.engine.target() {
            let speed = fabsf(self.config.speed_for(speed_percent));
            self.engine.move_to(target, speed);
        }
        Ok(())
    }

    /// Controlled deceleration to rest
    ///
    /// Always accepted. Aborts a homing run: an abort while seeking leaves
    /// the axis unreferenced, an abort on the way home keeps the reference
    /// taken at the switch.
    pub fn stop(&mut self, decel_percent: f32) {
        if self.homing.is_active() {
            self.advance_homing(HomingEvent::Abort);
            self.engine
                .set_limits(self.config.min_position, self.config.max_position);
        }
        self.engine
            .set_acceleration(self.config.acceleration_for(decel_percent));
        self.engine.clear_target();
        self.engine.stop();
    }

    /// Start (or restart) the homing sequence
    ///
    /// The axis seeks the limit switch in reverse at the homing speed. Travel
    /// is widened to twice the configured span so the switch is found from
    /// anywhere on the axis.
    pub fn home(&mut self) -> Result<(), AxisError> {
        if let Some(e) = self.config_error {
            return Err(AxisError::Misconfigured(e));
        }

        let min = self.config.min_position;
        let max = self.config.max_position;
        let span = max - min;

        self.referenced = false;
        self.at_end_limit = false;
        self.mode = MoveMode::Idle;

        // Any motion in flight would carry past the re-referenced position
        self.engine.hard_stop();
        self.engine.set_limits(min.saturating_sub(span), max);
        self.engine.set_position(max);
        self.engine.set_acceleration(self.config.default_acceleration);
        self.engine.clear_target();
        self.engine.set_target_speed(-self.config.homing_speed());

        self.advance_homing(HomingEvent::Start);
        Ok(())
    }

    /// Change the full-scale speed; percentage commands scale from it
    pub fn set_max_speed(&mut self, max_speed: f32) -> Result<(), AxisError> {
        if !(max_speed.is_finite() && max_speed > 0.0) {
            return Err(AxisError::Misconfigured(ConfigError::InvalidSpeed));
        }
        self.config.max_speed = max_speed;
        self.engine.set_max_speed(max_speed);
        Ok(())
    }

    // ---- polling ----

    /// Advance the axis; call every loop iteration
    ///
    /// The limit switch is sampled on every call.
    pub fn tick(&mut self, now_us: u32) -> AxisStatus {
        if self.config_error.is_some() {
            return AxisStatus::Stopped;
        }

        let triggered = self
            .config
            .limit_polarity
            .is_triggered(self.limit.is_high());

        match self.homing {
            HomingPhase::MovingToMin => return self.tick_seek(now_us, triggered),
            HomingPhase::MovingToHome => return self.tick_return(now_us),
            _ => {}
        }

        // The switch sits at the low end; only travel toward it can trip it,
        // so a bounce while stopped or moving away is ignored
        if triggered && self.engine.is_running() && self.engine.heading() == Direction::Reverse {
            return self.trip_end_limit();
        }

        if self.engine.tick(now_us) {
            AxisStatus::Moving
        } else {
            self.mode = MoveMode::Idle;
            AxisStatus::Stopped
        }
    }

    fn tick_seek(&mut self, now_us: u32, triggered: bool) -> AxisStatus {
        if triggered {
            self.engine.hard_stop();
            self.engine
                .set_limits(self.config.min_position, self.config.max_position);
            self.engine.set_position(self.config.min_position);
            self.referenced = true;
            self.advance_homing(HomingEvent::LimitTriggered);

            self.engine
                .move_to(self.config.home_position, self.config.homing_speed());
            return AxisStatus::Moving;
        }

        if self.engine.tick(now_us) {
            return AxisStatus::Moving;
        }

        // Travel is only exhausted on the seek floor
        let (floor, _) = self.engine.limits();
        if self.engine.position() > floor {
            self.engine.set_target_speed(-self.config.homing_speed());
            if self.engine.is_running() {
                return AxisStatus::Moving;
            }
        }

        #[cfg(feature = "defmt")]
        defmt::warn!(
            "axis {}: limit switch not found within travel",
            self.config.name.as_str()
        );
        self.engine
            .set_limits(self.config.min_position, self.config.max_position);
        self.advance_homing(HomingEvent::TravelExhausted);
        AxisStatus::Stopped
    }

    fn tick_return(&mut self, now_us: u32) -> AxisStatus {
        if self.engine.tick(now_us) {
            return AxisStatus::Moving;
        }
        let at_home = self.engine.position() == self.config.home_position;
        self.advance_homing(HomingEvent::Settled { at_home });
        AxisStatus::Stopped
    }

    fn trip_end_limit(&mut self) -> AxisStatus {
        self.engine.hard_stop();
        self.engine
            .set_position(self.config.min_position + self.config.safe_zone);
        self.mode = MoveMode::Idle;
        self.at_end_limit = true;

        #[cfg(feature = "defmt")]
        defmt::warn!(
            "axis {}: end limit tripped, position re-referenced",
            self.config.name.as_str()
        );
        AxisStatus::AtEndLimit
    }

    // ---- state ----

    pub fn position(&self) -> i32 {
        self.engine.position()
    }

    pub fn speed(&self) -> f32 {
        self.engine.speed()
    }

    pub fn homing_phase(&self) -> HomingPhase {
        self.homing
    }

    pub fn is_referenced(&self) -> bool {
        self.referenced
    }

    pub fn is_moving(&self) -> bool {
        self.engine.is_running()
    }

    /// Executing a relative move
    pub fn is_moving_relative(&self) -> bool {
        self.mode == MoveMode::Relative && self.engine.is_running()
    }

    /// Travelling toward an absolute target
    pub fn is_moving_to_position(&self) -> bool {
        self.mode == MoveMode::Absolute && self.engine.is_running()
    }

    pub fn at_end_limit(&self) -> bool {
        self.at_end_limit
    }

    pub fn config(&self) -> &AxisConfig {
        &self.config
    }

    pub fn config_error(&self) -> Option<ConfigError> {
        self.config_error
    }

    pub fn engine(&self) -> &StepTimingEngine<S> {
        &self.engine
    }

    pub fn snapshot(&self) -> AxisSnapshot {
        AxisSnapshot {
            position: self.position(),
            speed: self.speed(),
            homing: self.homing,
            referenced: self.referenced,
            moving: self.is_moving(),
            relative: self.is_moving_relative(),
            positional: self.is_moving_to_position(),
            at_end_limit: self.at_end_limit,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Stepper that moves a simulated carriage
    pub(crate) struct SimOutput {
        dir_high: bool,
        carriage: Rc<Cell<i32>>,
    }

    impl StepOutput for SimOutput {
        fn set_direction_level(&mut self, high: bool) {
            self.dir_high = high;
        }

        fn pulse(&mut self) {
            let step = if self.dir_high { 1 } else { -1 };
            self.carriage.set(self.carriage.get() + step);
        }
    }

    /// Active-low switch pressed when the carriage is at or below 0
    pub(crate) struct MockLimit {
        carriage: Rc<Cell<i32>>,
        fitted: Rc<Cell<bool>>,
    }

    impl LimitInput for MockLimit {
        fn is_high(&mut self) -> bool {
            !(self.fitted.get() && self.carriage.get() <= 0)
        }
    }

    /// Physical side of a simulated axis
    #[derive(Clone, Default)]
    pub(crate) struct Rig {
        pub carriage: Rc<Cell<i32>>,
        pub fitted: Rc<Cell<bool>>,
    }

    impl Rig {
        pub fn new(carriage: i32) -> Self {
            let rig = Self::default();
            rig.carriage.set(carriage);
            rig.fitted.set(true);
            rig
        }

        pub fn parts(&self) -> (SimOutput, MockLimit) {
            (
                SimOutput {
                    dir_high: true,
                    carriage: self.carriage.clone(),
                },
                MockLimit {
                    carriage: self.carriage.clone(),
                    fitted: self.fitted.clone(),
                },
            )
        }
    }

    pub(crate) fn test_config() -> AxisConfig {
        let mut config = AxisConfig::new("pan", 0, 2000);
        config.max_speed = 2000.0;
        config.default_acceleration = 8000.0;
        config
    }

    pub(crate) type TestAxis = AxisController<SimOutput, MockLimit>;

    fn axis(rig: &Rig) -> TestAxis {
        let (output, limit) = rig.parts();
        AxisController::new(test_config(), output, limit)
    }

    /// Tick once and move the clock to the next due pulse
    fn step(axis: &mut TestAxis, now: &mut u32) -> AxisStatus {
        let status = axis.tick(*now);
        *now = now.wrapping_add(axis.engine().step_interval().max(1));
        status
    }

    fn run_homing(axis: &mut TestAxis, now: &mut u32) {
        axis.home().unwrap();
        for _ in 0..200_000 {
            step(axis, now);
            if !axis.homing_phase().is_active() {
                return;
            }
        }
        panic!("homing did not finish");
    }

    fn run_to_rest(axis: &mut TestAxis, now: &mut u32) -> AxisStatus {
        for _ in 0..200_000 {
            let status = step(axis, now);
            if status != AxisStatus::Moving {
                return status;
            }
        }
        panic!("axis did not come to rest");
    }

    #[test]
    fn test_homing_completes() {
        let rig = Rig::new(700);
        let mut axis = axis(&rig);
        let mut now = 0;
        assert!(!axis.is_referenced());

        run_homing(&mut axis, &mut now);
        assert_eq!(axis.homing_phase(), HomingPhase::Complete);
        assert!(axis.is_referenced());
        assert_eq!(axis.position(), 1000);
        assert_eq!(rig.carriage.get(), 1000);
        assert!(!axis.is_moving());
    }

    #[test]
    fn test_homing_is_repeatable() {
        let rig = Rig::new(1500);
        let mut axis = axis(&rig);
        let mut now = 0;

        run_homing(&mut axis, &mut now);
        assert_eq!(axis.homing_phase(), HomingPhase::Complete);

        axis.home().unwrap();
        assert_eq!(axis.homing_phase(), HomingPhase::MovingToMin);
        assert!(!axis.is_referenced());

        run_homing(&mut axis, &mut now);
        assert_eq!(axis.homing_phase(), HomingPhase::Complete);
        assert_eq!(rig.carriage.get(), 1000);
    }

    #[test]
    fn test_homing_fails_without_switch() {
        let rig = Rig::new(700);
        rig.fitted.set(false);
        let mut axis = axis(&rig);
        let mut now = 0;

        run_homing(&mut axis, &mut now);
        assert_eq!(axis.homing_phase(), HomingPhase::Failed);
        assert!(!axis.is_referenced());
        assert_eq!(axis.engine().limits(), (0, 2000));
        assert_eq!(axis.move_to_home(50.0, 50.0), Err(AxisError::NotReferenced));
    }

    #[test]
    fn test_commands_refused_while_homing() {
        let rig = Rig::new(700);
        let mut axis = axis(&rig);
        axis.home().unwrap();

        assert_eq!(axis.move_at_speed(50.0, 50.0), Err(AxisError::HomingInProgress));
        assert_eq!(axis.move_relative(10, 50.0, 50.0), Err(AxisError::HomingInProgress));
        assert_eq!(axis.adjust_speed(10.0), Err(AxisError::HomingInProgress));
    }

    #[test]
    fn test_stop_aborts_homing() {
        let rig = Rig::new(700);
        let mut axis = axis(&rig);
        let mut now = 0;
        axis.home().unwrap();
        for _ in 0..50 {
            step(&mut axis, &mut now);
        }

        axis.stop(100.0);
        assert_eq!(axis.homing_phase(), HomingPhase::Idle);
        assert_eq!(axis.engine().limits(), (0, 2000));
        assert_eq!(run_to_rest(&mut axis, &mut now), AxisStatus::Stopped);
        assert!(!axis.is_referenced());
    }

    #[test]
    fn test_homing_from_forward_jog() {
        let rig = Rig::new(700);
        let mut axis = axis(&rig);
        let mut now = 0;

        axis.move_at_speed(100.0, 100.0).unwrap();
        for _ in 0..100 {
            step(&mut axis, &mut now);
        }
        assert!(axis.is_moving());
        assert!(rig.carriage.get() > 700);

        run_homing(&mut axis, &mut now);
        assert_eq!(axis.homing_phase(), HomingPhase::Complete);
        assert!(axis.is_referenced());
        assert_eq!(axis.position(), 1000);
        assert_eq!(rig.carriage.get(), 1000);
    }

    #[test]
    fn test_homing_while_stop_decelerates() {
        let rig = Rig::new(700);
        let mut axis = axis(&rig);
        let mut now = 0;

        axis.move_at_speed(100.0, 100.0).unwrap();
        for _ in 0..100 {
            step(&mut axis, &mut now);
        }
        axis.stop(5.0);
        step(&mut axis, &mut now);
        assert!(axis.is_moving());

        run_homing(&mut axis, &mut now);
        assert_eq!(axis.homing_phase(), HomingPhase::Complete);
        assert_eq!(rig.carriage.get(), 1000);
    }

    #[test]
    fn test_stop_on_way_home_keeps_reference() {
        let rig = Rig::new(300);
        let mut axis = axis(&rig);
        let mut now = 0;
        axis.home().unwrap();
        while axis.homing_phase() == HomingPhase::MovingToMin {
            step(&mut axis, &mut now);
        }
        assert_eq!(axis.homing_phase(), HomingPhase::MovingToHome);
        for _ in 0..50 {
            step(&mut axis, &mut now);
        }

        axis.stop(100.0);
        assert_eq!(axis.homing_phase(), HomingPhase::Idle);
        assert!(axis.is_referenced());
        assert_eq!(run_to_rest(&mut axis, &mut now), AxisStatus::Stopped);

        // Reference is still valid for positional moves
        assert_eq!(axis.position(), rig.carriage.get());
        axis.move_to_home(100.0, 100.0).unwrap();
        run_to_rest(&mut axis, &mut now);
        assert_eq!(rig.carriage.get(), 1000);
    }

    #[test]
    fn test_positional_moves_need_reference() {
        let rig = Rig::new(700);
        let mut axis = axis(&rig);
        assert_eq!(axis.move_to_absolute(100, 50.0, 50.0), Err(AxisError::NotReferenced));
        assert_eq!(axis.move_relative(100, 50.0, 50.0), Err(AxisError::NotReferenced));

        // Jogging works unreferenced
        let mut now = 0;
        axis.move_at_speed(50.0, 100.0).unwrap();
        assert_eq!(step(&mut axis, &mut now), AxisStatus::Moving);
    }

    #[test]
    fn test_misconfigured_axis_stays_stopped() {
        let rig = Rig::new(700);
        let (output, limit) = rig.parts();
        let mut config = test_config();
        config.min_position = 3000;
        let mut axis = AxisController::new(config, output, limit);

        let err = AxisError::Misconfigured(ConfigError::InvertedLimits);
        assert_eq!(axis.config_error(), Some(ConfigError::InvertedLimits));
        assert_eq!(axis.move_at_speed(100.0, 100.0), Err(err));
        assert_eq!(axis.home(), Err(err));
        assert_eq!(axis.tick(0), AxisStatus::Stopped);

        assert_eq!(axis.reconfigure(test_config()), Ok(()));
        assert_eq!(axis.config_error(), None);
        assert!(axis.home().is_ok());
    }

    #[test]
    fn test_jog_stops_at_safe_zone() {
        let rig = Rig::new(700);
        let mut axis = axis(&rig);
        let mut now = 0;
        run_homing(&mut axis, &mut now);

        axis.move_at_speed(100.0, 100.0).unwrap();
        assert_eq!(run_to_rest(&mut axis, &mut now), AxisStatus::Stopped);
        assert_eq!(axis.position(), 1980);

        // Already at the boundary: further jogging is a no-op
        axis.move_at_speed(100.0, 100.0).unwrap();
        assert_eq!(step(&mut axis, &mut now), AxisStatus::Stopped);
        assert_eq!(axis.position(), 1980);

        axis.move_at_speed(-100.0, 100.0).unwrap();
        assert_eq!(run_to_rest(&mut axis, &mut now), AxisStatus::Stopped);
        assert_eq!(axis.position(), 20);
    }

    #[test]
    fn test_zero_percent_jog_stops() {
        let rig = Rig::new(700);
        let mut axis = axis(&rig);
        let mut now = 0;
        axis.move_at_speed(100.0, 100.0).unwrap();
        for _ in 0..100 {
            step(&mut axis, &mut now);
        }

        axis.move_at_speed(0.0, 100.0).unwrap();
        assert_eq!(run_to_rest(&mut axis, &mut now), AxisStatus::Stopped);
        assert!(axis.position() < 1980);
    }

    #[test]
    fn test_move_to_absolute_is_clamped() {
        let rig = Rig::new(700);
        let mut axis = axis(&rig);
        let mut now = 0;
        run_homing(&mut axis, &mut now);

        axis.move_to_absolute(-5000, 100.0, 100.0).unwrap();
        assert!(axis.is_moving_to_position());
        assert!(!axis.is_moving_relative());
        assert_eq!(axis.engine().target(), Some(20));

        assert_eq!(run_to_rest(&mut axis, &mut now), AxisStatus::Stopped);
        assert_eq!(axis.position(), 20);
        assert_eq!(rig.carriage.get(), 20);
        assert!(!axis.is_moving_to_position());
    }

    #[test]
    fn test_move_relative() {
        let rig = Rig::new(700);
        let mut axis = axis(&rig);
        let mut now = 0;
        run_homing(&mut axis, &mut now);

        axis.move_relative(-250, 50.0, 100.0).unwrap();
        assert!(axis.is_moving_relative());
        assert!(axis.snapshot().relative);

        run_to_rest(&mut axis, &mut now);
        assert_eq!(axis.position(), 750);
        assert!(!axis.is_moving_relative());
    }

    #[test]
    fn test_adjust_speed_keeps_target() {
        let rig = Rig::new(700);
        let mut axis = axis(&rig);
        let mut now = 0;
        run_homing(&mut axis, &mut now);

        axis.move_to_absolute(1900, 100.0, 100.0).unwrap();
        for _ in 0..200 {
            step(&mut axis, &mut now);
        }
        let fast = axis.speed();

        axis.adjust_speed(10.0).unwrap();
        for _ in 0..300 {
            step(&mut axis, &mut now);
        }
        assert!(axis.speed() < fast);
        assert!((axis.speed() - 200.0).abs() < 1.0);

        run_to_rest(&mut axis, &mut now);
        assert_eq!(axis.position(), 1900);
    }

    #[test]
    fn test_end_limit_trip_and_bounce() {
        let rig = Rig::new(700);
        let mut axis = axis(&rig);
        let mut now = 0;
        run_homing(&mut axis, &mut now);

        // Lost steps: the carriage is 50 steps lower than the axis believes
        rig.carriage.set(rig.carriage.get() - 50);

        axis.move_at_speed(-100.0, 100.0).unwrap();
        assert_eq!(run_to_rest(&mut axis, &mut now), AxisStatus::AtEndLimit);
        assert!(axis.at_end_limit());
        assert_eq!(axis.position(), 20);
        assert_eq!(axis.engine().step_interval(), 0);
        assert_eq!(axis.speed(), 0.0);

        // Switch chatter while stopped does not re-trip
        for i in 0..10 {
            rig.fitted.set(i % 2 == 0);
            assert_eq!(step(&mut axis, &mut now), AxisStatus::Stopped);
        }
        rig.fitted.set(true);

        // Moving away is allowed and clears the flag
        axis.move_relative(100, 50.0, 100.0).unwrap();
        assert!(!axis.at_end_limit());
        assert_eq!(run_to_rest(&mut axis, &mut now), AxisStatus::Stopped);
        assert_eq!(axis.position(), 120);
    }

    #[test]
    fn test_set_max_speed_rescales_percent() {
        let rig = Rig::new(700);
        let mut axis = axis(&rig);
        assert!(axis.set_max_speed(1000.0).is_ok());
        assert_eq!(axis.config().speed_for(50.0), 500.0);
        assert_eq!(
            axis.set_max_speed(f32::NAN),
            Err(AxisError::Misconfigured(ConfigError::InvalidSpeed))
        );
    }
}
