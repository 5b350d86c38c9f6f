//! Motion coordinator
//!
//! Operates a fixed set of axes as one head. Commands fan out to every
//! axis; arrival times are not synchronised.

use jib_protocol::HeadCommand;

use crate::axis::{AxisController, AxisError, AxisStatus, HomingPhase};
use crate::traits::{LimitInput, StepOutput};

use super::status::{AxisMask, HeadStatus, HomingOutcome};

/// An axis refused a fanned-out command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeadError {
    /// Index of the first axis that refused
    pub axis: usize,
    pub kind: AxisError,
}

/// Coordinator over `N` axes
pub struct MotionCoordinator<S, L, const N: usize> {
    axes: [AxisController<S, L>; N],
}

impl<S: StepOutput, L: LimitInput, const N: usize> MotionCoordinator<S, L, N> {
    const FITS_MASK: () = assert!(N <= AxisMask::CAPACITY, "too many axes for AxisMask");

    pub fn new(axes: [AxisController<S, L>; N]) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::FITS_MASK;
        Self { axes }
    }

    /// Advance every axis once; call every loop iteration
    ///
    /// Returns true while any axis is moving.
    pub fn tick(&mut self, now_us: u32) -> bool {
        self.tick_axes(now_us)
            .iter()
            .any(|s| *s == AxisStatus::Moving)
    }

    /// Advance every axis once and return each status
    pub fn tick_axes(&mut self, now_us: u32) -> [AxisStatus; N] {
        let mut statuses = [AxisStatus::Stopped; N];
        for (status, axis) in statuses.iter_mut().zip(self.axes.iter_mut()) {
            *status = axis.tick(now_us);
        }
        statuses
    }

    /// Apply `f` to every axis, reporting the first refusal
    ///
    /// Later axes still receive the command when an earlier one refuses.
    fn fan_out<F>(&mut self, mut f: F) -> Result<(), HeadError>
    where
        F: FnMut(usize, &mut AxisController<S, L>) -> Result<(), AxisError>,
    {
        let mut first = None;
        for (i, axis) in self.axes.iter_mut().enumerate() {
            match f(i, axis) {
                Err(kind) if first.is_none() => first = Some(HeadError { axis: i, kind }),
                _ => {}
            }
        }
        first.map_or(Ok(()), Err)
    }

    // ---- commands ----

    /// Start homing on every axis; progress with `tick`, poll `homing_outcome`
    pub fn home_all(&mut self) -> Result<(), HeadError> {
        self.fan_out(|_, axis| axis.home())
    }

    pub fn move_at_speed(&mut self, speed_percent: [f32; N], accel_percent: f32) -> Result<(), HeadError> {
        self.fan_out(|i, axis| axis.move_at_speed(speed_percent[i], accel_percent))
    }

    pub fn move_relative(
        &mut self,
        delta: [i32; N],
        speed_percent: f32,
        accel_percent: f32,
    ) -> Result<(), HeadError> {
        self.fan_out(|i, axis| axis.move_relative(delta[i], speed_percent, accel_percent))
    }

    pub fn move_to(
        &mut self,
        position: [i32; N],
        speed_percent: f32,
        accel_percent: f32,
    ) -> Result<(), HeadError> {
        self.fan_out(|i, axis| axis.move_to_absolute(position[i], speed_percent, accel_percent))
    }

    pub fn move_to_home_all(&mut self, speed_percent: f32, accel_percent: f32) -> Result<(), HeadError> {
        self.fan_out(|_, axis| axis.move_to_home(speed_percent, accel_percent))
    }

    pub fn adjust_speed_all(&mut self, speed_percent: f32) -> Result<(), HeadError> {
        self.fan_out(|_, axis| axis.adjust_speed(speed_percent))
    }

    pub fn stop_all(&mut self, decel_percent: f32) {
        for axis in self.axes.iter_mut() {
            axis.stop(decel_percent);
        }
    }

    // ---- state ----

    /// Combined homing result
    ///
    /// `Failed` is only reported once no axis is still homing, so the
    /// healthy axes finish their own sequence first. Axes that were never
    /// homed, or whose run was stopped, make the head `NotHomed`.
    pub fn homing_outcome(&self) -> HomingOutcome {
        if self.axes.iter().any(|a| a.homing_phase().is_active()) {
            return HomingOutcome::InProgress;
        }

        let failed = self.mask_where(HomingPhase::Failed);
        if !failed.is_empty() {
            return HomingOutcome::Failed(failed);
        }

        let idle = self.mask_where(HomingPhase::Idle);
        if idle.is_empty() {
            HomingOutcome::Complete
        } else {
            HomingOutcome::NotHomed(idle)
        }
    }

    fn mask_where(&self, phase: HomingPhase) -> AxisMask {
        self.axes
            .iter()
            .enumerate()
            .filter(|(_, a)| a.homing_phase() == phase)
            .fold(AxisMask::EMPTY, |mask, (i, _)| mask.with(i))
    }

    pub fn status(&self) -> HeadStatus<N> {
        HeadStatus {
            axes: core::array::from_fn(|i| self.axes[i].snapshot()),
        }
    }

    pub fn any_moving(&self) -> bool {
        self.axes.iter().any(|a| a.is_moving())
    }

    pub fn axis(&self, index: usize) -> Option<&AxisController<S, L>> {
        self.axes.get(index)
    }

    pub fn axis_mut(&mut self, index: usize) -> Option<&mut AxisController<S, L>> {
        self.axes.get_mut(index)
    }

    pub fn axes(&self) -> &[AxisController<S, L>; N] {
        &self.axes
    }
}

/// Pan/tilt helpers
impl<S: StepOutput, L: LimitInput> MotionCoordinator<S, L, 2> {
    pub fn move_xy(&mut self, speed_x: f32, speed_y: f32, accel_percent: f32) -> Result<(), HeadError> {
        self.move_at_speed([speed_x, speed_y], accel_percent)
    }

    pub fn move_relative_xy(
        &mut self,
        dx: i32,
        dy: i32,
        speed_percent: f32,
        accel_percent: f32,
    ) -> Result<(), HeadError> {
        self.move_relative([dx, dy], speed_percent, accel_percent)
    }

    pub fn move_to_xy(&mut self, x: i32, y: i32, speed_percent: f32, accel_percent: f32) -> Result<(), HeadError> {
        self.move_to([x, y], speed_percent, accel_percent)
    }

    /// Apply a decoded wire command; call between ticks
    pub fn apply(&mut self, command: &HeadCommand) -> Result<(), HeadError> {
        match *command {
            HeadCommand::MoveAtSpeed { x, y, accel } => {
                self.move_xy(x.as_percent(), y.as_percent(), accel.as_percent())
            }
            HeadCommand::MoveRelative {
                dx,
                dy,
                speed,
                accel,
            } => self.move_relative_xy(dx, dy, speed.as_percent(), accel.as_percent()),
            HeadCommand::MoveTo { x, y, speed, accel } => {
                self.move_to_xy(x, y, speed.as_percent(), accel.as_percent())
            }
            HeadCommand::MoveToHome { speed, accel } => {
                self.move_to_home_all(speed.as_percent(), accel.as_percent())
            }
            HeadCommand::AdjustSpeed { speed } => self.adjust_speed_all(speed.as_percent()),
            HeadCommand::Stop { decel } => {
                self.stop_all(decel.as_percent());
                Ok(())
            }
            HeadCommand::Home => self.home_all(),
            // Answered by the transport layer
            HeadCommand::Ping => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::controller::tests::{test_config, Rig, TestAxis};
    use crate::config::AxisConfig;
    use jib_protocol::Percent;

    type TestHead = MotionCoordinator<
        crate::axis::controller::tests::SimOutput,
        crate::axis::controller::tests::MockLimit,
        2,
    >;

    fn build_axis(rig: &Rig, config: AxisConfig) -> TestAxis {
        let (output, limit) = rig.parts();
        AxisController::new(config, output, limit)
    }

    fn head(pan: &Rig, tilt: &Rig) -> TestHead {
        let mut tilt_config = AxisConfig::new("tilt", -500, 1500);
        tilt_config.max_speed = 1500.0;
        tilt_config.default_acceleration = 6000.0;
        MotionCoordinator::new([build_axis(pan, test_config()), build_axis(tilt, tilt_config)])
    }

    /// Tick until nothing moves, advancing time by the shortest interval
    fn run(head: &mut TestHead, now: &mut u32) {
        for _ in 0..500_000 {
            let moving = head.tick(*now);
            let homing = head.homing_outcome() == HomingOutcome::InProgress;
            if !moving && !homing {
                return;
            }
            *now = now.wrapping_add(50);
        }
        panic!("head did not settle");
    }

    #[test]
    fn test_home_all_completes() {
        let pan = Rig::new(300);
        let tilt = Rig::new(1200);
        let mut head = head(&pan, &tilt);
        let mut now = 0;

        head.home_all().unwrap();
        assert_eq!(head.homing_outcome(), HomingOutcome::InProgress);
        run(&mut head, &mut now);

        assert_eq!(head.homing_outcome(), HomingOutcome::Complete);
        assert_eq!(head.axis(0).unwrap().position(), 1000);
        assert_eq!(head.axis(1).unwrap().position(), 500);
        assert_eq!(pan.carriage.get(), 1000);
        // Switch sits at -500 in tilt coordinates
        assert_eq!(tilt.carriage.get(), 1000);
    }

    #[test]
    fn test_home_all_reports_failed_axis() {
        let pan = Rig::new(300);
        let tilt = Rig::new(1200);
        pan.fitted.set(false);
        let mut head = head(&pan, &tilt);
        let mut now = 0;

        head.home_all().unwrap();
        run(&mut head, &mut now);

        let status = head.status();
        assert_eq!(status.homing(0), Some(HomingPhase::Failed));
        assert_eq!(status.homing(1), Some(HomingPhase::Complete));
        match head.homing_outcome() {
            HomingOutcome::Failed(mask) => {
                assert_eq!(mask.first(), Some(0));
                assert!(!mask.contains(1));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_outcome_before_homing() {
        let pan = Rig::new(300);
        let tilt = Rig::new(1200);
        let head = head(&pan, &tilt);

        match head.homing_outcome() {
            HomingOutcome::NotHomed(mask) => {
                assert!(mask.contains(0));
                assert!(mask.contains(1));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_stopped_homing_is_not_a_failure() {
        let pan = Rig::new(300);
        let tilt = Rig::new(1200);
        let mut head = head(&pan, &tilt);
        let mut now = 0;

        head.home_all().unwrap();
        for _ in 0..20 {
            head.tick(now);
            now = now.wrapping_add(50);
        }
        head.axis_mut(1).unwrap().stop(100.0);
        run(&mut head, &mut now);

        assert_eq!(head.status().homing(0), Some(HomingPhase::Complete));
        assert_eq!(head.status().homing(1), Some(HomingPhase::Idle));
        assert_eq!(
            head.homing_outcome(),
            HomingOutcome::NotHomed(AxisMask::EMPTY.with(1))
        );
    }

    #[test]
    fn test_fan_out_reports_first_refusal() {
        let pan = Rig::new(300);
        let tilt = Rig::new(1200);
        let mut head = head(&pan, &tilt);
        let mut now = 0;

        head.axis_mut(1).unwrap().home().unwrap();
        run(&mut head, &mut now);

        // Pan is unreferenced; tilt still takes the command
        assert_eq!(
            head.move_relative_xy(100, 100, 50.0, 100.0),
            Err(HeadError {
                axis: 0,
                kind: AxisError::NotReferenced
            })
        );
        assert!(head.axis(1).unwrap().is_moving_relative());
        run(&mut head, &mut now);
        assert_eq!(head.axis(1).unwrap().position(), 600);
    }

    #[test]
    fn test_apply_commands() {
        let pan = Rig::new(300);
        let tilt = Rig::new(1200);
        let mut head = head(&pan, &tilt);
        let mut now = 0;

        head.apply(&HeadCommand::Home).unwrap();
        run(&mut head, &mut now);
        assert_eq!(head.homing_outcome(), HomingOutcome::Complete);

        head.apply(&HeadCommand::MoveTo {
            x: 1500,
            y: 9000,
            speed: Percent::FULL,
            accel: Percent::FULL,
        })
        .unwrap();
        let status = head.status();
        assert!(status.any_positional());
        assert!(status.flags().is_moving());
        run(&mut head, &mut now);
        assert_eq!(head.axis(0).unwrap().position(), 1500);
        assert_eq!(head.axis(1).unwrap().position(), 1480);

        head.apply(&HeadCommand::MoveAtSpeed {
            x: Percent::from_percent(-50.0),
            y: Percent::ZERO,
            accel: Percent::FULL,
        })
        .unwrap();
        for _ in 0..2000 {
            head.tick(now);
            now = now.wrapping_add(50);
        }
        assert!(head.axis(0).unwrap().position() < 1500);

        head.apply(&HeadCommand::Stop {
            decel: Percent::FULL,
        })
        .unwrap();
        run(&mut head, &mut now);
        assert!(!head.any_moving());

        head.apply(&HeadCommand::MoveToHome {
            speed: Percent::FULL,
            accel: Percent::FULL,
        })
        .unwrap();
        run(&mut head, &mut now);
        let report = head.status().to_report();
        assert_eq!((report.x, report.y), (1000, 500));
        assert!(!report.flags.is_moving());
    }

    #[test]
    fn test_ping_is_noop() {
        let pan = Rig::new(300);
        let tilt = Rig::new(1200);
        let mut head = head(&pan, &tilt);
        assert_eq!(head.apply(&HeadCommand::Ping), Ok(()));
        assert!(!head.tick(0));
    }
}
