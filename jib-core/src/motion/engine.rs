//! Step timing engine
//!
//! Converts a target speed and acceleration into a train of step pulses using
//! the discrete constant-acceleration recurrence
//!
//! ```text
//! c0  = 0.676 · sqrt(2 / a) · 1e6            (µs, first step)
//! c_n = c_(n-1) - 2·c_(n-1) / (4n + 1)
//! ```
//!
//! `n` is the ramp index: steps since the start of the current ramp, negative
//! while decelerating and [`SETTLED`] once the target interval is reached.
//! Each [`StepTimingEngine::tick`] is O(1), never waits, and emits at most one
//! pulse.

use libm::{fabsf, sqrtf};

use crate::config::{MAX_POSITION, MIN_RESOLVABLE_SPEED};
use crate::traits::{Direction, StepOutput};

/// Ramp index once the target speed has been reached
pub const SETTLED: i32 = 1_000_000_000;

/// Lowest acceleration accepted by `set_acceleration` (steps/s²)
pub const MIN_ACCELERATION: f32 = 1.0e-4;

/// Interval used as the target when stopping ("infinitely slow")
const STOPPED_INTERVAL: f32 = 1.0e9;

const MICROS_PER_SECOND: f32 = 1.0e6;

/// Where the engine is on its speed profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RampState {
    /// No step is scheduled
    Stopped,
    /// Speed is increasing toward the target
    Accelerating,
    /// Holding the target speed
    Cruising,
    /// Speed is decreasing (slower target, stop, reversal or boundary)
    Decelerating,
}

/// Per-axis step timing engine
///
/// Owns the step/dir output for one axis and the absolute step position.
/// The caller supplies the current time in microseconds to [`tick`]; the
/// engine only compares differences so the counter may wrap.
///
/// [`tick`]: StepTimingEngine::tick
pub struct StepTimingEngine<S> {
    output: S,
    direction_inverted: bool,

    position: i32,
    min_position: i32,
    max_position: i32,
    /// One-shot absolute target; bounds `distance_to_go` when ahead
    target: Option<i32>,

    direction: Direction,
    target_direction: Direction,

    max_speed: f32,
    min_speed: f32,
    acceleration: f32,
    /// Signed current speed in steps/s
    speed: f32,
    /// Signed requested speed in steps/s (0 when stopping)
    target_speed: f32,

    c0: f32,
    cn: f32,
    final_cn: f32,
    n: i32,
    /// Microseconds until the next pulse; 0 means stopped
    step_interval: u32,
    last_step_us: Option<u32>,
    /// A ramp must start on the next tick (fresh start or after a reversal)
    restart_pending: bool,
}

impl<S: StepOutput> StepTimingEngine<S> {
    /// Create a stopped engine at position 0 with unbounded travel
    pub fn new(output: S, max_speed: f32, acceleration: f32) -> Self {
        let mut engine = Self {
            output,
            direction_inverted: false,
            position: 0,
            min_position: -MAX_POSITION,
            max_position: MAX_POSITION,
            target: None,
            direction: Direction::Forward,
            target_direction: Direction::Forward,
            max_speed: MIN_RESOLVABLE_SPEED,
            min_speed: MIN_RESOLVABLE_SPEED,
            acceleration: 0.0,
            speed: 0.0,
            target_speed: 0.0,
            c0: 0.0,
            cn: 0.0,
            final_cn: STOPPED_INTERVAL,
            n: 0,
            step_interval: 0,
            last_step_us: None,
            restart_pending: false,
        };
        engine.set_max_speed(max_speed);
        engine.set_acceleration(acceleration);
        engine.cn = engine.c0;
        engine.write_direction();
        engine
    }

    // ---- configuration ----

    /// Invert the direction line; forces a rewrite of the pin
    pub fn set_direction_inverted(&mut self, inverted: bool) {
        self.direction_inverted = inverted;
        self.write_direction();
    }

    /// Set the travel bounds; the position is pulled inside them
    pub fn set_limits(&mut self, min_position: i32, max_position: i32) {
        let (min, max) = if min_position <= max_position {
            (min_position, max_position)
        } else {
            (max_position, min_position)
        };
        self.min_position = min.max(-MAX_POSITION);
        self.max_position = max.min(MAX_POSITION);
        self.position = self.position.clamp(self.min_position, self.max_position);
    }

    /// Travel bounds as `(min, max)`
    pub fn limits(&self) -> (i32, i32) {
        (self.min_position, self.max_position)
    }

    /// Cap on `|target_speed|`; an active target above it is reduced
    pub fn set_max_speed(&mut self, max_speed: f32) {
        let max_speed = if max_speed.is_nan() {
            self.min_speed
        } else {
            fabsf(max_speed).max(self.min_speed)
        };
        self.max_speed = max_speed;
        if fabsf(self.target_speed) > max_speed {
            self.set_target_speed(self.target_speed);
        }
    }

    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    /// Speeds below this are treated as a stop request
    pub fn set_min_speed(&mut self, min_speed: f32) {
        let min_speed = if min_speed.is_nan() {
            MIN_RESOLVABLE_SPEED
        } else {
            fabsf(min_speed).max(MIN_RESOLVABLE_SPEED)
        };
        self.min_speed = min_speed;
        if self.max_speed < min_speed {
            self.max_speed = min_speed;
        }
    }

    /// Set the ramp steepness in steps/s²
    ///
    /// Recomputes `c0` and re-derives the ramp index from the current speed,
    /// so a change mid-ramp continues from the same speed.
    pub fn set_acceleration(&mut self, acceleration: f32) {
        let acceleration = if acceleration.is_nan() {
            MIN_ACCELERATION
        } else {
            fabsf(acceleration).max(MIN_ACCELERATION)
        };
        if acceleration == self.acceleration {
            return;
        }
        self.c0 = 0.676 * sqrtf(2.0 / acceleration) * MICROS_PER_SECOND;
        self.acceleration = acceleration;
        self.plan_ramp();
    }

    pub fn acceleration(&self) -> f32 {
        self.acceleration
    }

    /// First-step interval for the current acceleration (µs)
    pub fn first_interval(&self) -> f32 {
        self.c0
    }

    // ---- commands ----

    /// Request a signed steady-state speed in steps/s
    ///
    /// `|speed|` is capped at the max speed; below the min speed it is a
    /// controlled stop. A request in the opposite direction of travel first
    /// decelerates to rest.
    pub fn set_target_speed(&mut self, speed: f32) {
        let speed = if speed.is_nan() { 0.0 } else { speed };
        let magnitude = fabsf(speed).min(self.max_speed);
        let requested = if magnitude < self.min_speed {
            0.0
        } else {
            magnitude * Direction::of(speed).sign() as f32
        };
        if requested == self.target_speed && (self.is_running() || requested == 0.0) {
            return;
        }

        self.target_speed = requested;
        if requested == 0.0 {
            self.final_cn = STOPPED_INTERVAL;
            self.target_direction = self.direction;
        } else {
            self.final_cn = MICROS_PER_SECOND / magnitude;
            self.target_direction = Direction::of(requested);
        }

        self.plan_ramp();
        if self.step_interval == 0 {
            self.restart_pending = requested != 0.0;
        }
    }

    /// Controlled deceleration to rest
    pub fn stop(&mut self) {
        self.set_target_speed(0.0);
    }

    /// Travel to `position` (clamped into the limits) at `speed` steps/s
    ///
    /// The ramp ends exactly on the target. Passing the current position
    /// requests a stop.
    pub fn move_to(&mut self, position: i32, speed: f32) {
        let position = position.clamp(self.min_position, self.max_position);
        if position == self.position {
            self.target = None;
            self.stop();
            return;
        }

        let direction = if position > self.position {
            Direction::Forward
        } else {
            Direction::Reverse
        };
        self.target = Some(position);
        self.set_target_speed(fabsf(speed) * direction.sign() as f32);
        if self.target_speed == 0.0 {
            self.target = None;
        }
    }

    /// Drop any absolute target, keeping the current speed request
    pub fn clear_target(&mut self) {
        self.target = None;
    }

    /// Zero speed and interval immediately, without a ramp
    pub fn hard_stop(&mut self) {
        self.step_interval = 0;
        self.speed = 0.0;
        self.target_speed = 0.0;
        self.final_cn = STOPPED_INTERVAL;
        self.target_direction = self.direction;
        self.n = 0;
        self.cn = self.c0;
        self.target = None;
        self.restart_pending = false;
    }

    /// Re-reference the position, clamped into the limits
    pub fn set_position(&mut self, position: i32) {
        self.position = position.clamp(self.min_position, self.max_position);
    }

    // ---- pulse primitives ----

    /// Take one step forward immediately
    ///
    /// Raw primitive used by `tick`; calling it while a ramp is running
    /// disturbs the ramp's timing.
    pub fn step_forward(&mut self) {
        self.set_direction(Direction::Forward);
        self.output.pulse();
        if self.position < MAX_POSITION {
            self.position += 1;
        }
    }

    /// Take one step in reverse immediately
    pub fn step_reverse(&mut self) {
        self.set_direction(Direction::Reverse);
        self.output.pulse();
        if self.position > -MAX_POSITION {
            self.position -= 1;
        }
    }

    // ---- polling ----

    /// Advance the engine; call every loop iteration
    ///
    /// Emits one pulse if the current interval has elapsed since the last
    /// one, then computes the next interval. Returns whether the engine will
    /// pulse again.
    pub fn tick(&mut self, now_us: u32) -> bool {
        if self.step_interval == 0 {
            if !self.restart_pending {
                // At rest the last pulse time goes stale once the clock wraps
                self.last_step_us = None;
                return false;
            }
            self.restart_pending = false;
            self.compute_new_speed();
            if self.step_interval == 0 {
                return self.restart_pending;
            }
        }

        let due = match self.last_step_us {
            None => true,
            Some(last) => now_us.wrapping_sub(last) >= self.step_interval,
        };
        if due {
            match self.direction {
                Direction::Forward => self.step_forward(),
                Direction::Reverse => self.step_reverse(),
            }
            self.last_step_us = Some(now_us);
            self.compute_new_speed();
        }

        self.is_running()
    }

    /// Steps to the active boundary in the direction of travel
    ///
    /// The boundary is the travel limit, or the absolute target when one is
    /// set and lies ahead. Uses the pending direction while stopped.
    pub fn distance_to_go(&self) -> u32 {
        let direction = self.heading();

        let to_limit = match direction {
            Direction::Forward => self.max_position - self.position,
            Direction::Reverse => self.position - self.min_position,
        }
        .max(0);

        let to_target = self.target.and_then(|target| {
            let delta = (target - self.position) * direction.sign();
            (delta >= 0).then_some(delta)
        });

        match to_target {
            Some(d) => d.min(to_limit) as u32,
            None => to_limit as u32,
        }
    }

    // ---- state ----

    pub fn position(&self) -> i32 {
        self.position
    }

    /// Signed current speed in steps/s
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Signed requested speed in steps/s
    pub fn target_speed(&self) -> f32 {
        self.target_speed
    }

    pub fn target(&self) -> Option<i32> {
        self.target
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn target_direction(&self) -> Direction {
        self.target_direction
    }

    /// Direction of the next pulse: current direction while stepping,
    /// requested direction while at rest
    pub fn heading(&self) -> Direction {
        if self.step_interval != 0 {
            self.direction
        } else {
            self.target_direction
        }
    }

    /// Microseconds until the next pulse; 0 when stopped
    pub fn step_interval(&self) -> u32 {
        self.step_interval
    }

    pub fn ramp_index(&self) -> i32 {
        self.n
    }

    /// True while a pulse is scheduled or a ramp is about to start
    pub fn is_running(&self) -> bool {
        self.step_interval != 0 || self.restart_pending
    }

    pub fn ramp_state(&self) -> RampState {
        if self.step_interval == 0 {
            RampState::Stopped
        } else if self.n == SETTLED {
            RampState::Cruising
        } else if self.n < 0 {
            RampState::Decelerating
        } else {
            RampState::Accelerating
        }
    }

    pub fn output(&self) -> &S {
        &self.output
    }

    // ---- internals ----

    fn steps_to_stop(&self) -> i32 {
        (self.speed * self.speed / (2.0 * self.acceleration)) as i32
    }

    /// Derive `n` for a new target from the current speed
    fn plan_ramp(&mut self) {
        if self.step_interval == 0 {
            self.n = 0;
            return;
        }
        if self.direction == self.target_direction && self.cn == self.final_cn {
            self.n = SETTLED;
            return;
        }

        let steps = self.steps_to_stop();
        let speeding_up = self.direction == self.target_direction
            && fabsf(self.target_speed) > fabsf(self.speed);
        self.n = if speeding_up { steps } else { -steps };
    }

    fn compute_new_speed(&mut self) {
        let distance = self.distance_to_go();
        if distance == 0 {
            self.hard_stop();
            return;
        }

        // Both fit in i32: positions are bounded by ±MAX_POSITION
        let distance = distance as i32;
        let approaching = self.steps_to_stop() >= distance;
        if approaching {
            self.n = -distance;
        }

        if self.n == 0 {
            if self.target_speed == 0.0 {
                self.hard_stop();
                return;
            }
            if self.step_interval != 0 && self.direction != self.target_direction {
                // Bottom of the ramp while reversing: rest for one tick
                self.halt_for_reversal();
                return;
            }

            self.cn = self.c0;
            self.set_direction(self.target_direction);
            if self.cn > self.final_cn {
                self.n = 1;
            } else {
                self.cn = self.final_cn;
                self.n = SETTLED;
            }
            self.update_interval();
            return;
        }

        if self.n == SETTLED {
            return;
        }

        let delta = -2.0 * self.cn / (4.0 * self.n as f32 + 1.0);
        let to_final = self.final_cn - self.cn;
        if !approaching
            && self.direction == self.target_direction
            && fabsf(to_final) < fabsf(delta)
        {
            self.cn = self.final_cn;
            self.n = SETTLED;
        } else {
            self.cn += delta;
            self.n = self.n.saturating_add(1).min(SETTLED - 1);
        }
        self.update_interval();
    }

    fn halt_for_reversal(&mut self) {
        self.step_interval = 0;
        self.speed = 0.0;
        self.cn = self.c0;
        self.restart_pending = true;
    }

    fn update_interval(&mut self) {
        self.step_interval = (self.cn as u32).max(1);
        self.speed = (MICROS_PER_SECOND / self.cn) * self.direction.sign() as f32;
    }

    fn set_direction(&mut self, direction: Direction) {
        if direction != self.direction {
            self.direction = direction;
            self.write_direction();
        }
    }

    fn write_direction(&mut self) {
        let forward = self.direction == Direction::Forward;
        self.output
            .set_direction_level(forward != self.direction_inverted);
    }
}
