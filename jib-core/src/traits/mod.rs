//! Hardware abstraction traits
//!
//! These traits define the interface between the motion core and the
//! board-specific pin drivers.

pub mod limit;
pub mod stepper;

pub use limit::LimitInput;
pub use stepper::{Direction, StepOutput};
