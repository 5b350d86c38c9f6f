//! Homing state machine
//!
//! Homing is driven by the axis tick loop; the phase only records where the
//! sequence is. Transitions are explicit and deterministic.

/// Homing phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingPhase {
    /// No homing run since power-on or the last abort
    #[default]
    Idle,
    /// Seeking the limit switch at reduced speed
    MovingToMin,
    /// Switch found, travelling to the configured home position
    MovingToHome,
    /// Position reference established and axis parked at home
    Complete,
    /// Travel ran out before the switch, or the axis stopped short of home
    Failed,
}

/// Events that advance the homing sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingEvent {
    /// `home()` was called
    Start,
    /// Limit switch read as triggered while seeking
    LimitTriggered,
    /// Engine stopped on its travel bound without seeing the switch
    TravelExhausted,
    /// Engine came to rest after the move to home
    Settled { at_home: bool },
    /// Stop requested mid-sequence
    Abort,
}

impl HomingPhase {
    /// Process an event and return the next phase
    pub fn transition(self, event: HomingEvent) -> Self {
        use HomingEvent::*;
        use HomingPhase::*;

        match (self, event) {
            // A fresh run always restarts from the seek phase
            (_, Start) => MovingToMin,

            (MovingToMin, LimitTriggered) => MovingToHome,
            (MovingToMin, TravelExhausted) => Failed,

            (MovingToHome, Settled { at_home: true }) => Complete,
            (MovingToHome, Settled { at_home: false }) => Failed,

            (MovingToMin | MovingToHome, Abort) => Idle,

            _ => self,
        }
    }

    /// Homing is running and owns the axis
    pub fn is_active(self) -> bool {
        matches!(self, HomingPhase::MovingToMin | HomingPhase::MovingToHome)
    }

    /// The last run has finished, successfully or not
    pub fn is_terminal(self) -> bool {
        matches!(self, HomingPhase::Complete | HomingPhase::Failed)
    }

    /// Status byte used on the wire
    pub fn code(self) -> u8 {
        match self {
            HomingPhase::Idle => 0,
            HomingPhase::MovingToMin => 1,
            HomingPhase::MovingToHome => 2,
            HomingPhase::Complete => 3,
            HomingPhase::Failed => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(HomingPhase::Idle),
            1 => Some(HomingPhase::MovingToMin),
            2 => Some(HomingPhase::MovingToHome),
            3 => Some(HomingPhase::Complete),
            4 => Some(HomingPhase::Failed),
            _ => None,
        }
    }
}
