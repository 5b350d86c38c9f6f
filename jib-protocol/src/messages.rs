//! Message types for the head command protocol
//!
//! Message types are divided into two categories:
//! - Panel → Head: motion commands, heartbeat requests
//! - Head → Panel: status reports, heartbeat responses
//!
//! The head has two axes on the wire: X (pan) and Y (tilt).

use crate::frame::{Frame, FrameError};
use crate::percent::Percent;

// Message type IDs: Panel → Head
pub const MSG_PING: u8 = 0x02;
pub const MSG_MOVE_AT_SPEED: u8 = 0x10;
pub const MSG_MOVE_RELATIVE: u8 = 0x11;
pub const MSG_MOVE_TO: u8 = 0x12;
pub const MSG_MOVE_TO_HOME: u8 = 0x13;
pub const MSG_ADJUST_SPEED: u8 = 0x14;
pub const MSG_STOP: u8 = 0x15;
pub const MSG_HOME: u8 = 0x16;

// Message type IDs: Head → Panel
pub const MSG_STATUS: u8 = 0x20;
pub const MSG_PONG: u8 = 0x24;

/// Commands parsed from panel-originated frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeadCommand {
    /// Jog both axes at a signed percentage of full speed
    MoveAtSpeed { x: Percent, y: Percent, accel: Percent },
    /// Move both axes by a step delta
    MoveRelative {
        dx: i32,
        dy: i32,
        speed: Percent,
        accel: Percent,
    },
    /// Move both axes to absolute step positions
    MoveTo {
        x: i32,
        y: i32,
        speed: Percent,
        accel: Percent,
    },
    /// Return both axes to their configured home positions
    MoveToHome { speed: Percent, accel: Percent },
    /// Change the cruise speed of an in-flight positional move
    AdjustSpeed { speed: Percent },
    /// Controlled stop of both axes
    Stop { decel: Percent },
    /// Run the homing sequence on every axis
    Home,
    /// Heartbeat request
    Ping,
}

impl HeadCommand {
    /// Parse a command from a frame
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        let mut r = Reader::new(&frame.payload);
        let cmd = match frame.kind {
            MSG_PING => HeadCommand::Ping,
            MSG_HOME => HeadCommand::Home,
            MSG_MOVE_AT_SPEED => HeadCommand::MoveAtSpeed {
                x: r.percent()?,
                y: r.percent()?,
                accel: r.percent()?,
            },
            MSG_MOVE_RELATIVE => HeadCommand::MoveRelative {
                dx: r.i32()?,
                dy: r.i32()?,
                speed: r.percent()?,
                accel: r.percent()?,
            },
            MSG_MOVE_TO => HeadCommand::MoveTo {
                x: r.i32()?,
                y: r.i32()?,
                speed: r.percent()?,
                accel: r.percent()?,
            },
            MSG_MOVE_TO_HOME => HeadCommand::MoveToHome {
                speed: r.percent()?,
                accel: r.percent()?,
            },
            MSG_ADJUST_SPEED => HeadCommand::AdjustSpeed {
                speed: r.percent()?,
            },
            MSG_STOP => HeadCommand::Stop {
                decel: r.percent()?,
            },
            other => return Err(FrameError::UnknownMessage(other)),
        };
        r.finish()?;
        Ok(cmd)
    }

    /// Encode this command into a frame (panel side, or for testing)
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        let mut w = Writer::new();
        let kind = match *self {
            HeadCommand::Ping => MSG_PING,
            HeadCommand::Home => MSG_HOME,
            HeadCommand::MoveAtSpeed { x, y, accel } => {
                w.percent(x).percent(y).percent(accel);
                MSG_MOVE_AT_SPEED
            }
            HeadCommand::MoveRelative {
                dx,
                dy,
                speed,
                accel,
            } => {
                w.i32(dx).i32(dy).percent(speed).percent(accel);
                MSG_MOVE_RELATIVE
            }
            HeadCommand::MoveTo { x, y, speed, accel } => {
                w.i32(x).i32(y).percent(speed).percent(accel);
                MSG_MOVE_TO
            }
            HeadCommand::MoveToHome { speed, accel } => {
                w.percent(speed).percent(accel);
                MSG_MOVE_TO_HOME
            }
            HeadCommand::AdjustSpeed { speed } => {
                w.percent(speed);
                MSG_ADJUST_SPEED
            }
            HeadCommand::Stop { decel } => {
                w.percent(decel);
                MSG_STOP
            }
        };
        Frame::new(kind, w.as_slice())
    }
}

/// Aggregate motion flags carried in a status report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusFlags(u8);

impl StatusFlags {
    pub const MOVING: u8 = 1 << 0;
    pub const RELATIVE: u8 = 1 << 1;
    pub const POSITIONAL: u8 = 1 << 2;
    pub const END_LIMIT: u8 = 1 << 3;

    pub fn new(moving: bool, relative: bool, positional: bool, end_limit: bool) -> Self {
        let mut bits = 0;
        if moving {
            bits |= Self::MOVING;
        }
        if relative {
            bits |= Self::RELATIVE;
        }
        if positional {
            bits |= Self::POSITIONAL;
        }
        if end_limit {
            bits |= Self::END_LIMIT;
        }
        Self(bits)
    }

    pub fn from_bits(bits: u8) -> Self {
        Self(bits & 0x0F)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_moving(self) -> bool {
        self.0 & Self::MOVING != 0
    }

    pub fn is_relative(self) -> bool {
        self.0 & Self::RELATIVE != 0
    }

    pub fn is_positional(self) -> bool {
        self.0 & Self::POSITIONAL != 0
    }

    pub fn at_end_limit(self) -> bool {
        self.0 & Self::END_LIMIT != 0
    }
}

/// Periodic head status snapshot
///
/// Homing phases are carried as raw codes; the motion core owns their meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusReport {
    pub x: i32,
    pub y: i32,
    pub flags: StatusFlags,
    pub phase_x: u8,
    pub phase_y: u8,
}

/// Messages from the head to the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeadMessage {
    Status(StatusReport),
    Pong,
}

impl HeadMessage {
    /// Encode this message into a frame
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        match self {
            HeadMessage::Pong => Ok(Frame::empty(MSG_PONG)),
            HeadMessage::Status(report) => {
                let mut w = Writer::new();
                w.i32(report.x)
                    .i32(report.y)
                    .u8(report.flags.bits())
                    .u8(report.phase_x)
                    .u8(report.phase_y);
                Frame::new(MSG_STATUS, w.as_slice())
            }
        }
    }

    /// Parse a head message from a frame (panel side)
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        let mut r = Reader::new(&frame.payload);
        let msg = match frame.kind {
            MSG_PONG => HeadMessage::Pong,
            MSG_STATUS => HeadMessage::Status(StatusReport {
                x: r.i32()?,
                y: r.i32()?,
                flags: StatusFlags::from_bits(r.u8()?),
                phase_x: r.u8()?,
                phase_y: r.u8()?,
            }),
            other => return Err(FrameError::UnknownMessage(other)),
        };
        r.finish()?;
        Ok(msg)
    }
}

/// Little-endian cursor over a payload; running past the end is `InvalidFrame`
struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], FrameError> {
        if self.bytes.len() < N {
            return Err(FrameError::InvalidFrame);
        }
        let (head, rest) = self.bytes.split_at(N);
        self.bytes = rest;
        let mut out = [0u8; N];
        out.copy_from_slice(head);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, FrameError> {
        Ok(self.take::<1>()?[0])
    }

    fn i32(&mut self) -> Result<i32, FrameError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    fn percent(&mut self) -> Result<Percent, FrameError> {
        Ok(Percent::from_le_bytes(self.take()?))
    }

    /// Trailing bytes mean the sender and receiver disagree on the layout
    fn finish(&self) -> Result<(), FrameError> {
        if self.bytes.is_empty() {
            Ok(())
        } else {
            Err(FrameError::InvalidFrame)
        }
    }
}

struct Writer {
    buf: [u8; 16],
    len: usize,
}

impl Writer {
    fn new() -> Self {
        Self {
            buf: [0; 16],
            len: 0,
        }
    }

    fn put(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        self
    }

    fn u8(&mut self, v: u8) -> &mut Self {
        self.put(&[v])
    }

    fn i32(&mut self, v: i32) -> &mut Self {
        self.put(&v.to_le_bytes())
    }

    fn percent(&mut self, v: Percent) -> &mut Self {
        self.put(&v.to_le_bytes())
    }

    fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_at_speed_layout() {
        let cmd = HeadCommand::MoveAtSpeed {
            x: Percent::from_hundredths(-5_000),
            y: Percent::FULL,
            accel: Percent::from_hundredths(2_500),
        };
        let frame = cmd.to_frame().unwrap();
        assert_eq!(frame.kind, MSG_MOVE_AT_SPEED);
        assert_eq!(
            &frame.payload[..],
            &[0x78, 0xEC, 0x10, 0x27, 0xC4, 0x09]
        );
        assert_eq!(HeadCommand::from_frame(&frame).unwrap(), cmd);
    }

    #[test]
    fn test_move_relative_layout() {
        let frame = Frame::new(
            MSG_MOVE_RELATIVE,
            &[
                0xE8, 0x03, 0x00, 0x00, // dx = 1000
                0x9C, 0xFF, 0xFF, 0xFF, // dy = -100
                0x88, 0x13, // speed = 50.00 %
                0x10, 0x27, // accel = 100.00 %
            ],
        )
        .unwrap();

        assert_eq!(
            HeadCommand::from_frame(&frame).unwrap(),
            HeadCommand::MoveRelative {
                dx: 1000,
                dy: -100,
                speed: Percent::from_hundredths(5_000),
                accel: Percent::FULL,
            }
        );
    }

    #[test]
    fn test_short_payload_rejected() {
        let frame = Frame::new(MSG_MOVE_TO, &[0x01, 0x02, 0x03]).unwrap();
        assert_eq!(HeadCommand::from_frame(&frame), Err(FrameError::InvalidFrame));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let frame = Frame::new(MSG_STOP, &[0x10, 0x27, 0x00]).unwrap();
        assert_eq!(HeadCommand::from_frame(&frame), Err(FrameError::InvalidFrame));
    }

    #[test]
    fn test_unknown_message() {
        let frame = Frame::empty(0x7F);
        assert_eq!(
            HeadCommand::from_frame(&frame),
            Err(FrameError::UnknownMessage(0x7F))
        );
    }

    #[test]
    fn test_out_of_range_percent_is_clamped() {
        // 0x7FFF hundredths is 327.67 %, saturates at full scale
        let frame = Frame::new(MSG_ADJUST_SPEED, &[0xFF, 0x7F]).unwrap();
        assert_eq!(
            HeadCommand::from_frame(&frame).unwrap(),
            HeadCommand::AdjustSpeed {
                speed: Percent::FULL
            }
        );
    }

    #[test]
    fn test_status_report() {
        let report = StatusReport {
            x: 13_000,
            y: -20,
            flags: StatusFlags::new(true, false, true, false),
            phase_x: 3,
            phase_y: 4,
        };
        let frame = HeadMessage::Status(report).to_frame().unwrap();
        assert_eq!(frame.kind, MSG_STATUS);
        assert_eq!(frame.payload.len(), 11);
        assert_eq!(frame.payload[8], StatusFlags::MOVING | StatusFlags::POSITIONAL);

        match HeadMessage::from_frame(&frame).unwrap() {
            HeadMessage::Status(parsed) => {
                assert_eq!(parsed, report);
                assert!(parsed.flags.is_moving());
                assert!(!parsed.flags.is_relative());
                assert!(parsed.flags.is_positional());
            }
            HeadMessage::Pong => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_ping_pong() {
        let ping = Frame::empty(MSG_PING);
        assert_eq!(HeadCommand::from_frame(&ping).unwrap(), HeadCommand::Ping);

        let pong = HeadMessage::Pong.to_frame().unwrap();
        assert_eq!(pong.kind, MSG_PONG);
        assert!(pong.payload.is_empty());
    }
}
