//! Framing for the panel link.
//!
//! ```text
//! 0x80 | LEN | KIND | PAYLOAD (LEN bytes, <= 32) | CHK
//! ```
//!
//! `CHK` is the XOR of `LEN`, `KIND` and every payload byte. The sync byte
//! is not covered, so a receiver can lock on to any 0x80 and let the
//! checksum reject false starts.

use heapless::Vec;

/// Sync byte opening every frame
pub const FRAME_START: u8 = 0x80;

/// Largest payload a frame can carry
pub const MAX_PAYLOAD_SIZE: usize = 32;

/// Sync, length, kind and checksum around a full payload
pub const MAX_FRAME_SIZE: usize = MAX_PAYLOAD_SIZE + 4;

/// Payload storage shared by frames and the parser
pub type Payload = Vec<u8, MAX_PAYLOAD_SIZE>;

/// Link-level and decode failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Declared or supplied payload longer than `MAX_PAYLOAD_SIZE`
    PayloadTooLarge,
    InvalidChecksum,
    /// Payload does not have the layout its kind requires
    InvalidFrame,
    /// Kind byte not used by this protocol
    UnknownMessage(u8),
    /// Output buffer cannot hold the encoded frame
    BufferTooSmall,
}

/// One message on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: u8,
    pub payload: Payload,
}

impl Frame {
    pub fn new(kind: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let payload = Payload::from_slice(payload).map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self { kind, payload })
    }

    /// Frame without payload (pings, pongs, bare commands)
    pub fn empty(kind: u8) -> Self {
        Self {
            kind,
            payload: Payload::new(),
        }
    }

    fn checksum(len: u8, kind: u8, payload: &[u8]) -> u8 {
        payload.iter().fold(len ^ kind, |acc, b| acc ^ b)
    }

    /// Bytes `encode` will write
    pub fn encoded_len(&self) -> usize {
        self.payload.len() + 4
    }

    /// Write the frame into `out`, returning the byte count
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, FrameError> {
        let total = self.encoded_len();
        let Some(out) = out.get_mut(..total) else {
            return Err(FrameError::BufferTooSmall);
        };

        let len = self.payload.len() as u8;
        let (header, rest) = out.split_at_mut(3);
        header.copy_from_slice(&[FRAME_START, len, self.kind]);

        let (body, tail) = rest.split_at_mut(self.payload.len());
        body.copy_from_slice(&self.payload);
        tail[0] = Self::checksum(len, self.kind, &self.payload);

        Ok(total)
    }

    /// Encode into an owned buffer
    pub fn to_bytes(&self) -> Vec<u8, MAX_FRAME_SIZE> {
        let mut out = [0u8; MAX_FRAME_SIZE];
        // A frame always fits MAX_FRAME_SIZE
        let len = self.encode(&mut out).unwrap_or(0);
        let mut bytes = Vec::new();
        let _ = bytes.extend_from_slice(&out[..len]);
        bytes
    }
}

/// Where the parser is within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rx {
    /// Discarding bytes until a sync byte
    Hunt,
    Length,
    Kind { len: u8 },
    Body { len: u8, kind: u8 },
    Check { len: u8, kind: u8 },
}

/// Incremental frame decoder
///
/// Bytes are fed one at a time as they arrive. After any error the parser
/// drops the partial frame and hunts for the next sync byte.
#[derive(Debug, Clone)]
pub struct FrameParser {
    rx: Rx,
    body: Payload,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            rx: Rx::Hunt,
            body: Payload::new(),
        }
    }

    /// Drop any partial frame
    pub fn reset(&mut self) {
        self.rx = Rx::Hunt;
        self.body.clear();
    }

    /// True while a frame has been started but not finished
    pub fn in_frame(&self) -> bool {
        self.rx != Rx::Hunt
    }

    /// Consume one byte; yields a frame once its checksum byte checks out
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        let rx = self.rx;
        self.rx = match rx {
            Rx::Hunt if byte == FRAME_START => Rx::Length,
            Rx::Hunt => Rx::Hunt,
            Rx::Length if usize::from(byte) > MAX_PAYLOAD_SIZE => {
                self.reset();
                return Err(FrameError::PayloadTooLarge);
            }
            Rx::Length => Rx::Kind { len: byte },
            Rx::Kind { len } => {
                self.body.clear();
                if len == 0 {
                    Rx::Check { len, kind: byte }
                } else {
                    Rx::Body { len, kind: byte }
                }
            }
            Rx::Body { len, kind } => {
                // Length was bounded when it arrived
                let _ = self.body.push(byte);
                if self.body.len() == usize::from(len) {
                    Rx::Check { len, kind }
                } else {
                    Rx::Body { len, kind }
                }
            }
            Rx::Check { len, kind } => {
                let valid = byte == Frame::checksum(len, kind, &self.body);
                let payload = core::mem::take(&mut self.body);
                self.reset();
                return if valid {
                    Ok(Some(Frame { kind, payload }))
                } else {
                    Err(FrameError::InvalidChecksum)
                };
            }
        };
        Ok(None)
    }

    /// Feed bytes until the first complete frame
    ///
    /// Returns the bytes consumed along with the frame, so the caller can
    /// resume from `&bytes[consumed..]`.
    pub fn feed_slice(&mut self, bytes: &[u8]) -> (usize, Result<Option<Frame>, FrameError>) {
        for (i, &byte) in bytes.iter().enumerate() {
            match self.feed(byte) {
                Ok(None) => {}
                done => return (i + 1, done),
            }
        }
        (bytes.len(), Ok(None))
    }
}
