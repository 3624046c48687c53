//! Motor bus message codec
//!
//! # Payloads
//!
//! Every message carries a content type `application/<tag>` and a body of
//! big-endian u32 words:
//!
//! | Tag | Body |
//! |-----|------|
//! | `dcmotor_forward` | motor id |
//! | `dcmotor_backward` | motor id |
//! | `dcmotor_stop` | motor id |
//! | `dcmotor_speed` | motor id, speed |
//! | `dcmotor_forward_for_ticks` | motor id, ticks |
//! | `dcmotor_backward_for_ticks` | motor id, ticks |
//! | `dcmotor_ticks_per_rotation` | ticks (inbound) |
//! | `dcmotor_autostop` | motor id (inbound) |
//!
//! # Framing
//!
//! ```text
//! ┌──────────────────┬──────────────┬──────────────┬──────────┐
//! │ Length (4 bytes) │ Type length  │ Content type │ Body     │
//! │ Big-endian u32   │ u8           │ UTF-8        │ variable │
//! └──────────────────┴──────────────┴──────────────┴──────────┘
//! ```
//!
//! The length counts everything after itself. Frames above
//! [`MAX_FRAME_LEN`] are rejected.

use crate::core::types::{CommandKind, FeedbackEvent, MotorCommand, MotorId};
use crate::error::{Error, Result};
use std::io::{ErrorKind, Read, Write};

pub const CONTENT_TYPE_PREFIX: &str = "application/";

pub const TAG_FORWARD: &str = "dcmotor_forward";
pub const TAG_BACKWARD: &str = "dcmotor_backward";
pub const TAG_STOP: &str = "dcmotor_stop";
pub const TAG_SPEED: &str = "dcmotor_speed";
pub const TAG_FORWARD_FOR_TICKS: &str = "dcmotor_forward_for_ticks";
pub const TAG_BACKWARD_FOR_TICKS: &str = "dcmotor_backward_for_ticks";
pub const TAG_TICKS_PER_ROTATION: &str = "dcmotor_ticks_per_rotation";
pub const TAG_AUTOSTOP: &str = "dcmotor_autostop";

/// Largest accepted frame, length prefix excluded
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// One published message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub content_type: String,
    pub body: Vec<u8>,
}

impl BusMessage {
    pub fn new(tag: &str, words: &[u32]) -> Self {
        Self {
            content_type: format!("{}{}", CONTENT_TYPE_PREFIX, tag),
            body: words.iter().flat_map(|w| w.to_be_bytes()).collect(),
        }
    }

    /// Content type without the `application/` prefix
    pub fn tag(&self) -> &str {
        self.content_type
            .strip_prefix(CONTENT_TYPE_PREFIX)
            .unwrap_or(&self.content_type)
    }

    /// Big-endian u32 at word `index` of the body
    fn word(&self, index: usize) -> Result<u32> {
        let start = index * 4;
        self.body
            .get(start..start + 4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            .ok_or_else(|| {
                Error::Protocol(format!(
                    "{}: body of {} bytes, need {}",
                    self.content_type,
                    self.body.len(),
                    start + 4
                ))
            })
    }
}

/// Message for one motor command
pub fn encode_command(motor: MotorId, kind: CommandKind) -> BusMessage {
    match kind {
        CommandKind::Forward => BusMessage::new(TAG_FORWARD, &[motor]),
        CommandKind::Backward => BusMessage::new(TAG_BACKWARD, &[motor]),
        CommandKind::Stop => BusMessage::new(TAG_STOP, &[motor]),
        CommandKind::SetSpeed(speed) => BusMessage::new(TAG_SPEED, &[motor, u32::from(speed)]),
        CommandKind::ForwardForTicks(ticks) => {
            BusMessage::new(TAG_FORWARD_FOR_TICKS, &[motor, ticks])
        }
        CommandKind::BackwardForTicks(ticks) => {
            BusMessage::new(TAG_BACKWARD_FOR_TICKS, &[motor, ticks])
        }
    }
}

/// Parse a motor command, as the motor daemon does
pub fn decode_command(message: &BusMessage) -> Result<MotorCommand> {
    let motor = message.word(0)?;
    let kind = match message.tag() {
        TAG_FORWARD => CommandKind::Forward,
        TAG_BACKWARD => CommandKind::Backward,
        TAG_STOP => CommandKind::Stop,
        TAG_SPEED => {
            let speed = message.word(1)?;
            CommandKind::SetSpeed(u16::try_from(speed).unwrap_or(u16::MAX))
        }
        TAG_FORWARD_FOR_TICKS => CommandKind::ForwardForTicks(message.word(1)?),
        TAG_BACKWARD_FOR_TICKS => CommandKind::BackwardForTicks(message.word(1)?),
        other => {
            return Err(Error::Protocol(format!("Unknown command tag: {}", other)));
        }
    };
    Ok(MotorCommand::new(motor, kind))
}

/// Message for one feedback event
pub fn encode_feedback(event: FeedbackEvent) -> BusMessage {
    match event {
        FeedbackEvent::TicksPerRotation(ticks) => BusMessage::new(TAG_TICKS_PER_ROTATION, &[ticks]),
        FeedbackEvent::AutoStop(motor) => BusMessage::new(TAG_AUTOSTOP, &[motor]),
    }
}

/// Parse inbound feedback.
///
/// `Ok(None)` for tags that aren't feedback; short bodies are errors.
pub fn decode_feedback(message: &BusMessage) -> Result<Option<FeedbackEvent>> {
    match message.tag() {
        TAG_TICKS_PER_ROTATION => Ok(Some(FeedbackEvent::TicksPerRotation(message.word(0)?))),
        TAG_AUTOSTOP => Ok(Some(FeedbackEvent::AutoStop(message.word(0)?))),
        _ => Ok(None),
    }
}

/// Write one length-prefixed frame
pub fn write_frame<W: Write>(writer: &mut W, message: &BusMessage) -> Result<()> {
    let content_type = message.content_type.as_bytes();
    let type_len = u8::try_from(content_type.len()).map_err(|_| {
        Error::Protocol(format!(
            "Content type too long: {} bytes",
            content_type.len()
        ))
    })?;

    let len = 1 + content_type.len() + message.body.len();
    if len > MAX_FRAME_LEN {
        return Err(Error::Protocol(format!("Frame too large: {} bytes", len)));
    }

    let mut buf = Vec::with_capacity(4 + len);
    buf.extend_from_slice(&(len as u32).to_be_bytes());
    buf.push(type_len);
    buf.extend_from_slice(content_type);
    buf.extend_from_slice(&message.body);
    writer.write_all(&buf)?;
    writer.flush()?;
    Ok(())
}

/// Incremental frame reader for one connection.
///
/// Bytes received before a read timeout stay buffered, so a frame split
/// across timeouts is reassembled on a later call.
#[derive(Debug, Default)]
pub struct FrameReader {
    buf: Vec<u8>,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of an incomplete frame held over from earlier reads
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Read until one frame is complete.
    ///
    /// Returns `Ok(None)` when the read timed out first; partial bytes are
    /// kept. A closed stream is an `Io` error.
    pub fn read_frame<R: Read>(&mut self, reader: &mut R) -> Result<Option<BusMessage>> {
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(message) = self.take_frame()? {
                return Ok(Some(message));
            }
            match reader.read(&mut chunk) {
                Ok(0) => {
                    return Err(Error::Io(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        format!("Stream closed with {} bytes buffered", self.buf.len()),
                    )));
                }
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                    return Ok(None);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }

    fn take_frame(&mut self) -> Result<Option<BusMessage>> {
        if self.buf.len() < 4 {
            return Ok(None);
        }
        let len = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]) as usize;
        if len == 0 || len > MAX_FRAME_LEN {
            return Err(Error::Protocol(format!("Invalid frame length: {}", len)));
        }
        if self.buf.len() < 4 + len {
            return Ok(None);
        }

        let frame: Vec<u8> = self.buf.drain(..4 + len).skip(4).collect();
        parse_frame(&frame).map(Some)
    }
}

fn parse_frame(frame: &[u8]) -> Result<BusMessage> {
    let len = frame.len();
    let type_len = usize::from(frame[0]);
    if 1 + type_len > len {
        return Err(Error::Protocol(format!(
            "Content type length {} exceeds frame of {} bytes",
            type_len, len
        )));
    }
    let content_type = std::str::from_utf8(&frame[1..1 + type_len])
        .map_err(|e| Error::Protocol(format!("Content type is not UTF-8: {}", e)))?
        .to_string();
    let body = frame[1 + type_len..].to_vec();

    Ok(BusMessage { content_type, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_forward_payload() {
        let message = encode_command(3, CommandKind::Forward);
        assert_eq!(message.content_type, "application/dcmotor_forward");
        assert_eq!(message.body, vec![0, 0, 0, 3]);
    }

    #[test]
    fn test_ticks_payload() {
        let message = encode_command(4, CommandKind::BackwardForTicks(250));
        assert_eq!(message.content_type, "application/dcmotor_backward_for_ticks");
        assert_eq!(message.body, vec![0, 0, 0, 4, 0, 0, 0, 250]);
    }

    #[test]
    fn test_speed_payload() {
        let message = encode_command(1, CommandKind::SetSpeed(1000));
        assert_eq!(message.tag(), "dcmotor_speed");
        assert_eq!(message.body, vec![0, 0, 0, 1, 0, 0, 0x03, 0xE8]);
    }

    #[test]
    fn test_decode_command_matches_encoding() {
        for kind in [
            CommandKind::Forward,
            CommandKind::Backward,
            CommandKind::Stop,
            CommandKind::SetSpeed(600),
            CommandKind::ForwardForTicks(12),
            CommandKind::BackwardForTicks(99),
        ] {
            let decoded = decode_command(&encode_command(2, kind)).unwrap();
            assert_eq!(decoded, MotorCommand::new(2, kind));
        }
    }

    #[test]
    fn test_decode_feedback() {
        let ticks = BusMessage::new(TAG_TICKS_PER_ROTATION, &[360]);
        assert_eq!(
            decode_feedback(&ticks).unwrap(),
            Some(FeedbackEvent::TicksPerRotation(360))
        );
        let stop = BusMessage::new(TAG_AUTOSTOP, &[4]);
        assert_eq!(decode_feedback(&stop).unwrap(), Some(FeedbackEvent::AutoStop(4)));
    }

    #[test]
    fn test_unknown_feedback_tag_ignored() {
        let message = BusMessage::new("dcmotor_temperature", &[40]);
        assert_eq!(decode_feedback(&message).unwrap(), None);
    }

    #[test]
    fn test_short_feedback_body_is_error() {
        let message = BusMessage {
            content_type: "application/dcmotor_autostop".to_string(),
            body: vec![0, 1],
        };
        assert!(matches!(decode_feedback(&message), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_frame_layout() {
        let mut out = Vec::new();
        write_frame(&mut out, &BusMessage::new(TAG_STOP, &[2])).unwrap();
        let content_type = b"application/dcmotor_stop";
        let len = 1 + content_type.len() + 4;
        assert_eq!(&out[..4], &(len as u32).to_be_bytes());
        assert_eq!(out[4] as usize, content_type.len());
        assert_eq!(&out[5..5 + content_type.len()], content_type);
        assert_eq!(&out[5 + content_type.len()..], &[0, 0, 0, 2]);

        let decoded = FrameReader::new().read_frame(&mut Cursor::new(out)).unwrap().unwrap();
        assert_eq!(decoded, BusMessage::new(TAG_STOP, &[2]));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut bytes = ((MAX_FRAME_LEN + 1) as u32).to_be_bytes().to_vec();
        bytes.extend_from_slice(&[0; 16]);
        assert!(matches!(
            FrameReader::new().read_frame(&mut Cursor::new(bytes)),
            Err(Error::Protocol(_))
        ));

        let message = BusMessage {
            content_type: "application/blob".to_string(),
            body: vec![0; MAX_FRAME_LEN],
        };
        assert!(write_frame(&mut Vec::new(), &message).is_err());
    }

    #[test]
    fn test_bad_type_length_rejected() {
        let mut bytes = 3u32.to_be_bytes().to_vec();
        bytes.extend_from_slice(&[200, b'a', b'b']);
        assert!(matches!(
            FrameReader::new().read_frame(&mut Cursor::new(bytes)),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_closed_stream_is_io_error() {
        let mut empty = Cursor::new(Vec::new());
        assert!(matches!(FrameReader::new().read_frame(&mut empty), Err(Error::Io(_))));
    }

    /// Reader yielding scripted chunks; `None` is a read timeout
    struct ChunkedReader {
        chunks: std::collections::VecDeque<Option<Vec<u8>>>,
    }

    impl Read for ChunkedReader {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            match self.chunks.pop_front() {
                Some(Some(chunk)) => {
                    out[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                Some(None) => Err(std::io::Error::from(ErrorKind::WouldBlock)),
                None => Ok(0),
            }
        }
    }

    #[test]
    fn test_frame_split_across_timeouts_is_reassembled() {
        let mut bytes = Vec::new();
        write_frame(&mut bytes, &BusMessage::new(TAG_TICKS_PER_ROTATION, &[360])).unwrap();
        write_frame(&mut bytes, &BusMessage::new(TAG_AUTOSTOP, &[2])).unwrap();

        // Cut inside the length prefix, then again inside the content type
        let mut reader = ChunkedReader {
            chunks: [
                Some(bytes[..2].to_vec()),
                None,
                Some(bytes[2..6].to_vec()),
                None,
                Some(bytes[6..].to_vec()),
            ]
            .into_iter()
            .collect(),
        };

        let mut frames = FrameReader::new();
        assert_eq!(frames.read_frame(&mut reader).unwrap(), None);
        assert_eq!(frames.pending(), 2);
        assert_eq!(frames.read_frame(&mut reader).unwrap(), None);
        assert_eq!(frames.pending(), 6);
        assert_eq!(
            frames.read_frame(&mut reader).unwrap(),
            Some(BusMessage::new(TAG_TICKS_PER_ROTATION, &[360]))
        );
        assert_eq!(
            frames.read_frame(&mut reader).unwrap(),
            Some(BusMessage::new(TAG_AUTOSTOP, &[2]))
        );
        assert_eq!(frames.pending(), 0);
        assert!(matches!(frames.read_frame(&mut reader), Err(Error::Io(_))));
    }
}
