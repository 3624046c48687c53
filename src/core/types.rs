//! Core data types shared by the controller and device bindings.
//!
//! - [`CommandKind`] / [`MotorCommand`]: what a single wheel motor is told to do
//! - [`Frame`]: an immutable camera capture
//! - [`Classification`]: the verdict of an injected target classifier
//! - [`FeedbackEvent`]: asynchronous reports coming back from the motor side

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Motor identifier as addressed by the actuator
pub type MotorId = u32;

/// Per-motor command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Forward,
    Backward,
    ForwardForTicks(u32),
    BackwardForTicks(u32),
    Stop,
    SetSpeed(u16),
}

impl CommandKind {
    /// Tick budget carried by tick-based commands
    pub fn ticks(&self) -> Option<u32> {
        match self {
            Self::ForwardForTicks(t) | Self::BackwardForTicks(t) => Some(*t),
            Self::Forward | Self::Backward | Self::Stop | Self::SetSpeed(_) => None,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::ForwardForTicks(_) => "forward_for_ticks",
            Self::BackwardForTicks(_) => "backward_for_ticks",
            Self::Stop => "stop",
            Self::SetSpeed(_) => "speed",
        }
    }
}

/// A command addressed to one motor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorCommand {
    pub motor: MotorId,
    pub kind: CommandKind,
}

impl MotorCommand {
    pub fn new(motor: MotorId, kind: CommandKind) -> Self {
        Self { motor, kind }
    }
}

impl fmt::Display for MotorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CommandKind::ForwardForTicks(t) | CommandKind::BackwardForTicks(t) => {
                write!(f, "motor {} {} ({} ticks)", self.motor, self.kind.name(), t)
            }
            CommandKind::SetSpeed(v) => write!(f, "motor {} speed {}", self.motor, v),
            _ => write!(f, "motor {} {}", self.motor, self.kind.name()),
        }
    }
}

/// Number of samples per pixel (R, G, B)
pub const CHANNELS: usize = 3;

/// Immutable RGB capture.
///
/// Pixels are stored row-major, 3 bytes per pixel. The buffer is shared so
/// frames can be handed between components without copying.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
    captured_at: Instant,
}

impl Frame {
    /// Build a frame from a raw RGB buffer.
    ///
    /// Returns `None` if the buffer length doesn't match `width * height * 3`.
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if pixels.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels: pixels.into(),
            captured_at: Instant::now(),
        })
    }

    /// Frame filled with a single color
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * CHANNELS);
        for _ in 0..count {
            pixels.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            pixels: pixels.into(),
            captured_at: Instant::now(),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw RGB samples
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGB value at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]])
    }

    #[inline]
    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }
}

/// Verdict of the target classifier for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Nothing of interest, keep patrolling
    Clear,
    /// Something to steer away from
    Obstacle,
    /// A target the robot should act on
    Actionable,
}

/// Asynchronous report from the motor side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackEvent {
    /// Encoder ticks counted over one full wheel rotation
    TicksPerRotation(u32),
    /// Motor stopped on its own after spending its tick budget
    AutoStop(MotorId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_from_rgb_checks_length() {
        assert!(Frame::from_rgb(2, 2, vec![0; 12]).is_some());
        assert!(Frame::from_rgb(2, 2, vec![0; 11]).is_none());
    }

    #[test]
    fn test_solid_frame_pixels() {
        let frame = Frame::solid(4, 3, [10, 20, 30]);
        assert_eq!(frame.dimensions(), (4, 3));
        assert_eq!(frame.pixels().len(), 36);
        assert_eq!(frame.pixel(3, 2), Some([10, 20, 30]));
        assert_eq!(frame.pixel(4, 0), None);
    }

    #[test]
    fn test_command_ticks() {
        assert_eq!(CommandKind::ForwardForTicks(7).ticks(), Some(7));
        assert_eq!(CommandKind::BackwardForTicks(3).ticks(), Some(3));
        assert_eq!(CommandKind::Forward.ticks(), None);
        assert_eq!(CommandKind::SetSpeed(10).ticks(), None);
    }

    #[test]
    fn test_command_display() {
        let cmd = MotorCommand::new(3, CommandKind::ForwardForTicks(250));
        assert_eq!(cmd.to_string(), "motor 3 forward_for_ticks (250 ticks)");
        assert_eq!(
            MotorCommand::new(4, CommandKind::Stop).to_string(),
            "motor 4 stop"
        );
    }
}
