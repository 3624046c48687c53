//! Collaborator traits consumed by the controller
//!
//! Device bindings implement these; the controller, calibrator and motion
//! protocol only ever see the traits.

use crate::core::types::{Classification, CommandKind, Frame, MotorId};
use crate::error::Result;
use std::time::Duration;

/// Wheel motor actuation
pub trait MotorActuator: Send {
    /// Deliver one command to one motor.
    ///
    /// May block, but only for a bounded time. Errors are reported per
    /// command; callers decide whether to log or propagate.
    fn send_command(&mut self, motor: MotorId, kind: CommandKind) -> Result<()>;
}

/// Forward camera
pub trait Camera: Send {
    /// Wait up to `timeout` for a decoded frame.
    ///
    /// Returns `None` on timeout or decode failure.
    fn grab_frame_with_timeout(&mut self, timeout: Duration) -> Option<Frame>;
}

/// Operator button
pub trait ButtonInput: Send {
    fn is_pressed(&mut self) -> Result<bool>;
}

/// Injected target recognition
pub trait TargetClassifier: Send {
    fn classify(&mut self, frame: &Frame) -> Classification;
}

/// Tool arm (servo) driven in the Idle and Kill states
pub trait ArmActuator: Send {
    /// Move the arm back to its initial position
    fn rest_pose(&mut self) -> Result<()>;
}

impl<T: MotorActuator + ?Sized> MotorActuator for Box<T> {
    fn send_command(&mut self, motor: MotorId, kind: CommandKind) -> Result<()> {
        (**self).send_command(motor, kind)
    }
}

impl<T: Camera + ?Sized> Camera for Box<T> {
    fn grab_frame_with_timeout(&mut self, timeout: Duration) -> Option<Frame> {
        (**self).grab_frame_with_timeout(timeout)
    }
}

impl<T: ButtonInput + ?Sized> ButtonInput for Box<T> {
    fn is_pressed(&mut self) -> Result<bool> {
        (**self).is_pressed()
    }
}

/// Arm that has no servo attached
#[derive(Debug, Default, Clone, Copy)]
pub struct NoArm;

impl ArmActuator for NoArm {
    fn rest_pose(&mut self) -> Result<()> {
        log::trace!("No arm attached, rest pose skipped");
        Ok(())
    }
}
