//! Scripted and recording devices for tests and dry runs

use crate::core::driver::{ArmActuator, Camera, MotorActuator, TargetClassifier};
use crate::core::types::{Classification, CommandKind, Frame, MotorCommand, MotorId};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Shared log of delivered motor commands
#[derive(Debug, Clone, Default)]
pub struct CommandRecorder(Arc<Mutex<Vec<MotorCommand>>>);

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, command: MotorCommand) {
        self.0.lock().push(command);
    }

    /// Snapshot of everything delivered so far
    pub fn commands(&self) -> Vec<MotorCommand> {
        self.0.lock().clone()
    }

    /// Drain the log
    pub fn take(&self) -> Vec<MotorCommand> {
        std::mem::take(&mut *self.0.lock())
    }

    pub fn last_for(&self, motor: MotorId) -> Option<CommandKind> {
        self.0
            .lock()
            .iter()
            .rev()
            .find(|c| c.motor == motor)
            .map(|c| c.kind)
    }
}

/// Actuator that records commands instead of moving anything
pub struct RecordingActuator {
    recorder: CommandRecorder,
    failing: HashSet<MotorId>,
}

impl RecordingActuator {
    pub fn new(recorder: CommandRecorder) -> Self {
        Self {
            recorder,
            failing: HashSet::new(),
        }
    }

    /// Reject every command addressed to `motor`
    pub fn fail_motor(mut self, motor: MotorId) -> Self {
        self.failing.insert(motor);
        self
    }
}

impl MotorActuator for RecordingActuator {
    fn send_command(&mut self, motor: MotorId, kind: CommandKind) -> Result<()> {
        if self.failing.contains(&motor) {
            return Err(Error::CommandSend {
                motor,
                reason: "motor offline".to_string(),
            });
        }
        self.recorder.push(MotorCommand::new(motor, kind));
        Ok(())
    }
}

/// Camera replaying a fixed list of frames.
///
/// Returns `None` once the script runs out, unless a repeat frame is set.
pub struct ScriptedCamera {
    frames: VecDeque<Frame>,
    repeat: Option<Frame>,
}

impl ScriptedCamera {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
            repeat: None,
        }
    }

    /// Keep returning `frame` after the script is exhausted
    pub fn then_repeat(mut self, frame: Frame) -> Self {
        self.repeat = Some(frame);
        self
    }
}

impl Camera for ScriptedCamera {
    fn grab_frame_with_timeout(&mut self, _timeout: Duration) -> Option<Frame> {
        self.frames.pop_front().or_else(|| self.repeat.clone())
    }
}

/// Classifier whose verdict is set from outside
#[derive(Debug, Clone)]
pub struct ScriptedClassifier {
    verdict: Arc<Mutex<Classification>>,
}

impl Default for ScriptedClassifier {
    fn default() -> Self {
        Self {
            verdict: Arc::new(Mutex::new(Classification::Clear)),
        }
    }
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verdict reported for every following frame
    pub fn set(&self, verdict: Classification) {
        *self.verdict.lock() = verdict;
    }
}

impl TargetClassifier for ScriptedClassifier {
    fn classify(&mut self, _frame: &Frame) -> Classification {
        *self.verdict.lock()
    }
}

/// Arm that counts rest-pose requests
#[derive(Debug, Clone, Default)]
pub struct CountingArm {
    rests: Arc<AtomicUsize>,
}

impl CountingArm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rest_count(&self) -> usize {
        self.rests.load(Ordering::Acquire)
    }
}

impl ArmActuator for CountingArm {
    fn rest_pose(&mut self) -> Result<()> {
        self.rests.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
