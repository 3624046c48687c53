//! Events handed to the control loop by background threads

use crate::core::types::MotorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrainEvent {
    /// Rotate timer armed in transition epoch `epoch` expired
    RotationElapsed { epoch: u64 },
    /// Motor spent its tick budget and stopped
    MotorAutoStopped(MotorId),
}
