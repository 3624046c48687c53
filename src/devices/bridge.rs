//! Direct motor-bridge binding
//!
//! Drives wheel motors through a DC motor bridge that only understands
//! direction plus duty. Register-level programming of the bridge lives behind
//! [`DcBridge`].
//!
//! | Command | Bridge call |
//! |---------|-------------|
//! | `Forward` | `move_dc(motor, Cw, duty)` |
//! | `Backward` | `move_dc(motor, Ccw, duty)` |
//! | `Stop` | `move_dc(motor, Stop, duty)` |
//! | `SetSpeed(v)` | stores `v` as duty for later moves |
//! | tick commands | `NotSupported` |
//!
//! Motors listed as inverted have CW and CCW swapped.

use crate::core::driver::{ArmActuator, MotorActuator};
use crate::core::types::{CommandKind, MotorId};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Rotation direction understood by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Cw,
    Ccw,
    Stop,
}

impl Direction {
    fn inverted(self) -> Self {
        match self {
            Self::Cw => Self::Ccw,
            Self::Ccw => Self::Cw,
            Self::Stop => Self::Stop,
        }
    }
}

/// DC motor and servo bridge
pub trait DcBridge: Send {
    fn move_dc(&mut self, motor: MotorId, direction: Direction, duty: u16) -> Result<()>;

    fn set_servo(&mut self, servo: u8, angle: u16, speed: u16) -> Result<()>;
}

/// Bridge shared by the wheel actuator and the arm
pub type SharedBridge = Arc<Mutex<Box<dyn DcBridge>>>;

pub fn share(bridge: Box<dyn DcBridge>) -> SharedBridge {
    Arc::new(Mutex::new(bridge))
}

/// Wheel actuator over a DC bridge
pub struct BridgeActuator {
    bridge: SharedBridge,
    inverted: HashSet<MotorId>,
    duty: u16,
}

impl BridgeActuator {
    pub fn new(bridge: SharedBridge, inverted: &[MotorId], duty: u16) -> Self {
        Self {
            bridge,
            inverted: inverted.iter().copied().collect(),
            duty,
        }
    }

    /// Duty used by the next move
    pub fn duty(&self) -> u16 {
        self.duty
    }

    fn move_dc(&mut self, motor: MotorId, direction: Direction) -> Result<()> {
        let direction = if self.inverted.contains(&motor) {
            direction.inverted()
        } else {
            direction
        };
        self.bridge
            .lock()
            .move_dc(motor, direction, self.duty)
            .map_err(|e| Error::CommandSend {
                motor,
                reason: e.to_string(),
            })
    }
}

impl MotorActuator for BridgeActuator {
    fn send_command(&mut self, motor: MotorId, kind: CommandKind) -> Result<()> {
        match kind {
            CommandKind::Forward => self.move_dc(motor, Direction::Cw),
            CommandKind::Backward => self.move_dc(motor, Direction::Ccw),
            CommandKind::Stop => self.move_dc(motor, Direction::Stop),
            CommandKind::SetSpeed(duty) => {
                self.duty = duty;
                Ok(())
            }
            CommandKind::ForwardForTicks(_) | CommandKind::BackwardForTicks(_) => Err(
                Error::NotSupported(format!("{} on the motor bridge", kind.name())),
            ),
        }
    }
}

/// Tool arm on one bridge servo channel
pub struct BridgeArm {
    bridge: SharedBridge,
    servo: u8,
    rest_angle: u16,
    speed: u16,
}

impl BridgeArm {
    pub fn new(bridge: SharedBridge, servo: u8, rest_angle: u16, speed: u16) -> Self {
        Self {
            bridge,
            servo,
            rest_angle,
            speed,
        }
    }
}

impl ArmActuator for BridgeArm {
    fn rest_pose(&mut self) -> Result<()> {
        log::debug!("Arm servo {} to rest angle {}", self.servo, self.rest_angle);
        self.bridge
            .lock()
            .set_servo(self.servo, self.rest_angle, self.speed)
    }
}
