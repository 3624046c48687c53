//! Simulated wheel motor driver

use super::world::SimWorld;
use crate::core::driver::MotorActuator;
use crate::core::types::{CommandKind, MotorId};
use crate::devices::bridge::{DcBridge, Direction};
use crate::error::Result;
use parking_lot::Mutex;
use std::sync::Arc;

/// Hands motor commands to the simulated chassis
pub struct SimActuator {
    world: Arc<Mutex<SimWorld>>,
}

impl SimActuator {
    pub fn new(world: Arc<Mutex<SimWorld>>) -> Self {
        Self { world }
    }
}

impl MotorActuator for SimActuator {
    fn send_command(&mut self, motor: MotorId, kind: CommandKind) -> Result<()> {
        log::trace!("Simulated motor {} <- {}", motor, kind.name());
        self.world.lock().apply(motor, kind)
    }
}

/// DC bridge wired to the simulated chassis.
///
/// CW runs a wheel forward, CCW backward. Servo moves are only logged.
pub struct SimBridge {
    world: Arc<Mutex<SimWorld>>,
}

impl SimBridge {
    pub fn new(world: Arc<Mutex<SimWorld>>) -> Self {
        Self { world }
    }
}

impl DcBridge for SimBridge {
    fn move_dc(&mut self, motor: MotorId, direction: Direction, duty: u16) -> Result<()> {
        let kind = match direction {
            Direction::Cw => CommandKind::Forward,
            Direction::Ccw => CommandKind::Backward,
            Direction::Stop => CommandKind::Stop,
        };
        let mut world = self.world.lock();
        world.apply(motor, CommandKind::SetSpeed(duty))?;
        world.apply(motor, kind)
    }

    fn set_servo(&mut self, servo: u8, angle: u16, speed: u16) -> Result<()> {
        log::debug!(
            "Simulated servo {} to {} deg at speed {}",
            servo,
            angle,
            speed
        );
        Ok(())
    }
}
