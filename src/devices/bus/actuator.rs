//! Wheel actuator publishing on the motor bus

use super::codec::encode_command;
use super::transport::BusPublisher;
use crate::core::driver::MotorActuator;
use crate::core::types::{CommandKind, MotorId};
use crate::error::{Error, Result};

/// One fire-and-forget publish per motor command
pub struct BusActuator {
    publisher: BusPublisher,
}

impl BusActuator {
    pub fn new(publisher: BusPublisher) -> Self {
        Self { publisher }
    }
}

impl MotorActuator for BusActuator {
    fn send_command(&mut self, motor: MotorId, kind: CommandKind) -> Result<()> {
        let message = encode_command(motor, kind);
        self.publisher
            .publish(&message)
            .map_err(|e| Error::CommandSend {
                motor,
                reason: e.to_string(),
            })
    }
}
