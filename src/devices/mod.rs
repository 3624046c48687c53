//! Device bindings

pub mod bridge;
pub mod bus;
pub mod mock;

use crate::config::OonConfig;
use crate::core::driver::{ArmActuator, ButtonInput, Camera, MotorActuator, NoArm};
use crate::core::shutdown::Shutdown;
use crate::core::types::FeedbackEvent;
use crate::error::{Error, Result};
use bridge::{BridgeActuator, BridgeArm};
use bus::{BusActuator, TcpBus};
use crossbeam_channel::Receiver;
use mock::SimRobot;

/// Servo speed used for arm moves
const ARM_SERVO_SPEED: u16 = 100;

/// Devices for one robot, plus whatever keeps their background threads alive
pub struct Robot {
    pub actuator: Box<dyn MotorActuator>,
    pub camera: Box<dyn Camera>,
    pub button: Box<dyn ButtonInput>,
    pub arm: Box<dyn ArmActuator>,
    pub feedback: Receiver<FeedbackEvent>,
    pub threads: DeviceThreads,
}

/// Owner of the simulation and bus reader threads
pub struct DeviceThreads {
    sim: Option<SimRobot>,
    bus: Option<TcpBus>,
}

impl DeviceThreads {
    /// Stop background device threads
    pub fn close(&mut self) {
        if let Some(bus) = self.bus.as_mut() {
            bus.close();
        }
        if let Some(sim) = self.sim.as_mut() {
            sim.stop();
        }
    }
}

/// Create the robot devices selected by `[device] type`
pub fn create_robot(config: &OonConfig, shutdown: &Shutdown) -> Result<Robot> {
    match config.device.device_type.as_str() {
        "mock" => {
            let sim = SimRobot::start(&config.simulation, &config.robot)?;
            Ok(Robot {
                actuator: Box::new(sim.actuator()),
                camera: Box::new(sim.camera()),
                button: Box::new(sim.button()),
                arm: Box::new(NoArm),
                feedback: sim.feedback(),
                threads: DeviceThreads {
                    sim: Some(sim),
                    bus: None,
                },
            })
        }
        "bridge-sim" => {
            let sim = SimRobot::start(&config.simulation, &config.robot)?;
            let shared = bridge::share(Box::new(sim.bridge()));
            Ok(Robot {
                actuator: Box::new(BridgeActuator::new(
                    shared.clone(),
                    &config.robot.inverted,
                    config.robot.default_speed,
                )),
                camera: Box::new(sim.camera()),
                button: Box::new(sim.button()),
                arm: Box::new(BridgeArm::new(
                    shared,
                    config.robot.arm_servo,
                    config.robot.arm_rest_angle,
                    ARM_SERVO_SPEED,
                )),
                feedback: sim.feedback(),
                threads: DeviceThreads {
                    sim: Some(sim),
                    bus: None,
                },
            })
        }
        "bus" => {
            let (bus, feedback) = bus::connect(&config.bus, shutdown.clone())?;
            // The bus carries motors only
            log::warn!(
                "No camera or button binding for the bus device, using simulated ones (button {} unused)",
                config.bus.button_id
            );
            let sim = SimRobot::start(&config.simulation, &config.robot)?;
            Ok(Robot {
                actuator: Box::new(BusActuator::new(bus.publisher())),
                camera: Box::new(sim.camera()),
                button: Box::new(sim.button()),
                arm: Box::new(NoArm),
                feedback,
                threads: DeviceThreads {
                    sim: Some(sim),
                    bus: Some(bus),
                },
            })
        }
        other => Err(Error::Config(format!("Unknown device type: {}", other))),
    }
}
