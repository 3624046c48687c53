//! Simulated robot for hardware-free runs
//!
//! | Component | Simulation |
//! |-----------|------------|
//! | Wheel motors | Direction, duty and tick budgets per motor |
//! | Encoders | Tick counting, auto-stop, ticks-per-rotation report |
//! | Camera | Panorama slice rendered from the chassis heading |
//! | Button | Scripted presses at fixed offsets |
//!
//! # Thread Model
//!
//! ```text
//! ┌─────────────────┐   commands   ┌──────────────┐
//! │  Control loop   │─────────────▶│   SimWorld   │◀──── render (camera)
//! └─────────────────┘              └──────┬───────┘
//!          ▲                              │ step every 5 ms
//!          │ FeedbackEvent       ┌────────┴────────┐
//!          └─────────────────────│ mock-simulation │
//!                                └─────────────────┘
//! ```
//!
//! Also hosts the recording and scripted devices used by tests.

mod actuator;
mod button;
mod camera;
mod noise;
mod recording;
mod world;

pub use actuator::{SimActuator, SimBridge};
pub use button::{ManualButton, PRESS_HOLD, ScriptedButton};
pub use camera::SimCamera;
pub use recording::{
    CommandRecorder, CountingArm, RecordingActuator, ScriptedCamera, ScriptedClassifier,
};
pub use world::{SimWorld, render_view};

use crate::config::{RobotConfig, SimulationConfig};
use crate::core::types::FeedbackEvent;
use crate::error::{Error, Result};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Physics step period
const STEP_INTERVAL: Duration = Duration::from_millis(5);

/// Running simulation: physics thread plus device handles
pub struct SimRobot {
    config: SimulationConfig,
    world: Arc<Mutex<SimWorld>>,
    running: Arc<AtomicBool>,
    feedback: Receiver<FeedbackEvent>,
    handle: Option<JoinHandle<()>>,
}

impl SimRobot {
    /// Build the world and start the `mock-simulation` thread
    pub fn start(config: &SimulationConfig, robot: &RobotConfig) -> Result<Self> {
        log::info!(
            "Starting simulated robot: {}x{} camera, {} deg/s spin, {} ticks/rotation",
            config.frame_width,
            config.frame_height,
            config.degrees_per_second,
            config.ticks_per_rotation
        );

        let world = Arc::new(Mutex::new(SimWorld::new(
            config.clone(),
            robot.left_motor_id,
            robot.right_motor_id,
        )));
        let running = Arc::new(AtomicBool::new(true));
        let (feedback_tx, feedback) = crossbeam_channel::unbounded();

        let world_clone = Arc::clone(&world);
        let running_clone = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("mock-simulation".to_string())
            .spawn(move || simulation_loop(world_clone, running_clone, feedback_tx))
            .map_err(|e| Error::HardwareInit(format!("Failed to spawn simulation thread: {}", e)))?;

        Ok(Self {
            config: config.clone(),
            world,
            running,
            feedback,
            handle: Some(handle),
        })
    }

    /// Shared world state, for inspection
    pub fn world(&self) -> Arc<Mutex<SimWorld>> {
        Arc::clone(&self.world)
    }

    pub fn actuator(&self) -> SimActuator {
        SimActuator::new(Arc::clone(&self.world))
    }

    /// Motor bridge driving the simulated wheels
    pub fn bridge(&self) -> SimBridge {
        SimBridge::new(Arc::clone(&self.world))
    }

    pub fn camera(&self) -> SimCamera {
        SimCamera::new(
            Arc::clone(&self.world),
            self.config.frame_rate_hz,
            self.config.noise_stddev,
            self.config.random_seed,
        )
    }

    pub fn button(&self) -> ScriptedButton {
        ScriptedButton::new(&self.config.press_at_ms)
    }

    /// Feedback raised by the simulated motors
    pub fn feedback(&self) -> Receiver<FeedbackEvent> {
        self.feedback.clone()
    }

    /// Stop the physics thread and wait for it
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Simulation thread panicked");
            }
        }
    }
}

impl Drop for SimRobot {
    fn drop(&mut self) {
        self.stop();
    }
}

fn simulation_loop(
    world: Arc<Mutex<SimWorld>>,
    running: Arc<AtomicBool>,
    feedback: Sender<FeedbackEvent>,
) {
    log::debug!("Simulation loop started");
    let mut last = Instant::now();

    while running.load(Ordering::Acquire) {
        thread::sleep(STEP_INTERVAL);
        let now = Instant::now();
        let dt = (now - last).as_secs_f64();
        last = now;

        let events = world.lock().step(dt);
        for event in events {
            log::debug!("Simulated feedback: {:?}", event);
            // Receiver gone means nobody listens anymore
            if feedback.send(event).is_err() {
                log::trace!("Feedback receiver dropped");
            }
        }
    }

    log::debug!("Simulation loop stopped");
}
