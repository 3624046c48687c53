//! Behavior control loop
//!
//! # State Machine
//!
//! ```text
//!            press                 obstacle
//!   Idle ◀──────────▶ Seek ─────────────────────▶ Rotate
//!                      ▲ ▲ ◀──────────────────────┘  timer
//!                      │ │
//!          timeout     │ │ target lost / timeout
//!        ┌─────────────┘ └──────────────┐
//!        │     actionable      confirmed│
//!        │ Seek ─────────▶ Attack ─────▶ Kill
//!        └─────────────────┘
//! ```
//!
//! | State | Entry | Exit |
//! |-------|-------|------|
//! | Idle | stop wheels, arm to rest | - |
//! | Seek | both wheels forward | stop wheels |
//! | Rotate | spin, arm timer | stop wheels, drop timer |
//! | Attack | logged | - |
//! | Kill | logged | arm to rest |
//!
//! `switch_state` is only ever called from the control loop thread. Timers
//! and feedback reach it as [`BrainEvent`]s; a `RotationElapsed` event
//! counts only if its epoch is current and the robot is still rotating.

use super::debounce::Debouncer;
use super::events::BrainEvent;
use super::state::BehaviorState;
use super::timer::RotateTimer;
use crate::calibration::RotationCalibrator;
use crate::config::{ControllerConfig, OonConfig};
use crate::core::driver::{ArmActuator, ButtonInput, Camera, TargetClassifier};
use crate::core::shutdown::Shutdown;
use crate::core::types::Classification;
use crate::error::{Error, Result};
use crate::motion::MotionProtocol;
use crossbeam_channel::{Receiver, Sender};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

/// Jitter divisor range: `r` in 1..8
const JITTER_DIVISORS: std::ops::Range<u32> = 1..8;

/// Rotate duration for a full turn of `full` and jitter divisor `r`.
///
/// `full / 2 + (full / 2) / r`; `r` of zero counts as one.
pub fn jittered_rotation(full: Duration, r: u32) -> Duration {
    let half = full / 2;
    half + half / r.max(1)
}

/// Collaborators driven by the controller besides the wheels
pub struct BrainDevices {
    pub camera: Box<dyn Camera>,
    pub button: Box<dyn ButtonInput>,
    pub classifier: Box<dyn TargetClassifier>,
    pub arm: Box<dyn ArmActuator>,
}

/// Behavior controller
pub struct Brain {
    config: ControllerConfig,
    default_speed: u16,
    motion: MotionProtocol,
    calibrator: RotationCalibrator,
    devices: BrainDevices,
    shutdown: Shutdown,

    state: BehaviorState,
    epoch: u64,
    state_entered: Instant,
    rotation_duration: Duration,
    debouncer: Debouncer,
    rng: SmallRng,
    rotate_timer: Option<RotateTimer>,

    events_tx: Sender<BrainEvent>,
    events_rx: Receiver<BrainEvent>,
}

impl Brain {
    pub fn new(
        config: &OonConfig,
        motion: MotionProtocol,
        devices: BrainDevices,
        shutdown: Shutdown,
    ) -> Self {
        let rng = if config.controller.random_seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(config.controller.random_seed)
        };
        let (events_tx, events_rx) = crossbeam_channel::unbounded();

        Self {
            config: config.controller.clone(),
            default_speed: config.robot.default_speed,
            motion,
            calibrator: RotationCalibrator::new(config.calibration.clone()),
            devices,
            shutdown,
            state: BehaviorState::Idle,
            epoch: 0,
            state_entered: Instant::now(),
            rotation_duration: config.calibration.fallback_rotation(),
            debouncer: Debouncer::new(config.controller.debounce()),
            rng,
            rotate_timer: None,
            events_tx,
            events_rx,
        }
    }

    #[inline]
    pub fn state(&self) -> BehaviorState {
        self.state
    }

    /// Transition counter, bumped by every `switch_state`
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Full-turn duration used when entering Rotate
    pub fn rotation_duration(&self) -> Duration {
        self.rotation_duration
    }

    pub fn set_rotation_duration(&mut self, duration: Duration) {
        self.rotation_duration = duration.max(Duration::from_millis(1));
    }

    pub fn motion(&self) -> &MotionProtocol {
        &self.motion
    }

    /// Whether a Rotate timer is currently armed
    pub fn rotation_armed(&self) -> bool {
        self.rotate_timer.is_some()
    }

    /// Sender for background threads feeding the control loop
    pub fn events_sender(&self) -> Sender<BrainEvent> {
        self.events_tx.clone()
    }

    /// Apply the default speed and run Idle's entry action
    pub fn initialize(&mut self) {
        log::info!("Initializing controller in {}", self.state);
        self.motion.set_speed(self.default_speed);
        self.state_entered = Instant::now();
        self.enter(BehaviorState::Idle);
    }

    /// Measure the full-turn duration, keeping the fallback on failure
    pub fn calibrate(&mut self) -> bool {
        log::info!("Calibrating rotation...");
        let (duration, success) = self.calibrator.calibrate_rotation(
            &mut self.motion,
            self.devices.camera.as_mut(),
            &self.shutdown,
        );
        self.rotation_duration = duration;
        if success {
            log::info!("Rotation calibration succeeded: {:?} per turn", duration);
        } else {
            log::warn!("Rotation calibration failed, using default {:?}", duration);
        }
        success
    }

    /// Initialize and calibrate
    pub fn start(&mut self) -> bool {
        self.initialize();
        self.calibrate()
    }

    /// Run until shutdown, then stop the robot
    pub fn run(&mut self) -> Result<()> {
        self.start();
        if self.shutdown.is_triggered() {
            self.stop();
            return Ok(());
        }

        log::info!(
            "Control loop running every {} ms",
            self.config.poll_interval_ms
        );
        let poll = self.config.poll_interval();
        while !self.shutdown.is_triggered() {
            let tick_start = Instant::now();
            if let Err(e) = self.step(tick_start) {
                log::error!("Control step failed: {}", e);
            }
            let spent = tick_start.elapsed();
            if spent < poll && !self.shutdown.sleep(poll - spent) {
                break;
            }
        }

        self.stop();
        Ok(())
    }

    /// Drop any armed timer and stop both wheels
    pub fn stop(&mut self) {
        log::info!("Stopping controller in {}", self.state);
        self.rotate_timer = None;
        self.motion.stop();
    }

    /// One control tick at time `now`
    pub fn step(&mut self, now: Instant) -> Result<()> {
        self.drain_events(now)?;

        match self.state {
            BehaviorState::Idle => {
                if self.button_pressed(now) {
                    self.transition(now, BehaviorState::Seek)?;
                }
            }
            BehaviorState::Seek => {
                if self.button_pressed(now) {
                    self.transition(now, BehaviorState::Idle)?;
                    return Ok(());
                }
                match self.look() {
                    Some(Classification::Obstacle) => {
                        self.transition(now, BehaviorState::Rotate)?
                    }
                    Some(Classification::Actionable) => {
                        self.transition(now, BehaviorState::Attack)?
                    }
                    Some(Classification::Clear) | None => {}
                }
            }
            BehaviorState::Rotate => {
                if self.rotate_timer.is_none() {
                    log::warn!("Rotating without a timer, back to Seek");
                    self.transition(now, BehaviorState::Seek)?;
                }
            }
            BehaviorState::Attack => {
                if self.look() == Some(Classification::Actionable) {
                    self.transition(now, BehaviorState::Kill)?;
                } else if self.time_in_state(now) > self.config.attack_timeout() {
                    log::info!("Attack timed out");
                    self.transition(now, BehaviorState::Seek)?;
                }
            }
            BehaviorState::Kill => {
                let verdict = self.look();
                if verdict.is_some_and(|v| v != Classification::Actionable) {
                    log::info!("Target lost");
                    self.transition(now, BehaviorState::Seek)?;
                } else if self.time_in_state(now) > self.config.kill_timeout() {
                    log::info!("Kill timed out");
                    self.transition(now, BehaviorState::Seek)?;
                }
            }
        }
        Ok(())
    }

    /// Exit the current state and enter `new`.
    ///
    /// Transitions outside the table fail with
    /// [`Error::InvalidTransition`] and leave the state unchanged.
    pub fn switch_state(&mut self, new: BehaviorState) -> Result<()> {
        self.transition(Instant::now(), new)
    }

    /// `switch_state` with the entry time taken from the step clock
    fn transition(&mut self, now: Instant, new: BehaviorState) -> Result<()> {
        let from = self.state;
        if !from.can_transition_to(new) {
            return Err(Error::InvalidTransition { from, to: new });
        }

        log::info!("State {} -> {}", from, new);
        self.exit(from);
        self.state = new;
        self.epoch += 1;
        self.state_entered = now;
        self.enter(new);
        Ok(())
    }

    fn exit(&mut self, state: BehaviorState) {
        match state {
            BehaviorState::Idle | BehaviorState::Attack => {}
            BehaviorState::Seek => {
                self.motion.stop();
            }
            BehaviorState::Rotate => {
                self.rotate_timer = None;
                self.motion.stop();
            }
            BehaviorState::Kill => self.arm_to_rest(),
        }
    }

    fn enter(&mut self, state: BehaviorState) {
        match state {
            BehaviorState::Idle => {
                self.motion.stop();
                self.arm_to_rest();
            }
            BehaviorState::Seek => {
                self.motion.forward();
            }
            BehaviorState::Rotate => {
                self.motion.spin();
                let r = self.rng.gen_range(JITTER_DIVISORS);
                let delay = jittered_rotation(self.rotation_duration, r);
                match RotateTimer::arm(delay, self.epoch, self.events_tx.clone()) {
                    Ok(timer) => {
                        log::info!("Will rotate for {:?}", timer.delay());
                        self.rotate_timer = Some(timer);
                    }
                    Err(e) => log::error!("Failed to arm rotate timer: {}", e),
                }
            }
            BehaviorState::Attack => {
                log::info!("Attack: approaching target");
            }
            BehaviorState::Kill => {
                log::info!("Kill: acting on target");
            }
        }
    }

    fn drain_events(&mut self, now: Instant) -> Result<()> {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                BrainEvent::RotationElapsed { epoch } => {
                    if epoch == self.epoch && self.state == BehaviorState::Rotate {
                        self.transition(now, BehaviorState::Seek)?;
                    } else {
                        log::debug!(
                            "Ignoring stale rotation timer (epoch {}, now {} in {})",
                            epoch,
                            self.epoch,
                            self.state
                        );
                    }
                }
                BrainEvent::MotorAutoStopped(motor) => {
                    log::debug!("Motor {} finished its tick move", motor);
                }
            }
        }
        Ok(())
    }

    fn button_pressed(&mut self, now: Instant) -> bool {
        match self.devices.button.is_pressed() {
            Ok(true) => {
                if self.debouncer.accept(now) {
                    log::info!("Button pressed");
                    true
                } else {
                    log::trace!("Button press debounced");
                    false
                }
            }
            Ok(false) => false,
            Err(e) => {
                log::warn!("Failed to read button: {}", e);
                false
            }
        }
    }

    /// Classify the next frame, if one arrives in time
    fn look(&mut self) -> Option<Classification> {
        let frame = self
            .devices
            .camera
            .grab_frame_with_timeout(self.config.vision_timeout())?;
        let verdict = self.devices.classifier.classify(&frame);
        log::trace!("Vision: {:?}", verdict);
        Some(verdict)
    }

    fn arm_to_rest(&mut self) {
        if let Err(e) = self.devices.arm.rest_pose() {
            log::warn!("Failed to move arm to rest pose: {}", e);
        }
    }

    fn time_in_state(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.state_entered)
    }
}
