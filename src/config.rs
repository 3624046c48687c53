//! Configuration for the Oon controller
//!
//! Loads configuration from a TOML file. Every section and field has a
//! default so a partial file (or no file at all) still yields a runnable
//! mock setup.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OonConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Which actuator binding to build
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// `mock` (simulated robot), `bridge-sim` (bridge binding over the
    /// simulated chassis) or `bus` (message-bus motor daemon)
    #[serde(rename = "type", default = "default_device_type")]
    pub device_type: String,
}

/// Chassis parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RobotConfig {
    /// Wheel diameter in millimeters, used for distance-to-tick conversion
    #[serde(default = "default_wheel_diameter_mm")]
    pub wheel_diameter_mm: u32,

    /// Default motor speed (bridge duty, 0-1000)
    #[serde(default = "default_speed")]
    pub default_speed: u16,

    /// Motor id of wheel A
    #[serde(default = "default_left_motor_id")]
    pub left_motor_id: u32,

    /// Motor id of wheel B
    #[serde(default = "default_right_motor_id")]
    pub right_motor_id: u32,

    /// Motor ids whose CW/CCW wiring is swapped on the bridge binding
    #[serde(default)]
    pub inverted: Vec<u32>,

    /// Bridge servo channel driving the tool arm
    #[serde(default = "default_arm_servo")]
    pub arm_servo: u8,

    /// Arm rest pose angle (degrees)
    #[serde(default = "default_arm_rest_angle")]
    pub arm_rest_angle: u16,
}

/// Control loop timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Guard interval after an accepted button press
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Per-tick vision frame grab bound
    #[serde(default = "default_vision_timeout_ms")]
    pub vision_timeout_ms: u64,

    #[serde(default = "default_attack_timeout_ms")]
    pub attack_timeout_ms: u64,

    #[serde(default = "default_kill_timeout_ms")]
    pub kill_timeout_ms: u64,

    /// Seed for rotation jitter (0 = entropy)
    #[serde(default)]
    pub random_seed: u64,
}

/// Rotation calibration bounds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CalibrationConfig {
    #[serde(default = "default_frame_timeout_ms")]
    pub root_frame_timeout_ms: u64,

    #[serde(default = "default_frame_timeout_ms")]
    pub sample_timeout_ms: u64,

    /// Wait after starting the spin before the first sample
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Hard deadline for a single attempt
    #[serde(default = "default_max_window_ms")]
    pub max_window_ms: u64,

    #[serde(default = "default_threshold_step")]
    pub threshold_step: f64,

    /// Full-turn duration used when calibration fails
    #[serde(default = "default_fallback_rotation_ms")]
    pub fallback_rotation_ms: u64,
}

/// Message-bus transport settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BusConfig {
    /// Motor daemon address (`host:port`)
    #[serde(default = "default_bus_address")]
    pub address: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Button identifier on the distributed deployment.
    ///
    /// Informational only: the bus binding carries motors, so the `bus`
    /// device reports this id at startup and polls the scripted button.
    #[serde(default = "default_button_id")]
    pub button_id: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Simulated robot parameters (mock device)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,

    #[serde(default = "default_frame_height")]
    pub frame_height: u32,

    /// Camera frame rate
    #[serde(default = "default_frame_rate_hz")]
    pub frame_rate_hz: f64,

    /// Horizontal field of view of the simulated camera
    #[serde(default = "default_field_of_view_deg")]
    pub field_of_view_deg: f64,

    /// Chassis yaw rate while spinning in place
    #[serde(default = "default_degrees_per_second")]
    pub degrees_per_second: f64,

    /// Encoder ticks per wheel rotation reported after the first full wheel turn
    #[serde(default = "default_sim_ticks_per_rotation")]
    pub ticks_per_rotation: u32,

    /// Wheel rotation rate while a motor runs
    #[serde(default = "default_rotations_per_second")]
    pub rotations_per_second: f64,

    /// Per-sample pixel noise standard deviation (0-255 scale)
    #[serde(default)]
    pub noise_stddev: f64,

    /// Noise seed (0 = entropy)
    #[serde(default)]
    pub random_seed: u64,

    /// Scripted button presses, in ms after the first button poll
    #[serde(default)]
    pub press_at_ms: Vec<u64>,
}

// Default value functions
fn default_device_type() -> String {
    "mock".to_string()
}
fn default_wheel_diameter_mm() -> u32 {
    65
}
fn default_speed() -> u16 {
    1000
}
fn default_left_motor_id() -> u32 {
    1
}
fn default_right_motor_id() -> u32 {
    2
}
fn default_arm_servo() -> u8 {
    1
}
fn default_arm_rest_angle() -> u16 {
    90
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_debounce_ms() -> u64 {
    1000
}
fn default_vision_timeout_ms() -> u64 {
    50
}
fn default_attack_timeout_ms() -> u64 {
    5000
}
fn default_kill_timeout_ms() -> u64 {
    3000
}
fn default_frame_timeout_ms() -> u64 {
    100
}
fn default_settle_ms() -> u64 {
    500
}
fn default_max_window_ms() -> u64 {
    10_000
}
fn default_threshold_step() -> f64 {
    0.1
}
fn default_fallback_rotation_ms() -> u64 {
    5000
}
fn default_bus_address() -> String {
    "127.0.0.1:5672".to_string()
}
fn default_connect_timeout_ms() -> u64 {
    3000
}
fn default_button_id() -> String {
    "P9_22".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_frame_width() -> u32 {
    64
}
fn default_frame_height() -> u32 {
    16
}
fn default_frame_rate_hz() -> f64 {
    30.0
}
fn default_field_of_view_deg() -> f64 {
    60.0
}
fn default_degrees_per_second() -> f64 {
    90.0
}
fn default_sim_ticks_per_rotation() -> u32 {
    360
}
fn default_rotations_per_second() -> f64 {
    1.5
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_type: default_device_type(),
        }
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            wheel_diameter_mm: default_wheel_diameter_mm(),
            default_speed: default_speed(),
            left_motor_id: default_left_motor_id(),
            right_motor_id: default_right_motor_id(),
            inverted: Vec::new(),
            arm_servo: default_arm_servo(),
            arm_rest_angle: default_arm_rest_angle(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            debounce_ms: default_debounce_ms(),
            vision_timeout_ms: default_vision_timeout_ms(),
            attack_timeout_ms: default_attack_timeout_ms(),
            kill_timeout_ms: default_kill_timeout_ms(),
            random_seed: 0,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            root_frame_timeout_ms: default_frame_timeout_ms(),
            sample_timeout_ms: default_frame_timeout_ms(),
            settle_ms: default_settle_ms(),
            max_window_ms: default_max_window_ms(),
            threshold_step: default_threshold_step(),
            fallback_rotation_ms: default_fallback_rotation_ms(),
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            address: default_bus_address(),
            connect_timeout_ms: default_connect_timeout_ms(),
            button_id: default_button_id(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            frame_rate_hz: default_frame_rate_hz(),
            field_of_view_deg: default_field_of_view_deg(),
            degrees_per_second: default_degrees_per_second(),
            ticks_per_rotation: default_sim_ticks_per_rotation(),
            rotations_per_second: default_rotations_per_second(),
            noise_stddev: 0.0,
            random_seed: 0,
            press_at_ms: Vec::new(),
        }
    }
}

impl ControllerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn vision_timeout(&self) -> Duration {
        Duration::from_millis(self.vision_timeout_ms)
    }

    pub fn attack_timeout(&self) -> Duration {
        Duration::from_millis(self.attack_timeout_ms)
    }

    pub fn kill_timeout(&self) -> Duration {
        Duration::from_millis(self.kill_timeout_ms)
    }
}

impl CalibrationConfig {
    pub fn root_frame_timeout(&self) -> Duration {
        Duration::from_millis(self.root_frame_timeout_ms)
    }

    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn max_window(&self) -> Duration {
        Duration::from_millis(self.max_window_ms)
    }

    pub fn fallback_rotation(&self) -> Duration {
        Duration::from_millis(self.fallback_rotation_ms)
    }
}

impl OonConfig {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use oon::config::OonConfig;
    ///
    /// let config = OonConfig::from_file("oon.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: OonConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the controller cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.robot.wheel_diameter_mm == 0 {
            return Err(Error::Config("robot.wheel_diameter_mm must be > 0".into()));
        }
        if self.robot.left_motor_id == self.robot.right_motor_id {
            return Err(Error::Config(format!(
                "robot.left_motor_id and robot.right_motor_id are both {}",
                self.robot.left_motor_id
            )));
        }
        let step = self.calibration.threshold_step;
        if !(step > 0.0 && step <= 1.0) {
            return Err(Error::Config(format!(
                "calibration.threshold_step must be in (0, 1], got {}",
                step
            )));
        }
        if self.calibration.fallback_rotation_ms == 0 {
            return Err(Error::Config(
                "calibration.fallback_rotation_ms must be > 0".into(),
            ));
        }
        if self.controller.poll_interval_ms == 0 {
            return Err(Error::Config("controller.poll_interval_ms must be > 0".into()));
        }
        Ok(())
    }
}
