//! Rotation calibration against the simulated robot
//!
//! The simulated chassis turns at a known rate, so a successful calibration
//! must land close to `360 / degrees_per_second` seconds.
//!
//! Run with: `cargo test --test calibration`

use oon::calibration::RotationCalibrator;
use oon::config::{CalibrationConfig, RobotConfig, SimulationConfig};
use oon::core::{MotorActuator, Shutdown};
use oon::devices::mock::SimRobot;
use oon::motion::{MotionProtocol, TicksPerRotation};
use std::time::{Duration, Instant};

// ============================================================================
// Test Configuration
// ============================================================================

/// Half a turn per second, frames on demand
fn fast_simulation() -> SimulationConfig {
    SimulationConfig {
        degrees_per_second: 180.0,
        frame_rate_hz: 0.0,
        ..SimulationConfig::default()
    }
}

fn fast_calibration() -> CalibrationConfig {
    CalibrationConfig {
        settle_ms: 300,
        max_window_ms: 3000,
        fallback_rotation_ms: 7000,
        ..CalibrationConfig::default()
    }
}

fn motion_for(actuator: impl MotorActuator + 'static, robot: &RobotConfig) -> MotionProtocol {
    let mut motion = MotionProtocol::new(Box::new(actuator), robot, TicksPerRotation::new());
    motion.set_speed(robot.default_speed);
    motion
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_calibrates_full_turn_duration() {
    let robot = RobotConfig::default();
    let mut sim = SimRobot::start(&fast_simulation(), &robot).unwrap();
    let mut motion = motion_for(sim.actuator(), &robot);
    let mut camera = sim.camera();

    let calibrator = RotationCalibrator::new(fast_calibration());
    let (duration, success) = calibrator.calibrate_rotation(&mut motion, &mut camera, &Shutdown::new());

    assert!(success, "calibration fell back to {:?}", duration);
    assert!(
        duration > Duration::from_millis(1800) && duration < Duration::from_millis(2200),
        "full turn measured as {:?}",
        duration
    );

    let world = sim.world();
    let world = world.lock();
    assert_eq!(world.direction(robot.left_motor_id), Some(0));
    assert_eq!(world.direction(robot.right_motor_id), Some(0));
    drop(world);
    sim.stop();
}

#[test]
fn test_stationary_view_matches_first_relaxed_level() {
    let robot = RobotConfig::default();
    let simulation = SimulationConfig {
        degrees_per_second: 0.0,
        frame_rate_hz: 0.0,
        ..SimulationConfig::default()
    };
    let mut sim = SimRobot::start(&simulation, &robot).unwrap();
    let mut motion = motion_for(sim.actuator(), &robot);
    let mut camera = sim.camera();

    // A view that never changes matches every level below 1.0 at once
    let calibrator = RotationCalibrator::new(CalibrationConfig {
        settle_ms: 10,
        max_window_ms: 50,
        threshold_step: 0.5,
        ..fast_calibration()
    });
    let (duration, success) = calibrator.calibrate_rotation(&mut motion, &mut camera, &Shutdown::new());

    assert!(success);
    assert!(duration < Duration::from_millis(300), "{:?}", duration);
    sim.stop();
}

#[test]
fn test_shutdown_aborts_with_fallback() {
    let robot = RobotConfig::default();
    let mut sim = SimRobot::start(&fast_simulation(), &robot).unwrap();
    let mut motion = motion_for(sim.actuator(), &robot);
    let mut camera = sim.camera();

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(500));
        trigger.trigger();
    });

    let start = Instant::now();
    let calibrator = RotationCalibrator::new(fast_calibration());
    let (duration, success) = calibrator.calibrate_rotation(&mut motion, &mut camera, &shutdown);
    handle.join().unwrap();

    assert!(!success);
    assert_eq!(duration, Duration::from_millis(7000));
    assert!(start.elapsed() < Duration::from_secs(2));

    let world = sim.world();
    assert_eq!(world.lock().direction(robot.left_motor_id), Some(0));
    sim.stop();
}
