//! Behavior controller driven against the simulated robot
//!
//! Scenarios:
//! - Operator press starts the patrol, obstacle triggers a timed rotation
//! - Full control loop with calibration, terminated by shutdown
//! - Shipped configuration: the scripted press starts the patrol
//!
//! Run with: `cargo test --test behavior`

use oon::brain::{BehaviorState, Brain, BrainDevices};
use oon::config::OonConfig;
use oon::core::{Classification, NoArm, Shutdown};
use oon::devices::mock::{CountingArm, ManualButton, ScriptedClassifier, SimRobot};
use oon::motion::{MotionProtocol, TicksPerRotation};
use oon::vision::ClearPathClassifier;
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// Test Configuration
// ============================================================================

fn fast_config() -> OonConfig {
    let mut config = OonConfig::default();
    config.controller.poll_interval_ms = 10;
    config.controller.debounce_ms = 100;
    config.controller.random_seed = 3;
    config.calibration.settle_ms = 300;
    config.calibration.max_window_ms = 3000;
    config.simulation.degrees_per_second = 180.0;
    config.simulation.frame_rate_hz = 0.0;
    config
}

struct Harness {
    sim: SimRobot,
    brain: Brain,
    button: ManualButton,
    classifier: ScriptedClassifier,
    arm: CountingArm,
}

fn harness(config: &OonConfig, shutdown: Shutdown) -> Harness {
    let sim = SimRobot::start(&config.simulation, &config.robot).unwrap();
    let motion = MotionProtocol::new(
        Box::new(sim.actuator()),
        &config.robot,
        TicksPerRotation::new(),
    );
    let button = ManualButton::new();
    let classifier = ScriptedClassifier::new();
    let arm = CountingArm::new();
    let devices = BrainDevices {
        camera: Box::new(sim.camera()),
        button: Box::new(button.clone()),
        classifier: Box::new(classifier.clone()),
        arm: Box::new(arm.clone()),
    };
    let brain = Brain::new(config, motion, devices, shutdown);
    Harness {
        sim,
        brain,
        button,
        classifier,
        arm,
    }
}

fn wheel_directions(h: &Harness, config: &OonConfig) -> (Option<i8>, Option<i8>) {
    let world = h.sim.world();
    let world = world.lock();
    (
        world.direction(config.robot.left_motor_id),
        world.direction(config.robot.right_motor_id),
    )
}

fn step_until(h: &mut Harness, state: BehaviorState, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        h.brain.step(Instant::now()).unwrap();
        if h.brain.state() == state {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_patrol_rotates_away_from_obstacle() {
    let config = fast_config();
    let mut h = harness(&config, Shutdown::new());
    h.brain.initialize();
    h.brain.set_rotation_duration(Duration::from_millis(400));
    assert_eq!(h.arm.rest_count(), 1);
    assert_eq!(wheel_directions(&h, &config), (Some(0), Some(0)));

    h.button.press();
    h.brain.step(Instant::now()).unwrap();
    assert_eq!(h.brain.state(), BehaviorState::Seek);
    assert_eq!(wheel_directions(&h, &config), (Some(1), Some(1)));

    let heading_before = h.sim.world().lock().heading();
    h.classifier.set(Classification::Obstacle);
    h.brain.step(Instant::now()).unwrap();
    assert_eq!(h.brain.state(), BehaviorState::Rotate);
    assert_eq!(wheel_directions(&h, &config), (Some(1), Some(-1)));

    h.classifier.set(Classification::Clear);
    assert!(step_until(&mut h, BehaviorState::Seek, Duration::from_secs(2)));
    assert_eq!(wheel_directions(&h, &config), (Some(1), Some(1)));

    // 200..400 ms at 180 deg/s
    let turned = (h.sim.world().lock().heading() - heading_before).rem_euclid(360.0);
    assert!(turned > 25.0 && turned < 90.0, "turned {} deg", turned);

    h.brain.stop();
    assert_eq!(wheel_directions(&h, &config), (Some(0), Some(0)));
    h.sim.stop();
}

#[test]
fn test_target_engagement_returns_to_patrol() {
    let mut config = fast_config();
    config.controller.attack_timeout_ms = 200;
    let mut h = harness(&config, Shutdown::new());
    h.brain.initialize();

    h.button.press();
    h.brain.step(Instant::now()).unwrap();
    h.classifier.set(Classification::Actionable);
    h.brain.step(Instant::now()).unwrap();
    assert_eq!(h.brain.state(), BehaviorState::Attack);
    // Seek exit stops the wheels; Attack leaves them alone
    assert_eq!(wheel_directions(&h, &config), (Some(0), Some(0)));

    h.brain.step(Instant::now()).unwrap();
    assert_eq!(h.brain.state(), BehaviorState::Kill);

    h.classifier.set(Classification::Clear);
    h.brain.step(Instant::now()).unwrap();
    assert_eq!(h.brain.state(), BehaviorState::Seek);
    assert_eq!(h.arm.rest_count(), 2);

    // Target glimpsed, then lost: attack times out
    h.classifier.set(Classification::Actionable);
    h.brain.step(Instant::now()).unwrap();
    assert_eq!(h.brain.state(), BehaviorState::Attack);
    h.classifier.set(Classification::Clear);
    assert!(step_until(&mut h, BehaviorState::Seek, Duration::from_secs(2)));
    h.sim.stop();
}

#[test]
fn test_run_calibrates_and_stops_on_shutdown() {
    let config = fast_config();
    let shutdown = Shutdown::new();
    let mut h = harness(&config, shutdown.clone());
    let button = h.button.clone();
    let world = h.sim.world();

    let mut brain = h.brain;
    let handle = thread::spawn(move || {
        let result = brain.run();
        (brain, result)
    });

    // The press stays pending until the loop polls it after calibration
    thread::sleep(Duration::from_millis(500));
    button.press();
    let deadline = Instant::now() + Duration::from_secs(15);
    let mut patrolling = false;
    while !patrolling && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
        let world = world.lock();
        patrolling = world.direction(config.robot.left_motor_id) == Some(1)
            && world.direction(config.robot.right_motor_id) == Some(1);
    }
    assert!(patrolling, "robot never started patrolling");

    shutdown.trigger();
    let (brain, result) = handle.join().unwrap();
    assert!(result.is_ok());
    assert_eq!(brain.state(), BehaviorState::Seek);
    let rotation = brain.rotation_duration();
    assert!(
        rotation > Duration::from_millis(1800) && rotation < Duration::from_millis(2200),
        "calibrated {:?}",
        rotation
    );

    let world = world.lock();
    assert_eq!(world.direction(config.robot.left_motor_id), Some(0));
    assert_eq!(world.direction(config.robot.right_motor_id), Some(0));
    drop(world);
    h.sim.stop();
}

#[test]
fn test_shipped_config_scripted_press_starts_patrol() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/oon.toml");
    let config = OonConfig::from_file(path).unwrap();
    assert!(!config.simulation.press_at_ms.is_empty());

    let mut sim = SimRobot::start(&config.simulation, &config.robot).unwrap();
    let world = sim.world();
    let motion = MotionProtocol::new(
        Box::new(sim.actuator()),
        &config.robot,
        TicksPerRotation::new(),
    );
    let devices = BrainDevices {
        camera: Box::new(sim.camera()),
        button: Box::new(sim.button()),
        classifier: Box::new(ClearPathClassifier),
        arm: Box::new(NoArm),
    };
    let shutdown = Shutdown::new();
    let mut brain = Brain::new(&config, motion, devices, shutdown.clone());
    let handle = thread::spawn(move || {
        let result = brain.run();
        (brain, result)
    });

    // Calibration outlasts the scripted offset; the press must still land
    let deadline = Instant::now() + Duration::from_secs(45);
    let mut patrolling = false;
    while !patrolling && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(50));
        let world = world.lock();
        patrolling = world.direction(config.robot.left_motor_id) == Some(1)
            && world.direction(config.robot.right_motor_id) == Some(1);
    }
    shutdown.trigger();
    let (brain, result) = handle.join().unwrap();

    assert!(patrolling, "scripted press never started the patrol");
    assert!(result.is_ok());
    assert_eq!(brain.state(), BehaviorState::Seek);
    sim.stop();
}
