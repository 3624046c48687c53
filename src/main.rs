//! Oon - robot behavior controller daemon
//!
//! Loads the configuration, creates the robot devices, calibrates the
//! rotation time and runs the Seek/Rotate/Attack/Kill loop until SIGINT or
//! SIGTERM.

use oon::brain::{Brain, BrainDevices};
use oon::core::Shutdown;
use oon::devices::{Robot, create_robot};
use oon::feedback::FeedbackListener;
use oon::motion::{MotionProtocol, TicksPerRotation};
use oon::vision::ClearPathClassifier;
use oon::{OonConfig, Result};
use std::env;
use std::path::Path;

/// Command line options
#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    config_path: String,
    /// Write the effective configuration here and exit
    write_config: Option<String>,
}

/// Parse command line arguments (without the program name).
///
/// Supports:
/// - `oon <path>` (positional)
/// - `oon --config <path>` (flag-based)
/// - `oon -c <path>` (short flag)
/// - `oon --write-config <out>` (dump effective config, then exit)
///
/// Defaults to `/etc/oon.toml` if not specified.
fn parse_args(args: &[String]) -> CliArgs {
    let flag_value = |names: &[&str]| {
        args.windows(2)
            .find(|pair| names.contains(&pair[0].as_str()))
            .map(|pair| pair[1].clone())
    };

    let config_path = flag_value(&["--config", "-c"])
        .or_else(|| args.first().filter(|a| !a.starts_with('-')).cloned())
        .unwrap_or_else(|| "/etc/oon.toml".to_string());

    CliArgs {
        config_path,
        write_config: flag_value(&["--write-config"]),
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let CliArgs {
        config_path,
        write_config,
    } = parse_args(&args);
    let missing = !Path::new(&config_path).exists();
    let config = if missing {
        OonConfig::default()
    } else {
        OonConfig::from_file(&config_path)?
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("Oon v{} starting...", env!("CARGO_PKG_VERSION"));
    if missing {
        log::warn!("Config {} not found, using defaults", config_path);
    } else {
        log::info!("Using config: {}", config_path);
    }

    if let Some(out) = write_config {
        config.to_file(&out)?;
        log::info!("Wrote effective config to {}", out);
        return Ok(());
    }
    log::info!("Device: {}", config.device.device_type);

    let shutdown = Shutdown::new();
    shutdown.install_signal_handler()?;

    let Robot {
        actuator,
        camera,
        button,
        arm,
        feedback,
        mut threads,
    } = create_robot(&config, &shutdown)?;
    let ticks = TicksPerRotation::new();
    let motion = MotionProtocol::new(actuator, &config.robot, ticks.clone());

    let devices = BrainDevices {
        camera,
        button,
        classifier: Box::new(ClearPathClassifier),
        arm,
    };
    let mut brain = Brain::new(&config, motion, devices, shutdown.clone());

    let mut listener = FeedbackListener::spawn(
        feedback,
        ticks,
        brain.events_sender(),
        shutdown.clone(),
    )?;

    let result = brain.run();

    listener.stop();
    drop(brain);
    threads.close();

    log::info!("Oon stopped");
    result
}
