//! Oon - behavior controller for an autonomous ground robot
//!
//! The robot patrols (Seek), turns away from obstacles (Rotate), closes in on
//! a target (Attack) and acts on it (Kill). Rotation time is self-calibrated
//! at startup from live camera frames.
//!
//! ## Device types
//!
//! - `mock`: simulated robot, camera and button for hardware-free runs
//! - `bridge-sim`: simulated wheels driven through the H-bridge driver
//! - `bus`: wheel motors driven through a message-bus motor daemon

pub mod brain;
pub mod calibration;
pub mod config;
pub mod core;
pub mod devices;
pub mod error;
pub mod feedback;
pub mod motion;
pub mod vision;

// Re-export commonly used types
pub use config::OonConfig;
pub use error::{Error, Result};
