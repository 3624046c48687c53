//! Wheel motion commands
//!
//! - [`TicksPerRotation`]: live encoder calibration shared with the feedback thread
//! - [`MotionProtocol`]: distance-to-tick conversion and paired wheel commands

pub mod protocol;
pub mod ticks;

pub use protocol::{MotionProtocol, MotorOutcome, PairedOutcome};
pub use ticks::TicksPerRotation;
