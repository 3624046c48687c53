//! Error types for Oon

use crate::brain::BehaviorState;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Oon error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Camera, actuator or button failed to come up. Fatal at startup.
    #[error("Hardware initialization failed: {0}")]
    HardwareInit(String),

    /// No frame arrived within the grab bound
    #[error("Frame grab timed out")]
    FrameTimeout,

    /// Every calibration threshold step failed
    #[error("Rotation calibration exhausted all thresholds")]
    CalibrationExhausted,

    /// Motor command could not be delivered
    #[error("Command send failed for motor {motor}: {reason}")]
    CommandSend {
        /// Addressed motor
        motor: u32,
        /// Transport or driver message
        reason: String,
    },

    /// Frames of different sizes were compared
    #[error("Frame dimension mismatch: {left:?} vs {right:?}")]
    DimensionMismatch {
        /// (width, height) of the first frame
        left: (u32, u32),
        /// (width, height) of the second frame
        right: (u32, u32),
    },

    /// State change outside the transition table
    #[error("Invalid transition {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current state
        from: BehaviorState,
        /// Requested state
        to: BehaviorState,
    },

    /// Operation not supported by this binding
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Malformed bus frame or payload
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Shutdown observed during a blocking operation
    #[error("Cancelled by shutdown request")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
