//! Core types and collaborator traits

pub mod driver;
pub mod shutdown;
pub mod types;

pub use driver::{ArmActuator, ButtonInput, Camera, MotorActuator, NoArm, TargetClassifier};
pub use shutdown::Shutdown;
pub use types::{Classification, CommandKind, FeedbackEvent, Frame, MotorCommand, MotorId};
