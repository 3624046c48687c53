//! Behavior controller: states, transitions and the control loop

mod controller;
mod debounce;
mod events;
mod state;
mod timer;

pub use controller::{Brain, BrainDevices, jittered_rotation};
pub use debounce::Debouncer;
pub use events::BrainEvent;
pub use state::BehaviorState;
pub use timer::RotateTimer;
