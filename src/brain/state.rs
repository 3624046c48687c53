//! Behavior states and the transition table

use std::fmt;

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviorState {
    /// Stopped, arm at rest, waiting for the operator
    Idle,
    /// Patrolling straight ahead
    Seek,
    /// Turning away from an obstacle for a jittered half turn or more
    Rotate,
    /// Closing in on a target
    Attack,
    /// Acting on a confirmed target
    Kill,
}

impl BehaviorState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Seek => "Seek",
            Self::Rotate => "Rotate",
            Self::Attack => "Attack",
            Self::Kill => "Kill",
        }
    }

    /// Whether `self -> to` is in the transition table
    pub fn can_transition_to(self, to: BehaviorState) -> bool {
        use BehaviorState::*;
        matches!(
            (self, to),
            (Idle, Seek)
                | (Seek, Idle)
                | (Seek, Rotate)
                | (Seek, Attack)
                | (Rotate, Seek)
                | (Attack, Kill)
                | (Attack, Seek)
                | (Kill, Seek)
        )
    }
}

impl fmt::Display for BehaviorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
