//! Default target classifier

use crate::core::driver::TargetClassifier;
use crate::core::types::{Classification, Frame};

/// Classifier that never sees anything.
///
/// Keeps the robot patrolling in Seek until a real recognizer is injected.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClearPathClassifier;

impl TargetClassifier for ClearPathClassifier {
    fn classify(&mut self, _frame: &Frame) -> Classification {
        Classification::Clear
    }
}
