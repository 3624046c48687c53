//! Frame comparison and target classification

pub mod classifier;
pub mod diff;

pub use classifier::ClearPathClassifier;
pub use diff::frame_diff;
