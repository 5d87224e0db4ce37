//! Signal registry, flag scoring, and tier classification.

pub mod catalog;
pub mod registry;
pub mod scorer;
pub mod tier;

pub use registry::{SignalDefinition, SignalRegistry};
pub use scorer::FlagScorer;
pub use tier::TierClassifier;
