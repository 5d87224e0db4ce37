//! Projection, edge, and the per-entity prediction pipeline.

pub mod edge;
pub mod facts;
pub mod history;
pub mod pipeline;
pub mod projection;

pub use edge::EdgeCalculator;
pub use facts::FactBuilder;
pub use history::GameLog;
pub use pipeline::{BatchResult, Predictor, SkippedEntity};
pub use projection::{ProjectionEngine, SourceEstimate, SourceOutcome};
