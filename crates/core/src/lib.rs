//! Core types, configuration, and statistics for the axiom prediction engine.

pub mod config;
pub mod config_loader;
pub mod error;
pub mod prediction;
pub mod repository;
pub mod signal;
pub mod types;
pub mod validation;

pub use config::{
    AppConfig, BacktestSettings, DataConfig, FlagRuleConfig, MinSamples, ModelProfile,
    ProjectionConfig, SeasonSpan, SourceWeights, TierBasis, TierTableConfig, TierThreshold,
};
pub use config_loader::ConfigLoader;
pub use error::{EngineError, EngineResult};
pub use prediction::{
    Contribution, DroppedSource, Edge, FlagContribution, FlagScore, OutcomeRecord, Prediction,
    Projection, ProjectionSource, Tier,
};
pub use repository::{OutcomeSource, PredictionContext, ResultLedger, StatRepository};
pub use signal::{SignalContext, SignalEvaluator, SignalKind, SignalReading};
pub use types::{
    combo_components, position_stat, round_to, BetResult, Fixture, MarketLine, MarketType,
    PickSide, SampleWindow, Side, StatRecord,
};
pub use validation::{binomial_test, wilson_ci, HitRateStats};
