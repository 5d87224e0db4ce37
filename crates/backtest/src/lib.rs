//! Point-in-time replay of the prediction pipeline and per-tier validation.

pub mod harness;
pub mod pit;
pub mod report;

pub use harness::{BacktestHarness, BacktestRun};
pub use pit::{decision_instant, PointInTimeView};
pub use report::{BacktestReport, SkippedDate, TierReport, TierTally};
