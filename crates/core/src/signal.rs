//! Signal evaluation types.
//!
//! Signals are plain functions from a [`SignalContext`] to a
//! [`SignalReading`]. They are registered by name with a point value and
//! resolved from configuration; the scorer has no knowledge of what any
//! individual signal means.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{MarketType, PickSide, Side};

/// Well-known fact keys populated by the prediction pipeline.
pub mod facts {
    /// Latest injury adjustment for the entity, in stat units.
    pub const INJURY_ADJUSTMENT: &str = "injury_adjustment";
    /// 1.0 when the entity played the previous day.
    pub const ENTITY_BACK_TO_BACK: &str = "entity_back_to_back";
    /// 1.0 when the opponent played the previous day.
    pub const OPPONENT_BACK_TO_BACK: &str = "opponent_back_to_back";
    /// Games the vs-opponent average is based on.
    pub const VS_OPPONENT_GAMES: &str = "vs_opponent_games";
    /// Mean of the target stat over the recent window.
    pub const RECENT_MEAN: &str = "recent_mean";
    /// Sample standard deviation of the target stat over the recent window.
    pub const RECENT_STD_DEV: &str = "recent_std_dev";
    /// Average minutes over the recent window.
    pub const AVG_MINUTES: &str = "avg_minutes";
    /// Games in the season-to-date window.
    pub const SEASON_GAMES: &str = "season_games";
}

/// Shape of a signal's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Boolean,
    Categorical,
}

/// Output of a signal evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalReading {
    Flag(bool),
    Category(String),
}

impl SignalReading {
    #[must_use]
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::Flag(_) => SignalKind::Boolean,
            Self::Category(_) => SignalKind::Categorical,
        }
    }
}

impl fmt::Display for SignalReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(b) => write!(f, "{b}"),
            Self::Category(c) => f.write_str(c),
        }
    }
}

/// Everything a signal may look at for one fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalContext {
    pub entity_id: String,
    pub opponent_id: String,
    pub date: NaiveDate,
    pub market: MarketType,
    pub side: Side,
    /// Projection in line notation.
    pub projection: f64,
    pub line: f64,
    pub raw_edge: f64,
    pub edge_pct: f64,
    pub pick: Option<PickSide>,
    #[serde(default)]
    pub facts: BTreeMap<String, f64>,
}

impl SignalContext {
    /// Returns a fact by key.
    #[must_use]
    pub fn fact(&self, key: &str) -> Option<f64> {
        self.facts.get(key).copied()
    }

    /// Returns true when a 0/1 fact is set.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.fact(key).is_some_and(|v| v != 0.0)
    }

    /// Edge in the market's favorable direction: `line - projection` for
    /// spreads (positive favors home), `raw_edge` otherwise.
    #[must_use]
    pub fn directional_edge(&self) -> f64 {
        match self.market {
            MarketType::Spread => -self.raw_edge,
            MarketType::Total | MarketType::PlayerProp => self.raw_edge,
        }
    }

    /// Adds a fact.
    #[must_use]
    pub fn with_fact(mut self, key: impl Into<String>, value: f64) -> Self {
        self.facts.insert(key.into(), value);
        self
    }
}

/// Pure evaluator signature.
pub type SignalEvaluator = fn(&SignalContext) -> SignalReading;

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> SignalContext {
        SignalContext {
            entity_id: "BOS".into(),
            opponent_id: "NYK".into(),
            date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            market: MarketType::Spread,
            side: Side::Home,
            projection: -2.0,
            line: -1.5,
            raw_edge: -0.5,
            edge_pct: -33.3,
            pick: Some(PickSide::Home),
            facts: BTreeMap::new(),
        }
    }

    #[test]
    fn flag_reads_nonzero_facts() {
        let ctx = context()
            .with_fact(facts::ENTITY_BACK_TO_BACK, 1.0)
            .with_fact(facts::OPPONENT_BACK_TO_BACK, 0.0);
        assert!(ctx.flag(facts::ENTITY_BACK_TO_BACK));
        assert!(!ctx.flag(facts::OPPONENT_BACK_TO_BACK));
        assert!(!ctx.flag(facts::INJURY_ADJUSTMENT));
    }

    #[test]
    fn reading_kind_matches_variant() {
        assert_eq!(SignalReading::Flag(true).kind(), SignalKind::Boolean);
        assert_eq!(
            SignalReading::Category("strong".into()).kind(),
            SignalKind::Categorical
        );
        assert_eq!(SignalReading::Category("good".into()).to_string(), "good");
    }
}
