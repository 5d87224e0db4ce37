//! Derived prediction types.
//!
//! Projections, edges, flag scores, and tiers are recomputed for every
//! request and never mutated afterwards. `OutcomeRecord` is appended once,
//! after the event completes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BetResult, Fixture, MarketType, PickSide};

/// Tolerance used when checking that blend weights sum to one.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Ordered confidence bucket. Declaration order is the total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Skip,
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    /// All tiers, highest first.
    pub const DESCENDING: [Tier; 4] = [Tier::Platinum, Tier::Gold, Tier::Silver, Tier::Skip];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "SKIP",
            Self::Silver => "SILVER",
            Self::Gold => "GOLD",
            Self::Platinum => "PLATINUM",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SKIP" => Ok(Self::Skip),
            "SILVER" => Ok(Self::Silver),
            "GOLD" => Ok(Self::Gold),
            "PLATINUM" => Ok(Self::Platinum),
            other => Err(format!("unknown tier '{other}'")),
        }
    }
}

/// Named inputs blended into a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionSource {
    /// Average over the most recent games.
    RecentForm,
    /// Season-to-date average.
    SeasonAvg,
    /// Historical average against the current opponent.
    VsOpponentAvg,
    /// Season average shifted by the opponent's allowed-vs-average adjustment.
    MatchupAdjustment,
}

impl ProjectionSource {
    /// Sources in blend order.
    pub const ALL: [ProjectionSource; 4] = [
        ProjectionSource::RecentForm,
        ProjectionSource::SeasonAvg,
        ProjectionSource::VsOpponentAvg,
        ProjectionSource::MatchupAdjustment,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RecentForm => "recent_form",
            Self::SeasonAvg => "season_avg",
            Self::VsOpponentAvg => "vs_opponent_avg",
            Self::MatchupAdjustment => "matchup_adjustment",
        }
    }
}

impl fmt::Display for ProjectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One source's share of a projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub source: ProjectionSource,
    /// Configured weight before redistribution.
    pub base_weight: f64,
    /// Weight actually applied.
    pub weight: f64,
    pub value: f64,
    /// Observations behind `value`.
    pub samples: usize,
}

/// A configured source that could not be used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedSource {
    pub source: ProjectionSource,
    pub base_weight: f64,
    pub reason: String,
}

/// Weighted blend of source values for one entity and statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub entity_id: String,
    pub stat: String,
    pub value: f64,
    pub contributions: Vec<Contribution>,
    #[serde(default)]
    pub dropped: Vec<DroppedSource>,
}

impl Projection {
    /// Sum of applied weights. Equals 1.0 within `WEIGHT_TOLERANCE`.
    #[must_use]
    pub fn weight_sum(&self) -> f64 {
        self.contributions.iter().map(|c| c.weight).sum()
    }

    /// Returns the contribution for a source, if it was used.
    #[must_use]
    pub fn contribution(&self, source: ProjectionSource) -> Option<&Contribution> {
        self.contributions.iter().find(|c| c.source == source)
    }

    /// Flips the sign of the projection and every source value.
    ///
    /// Used to express a projected home margin as a home-perspective spread.
    #[must_use]
    pub fn negated(mut self) -> Self {
        self.value = -self.value;
        for c in &mut self.contributions {
            c.value = -c.value;
        }
        self
    }
}

/// Projection compared against a market line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub entity_id: String,
    pub market: MarketType,
    pub projection: f64,
    pub line: f64,
    /// `projection - line` for every market.
    pub raw_edge: f64,
    /// Edge oriented toward the home side for spreads (`line - projection`)
    /// and toward the over otherwise (`projection - line`).
    pub directional_edge: f64,
    /// `raw_edge / |line| * 100`, zero when the line is zero.
    pub edge_pct: f64,
    pub pick: Option<PickSide>,
}

/// One named signal's part in a flag score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagContribution {
    pub signal: String,
    /// Category the rule matches, for categorical signals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// What the evaluator returned, rendered for display.
    pub reading: String,
    pub fired: bool,
    /// Configured point value.
    pub points: u32,
}

impl FlagContribution {
    /// Points this contribution adds to the total.
    #[must_use]
    pub fn awarded(&self) -> u32 {
        if self.fired {
            self.points
        } else {
            0
        }
    }
}

/// Composite score: arithmetic sum of awarded points.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlagScore {
    pub contributions: Vec<FlagContribution>,
    pub total: u32,
}

impl FlagScore {
    /// Builds a score from contributions, summing awarded points.
    #[must_use]
    pub fn from_contributions(contributions: Vec<FlagContribution>) -> Self {
        let total = contributions.iter().map(FlagContribution::awarded).sum();
        Self {
            contributions,
            total,
        }
    }

    /// Names of signals that fired.
    #[must_use]
    pub fn fired(&self) -> Vec<&str> {
        self.contributions
            .iter()
            .filter(|c| c.fired)
            .map(|c| c.signal.as_str())
            .collect()
    }
}

/// Full scored prediction for one fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub fixture: Fixture,
    pub as_of: DateTime<Utc>,
    pub projection: Projection,
    pub edge: Edge,
    pub flag_score: FlagScore,
    /// Value the tier was classified from (flag score or |edge %|).
    pub tier_score: f64,
    pub tier: Tier,
}

impl Prediction {
    #[must_use]
    pub fn pick(&self) -> Option<PickSide> {
        self.edge.pick
    }

    /// True when the prediction is actionable (a pick above the lowest tier).
    #[must_use]
    pub fn is_actionable(&self) -> bool {
        self.edge.pick.is_some() && self.tier > Tier::Skip
    }
}

/// A graded pick. Written once after the event completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub entity_id: String,
    pub market: MarketType,
    pub date: NaiveDate,
    pub tier: Tier,
    pub pick: PickSide,
    pub line: f64,
    /// Realized statistic; realized home margin for spreads.
    pub actual: f64,
    pub result: BetResult,
    /// Last line quoted for the event, when one was captured.
    #[serde(default)]
    pub closing_line: Option<f64>,
    /// Closing line value in points; positive when the close moved toward the pick.
    #[serde(default)]
    pub clv: Option<f64>,
}

impl OutcomeRecord {
    /// Grades a prediction against the realized value.
    ///
    /// Returns `None` when the prediction backed no side.
    #[must_use]
    pub fn settle(prediction: &Prediction, actual: f64) -> Option<Self> {
        let pick = prediction.edge.pick?;
        let fixture = &prediction.fixture;
        Some(Self {
            entity_id: fixture.entity_id.clone(),
            market: fixture.market,
            date: fixture.date,
            tier: prediction.tier,
            pick,
            line: prediction.edge.line,
            actual,
            result: fixture.market.grade(pick, prediction.edge.line, actual),
            closing_line: None,
            clv: None,
        })
    }

    /// Records the closing line and the value the pick gained or lost against it.
    #[must_use]
    pub fn with_closing_line(mut self, closing: Option<f64>) -> Self {
        self.closing_line = closing.filter(|c| c.is_finite());
        self.clv = self
            .closing_line
            .map(|c| self.market.closing_line_value(self.pick, self.line, c));
        self
    }

    /// Key used to de-duplicate ledger entries.
    #[must_use]
    pub fn key(&self) -> (NaiveDate, &str, MarketType) {
        (self.date, self.entity_id.as_str(), self.market)
    }
}
