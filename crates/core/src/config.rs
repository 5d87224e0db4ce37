//! Configuration types.
//!
//! One generic engine is parameterized per sport and market by a
//! [`ModelProfile`]. Each preset is a configuration instance, not a code path.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::prediction::{ProjectionSource, Tier, WEIGHT_TOLERANCE};
use crate::types::MarketType;

/// Largest supported rounding precision for derived values.
pub const MAX_PRECISION: u32 = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelProfile,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub backtest: BacktestSettings,
}

impl AppConfig {
    /// Validates every section.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` describing the first problem found.
    pub fn validate(&self) -> EngineResult<()> {
        self.model.validate()?;
        self.data.validate()?;
        self.backtest.validate()
    }
}

/// Blend weights, one per projection source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceWeights {
    pub recent_form: f64,
    pub season_avg: f64,
    pub vs_opponent_avg: f64,
    pub matchup_adjustment: f64,
}

impl SourceWeights {
    #[must_use]
    pub fn get(&self, source: ProjectionSource) -> f64 {
        match source {
            ProjectionSource::RecentForm => self.recent_form,
            ProjectionSource::SeasonAvg => self.season_avg,
            ProjectionSource::VsOpponentAvg => self.vs_opponent_avg,
            ProjectionSource::MatchupAdjustment => self.matchup_adjustment,
        }
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        ProjectionSource::ALL.iter().map(|s| self.get(*s)).sum()
    }

    /// # Errors
    /// Returns `InvalidConfiguration` if a weight is negative or not finite,
    /// or if the weights do not sum to 1.0.
    pub fn validate(&self) -> EngineResult<()> {
        for source in ProjectionSource::ALL {
            let w = self.get(source);
            if !w.is_finite() || w < 0.0 {
                return Err(EngineError::config(format!(
                    "weight for {source} must be a non-negative number, got {w}"
                )));
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(EngineError::config(format!(
                "projection weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            recent_form: 0.4,
            season_avg: 0.3,
            vs_opponent_avg: 0.2,
            matchup_adjustment: 0.1,
        }
    }
}

/// Minimum observations each source needs before it is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MinSamples {
    pub recent_form: usize,
    pub season_avg: usize,
    pub vs_opponent_avg: usize,
    pub matchup_adjustment: usize,
}

impl MinSamples {
    #[must_use]
    pub fn get(&self, source: ProjectionSource) -> usize {
        match source {
            ProjectionSource::RecentForm => self.recent_form,
            ProjectionSource::SeasonAvg => self.season_avg,
            ProjectionSource::VsOpponentAvg => self.vs_opponent_avg,
            ProjectionSource::MatchupAdjustment => self.matchup_adjustment,
        }
    }
}

impl Default for MinSamples {
    fn default() -> Self {
        Self {
            recent_form: 3,
            season_avg: 3,
            vs_opponent_avg: 3,
            matchup_adjustment: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    #[serde(default)]
    pub weights: SourceWeights,
    #[serde(default)]
    pub min_samples: MinSamples,
    /// Games in the recent-form window.
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
}

fn default_recent_window() -> usize {
    10
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            weights: SourceWeights::default(),
            min_samples: MinSamples::default(),
            recent_window: default_recent_window(),
        }
    }
}

impl ProjectionConfig {
    /// # Errors
    /// Returns `InvalidConfiguration` for bad weights or sample sizes.
    pub fn validate(&self) -> EngineResult<()> {
        self.weights.validate()?;
        for source in ProjectionSource::ALL {
            if self.min_samples.get(source) == 0 {
                return Err(EngineError::config(format!(
                    "minimum sample size for {source} must be at least 1"
                )));
            }
        }
        if self.recent_window < self.min_samples.recent_form {
            return Err(EngineError::config(format!(
                "recent_window ({}) is smaller than the recent_form minimum ({})",
                self.recent_window, self.min_samples.recent_form
            )));
        }
        Ok(())
    }
}

/// A named signal and the points it is worth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlagRuleConfig {
    pub signal: String,
    pub points: u32,
    /// Category to match, for categorical signals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<String>,
}

impl FlagRuleConfig {
    #[must_use]
    pub fn boolean(signal: &str, points: u32) -> Self {
        Self {
            signal: signal.to_string(),
            points,
            equals: None,
        }
    }

    #[must_use]
    pub fn category(signal: &str, equals: &str, points: u32) -> Self {
        Self {
            signal: signal.to_string(),
            points,
            equals: Some(equals.to_string()),
        }
    }
}

/// Which number the tier table is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierBasis {
    #[default]
    FlagScore,
    /// Absolute edge percentage.
    EdgePercent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierThreshold {
    pub tier: Tier,
    pub min_score: f64,
    /// Hit rate the tier is expected to achieve, from prior backtests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_hit_rate: Option<f64>,
}

impl TierThreshold {
    #[must_use]
    pub fn new(tier: Tier, min_score: f64) -> Self {
        Self {
            tier,
            min_score,
            expected_hit_rate: None,
        }
    }

    #[must_use]
    pub fn expecting(mut self, hit_rate: f64) -> Self {
        self.expected_hit_rate = Some(hit_rate);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTableConfig {
    #[serde(default)]
    pub basis: TierBasis,
    /// Sorted descending by `min_score`.
    pub thresholds: Vec<TierThreshold>,
}

impl TierTableConfig {
    /// # Errors
    /// Returns `InvalidConfiguration` unless both `min_score` and tier order
    /// are strictly descending down the table.
    pub fn validate(&self) -> EngineResult<()> {
        if self.thresholds.is_empty() {
            return Err(EngineError::config("tier threshold table is empty"));
        }
        for t in &self.thresholds {
            if !t.min_score.is_finite() {
                return Err(EngineError::config(format!(
                    "minimum score for {} is not a number",
                    t.tier
                )));
            }
            if let Some(rate) = t.expected_hit_rate {
                if !(0.0..=1.0).contains(&rate) {
                    return Err(EngineError::config(format!(
                        "expected hit rate for {} must be within [0, 1], got {rate}",
                        t.tier
                    )));
                }
            }
        }
        for pair in self.thresholds.windows(2) {
            let (hi, lo) = (&pair[0], &pair[1]);
            if hi.min_score <= lo.min_score {
                return Err(EngineError::config(format!(
                    "tier thresholds must strictly descend: {} ({}) is not above {} ({})",
                    hi.tier, hi.min_score, lo.tier, lo.min_score
                )));
            }
            if hi.tier <= lo.tier {
                return Err(EngineError::config(format!(
                    "tier order must descend with thresholds: {} listed above {}",
                    hi.tier, lo.tier
                )));
            }
        }
        Ok(())
    }

    /// Expected hit rate configured for a tier.
    #[must_use]
    pub fn expected_hit_rate(&self, tier: Tier) -> Option<f64> {
        self.thresholds
            .iter()
            .find(|t| t.tier == tier)
            .and_then(|t| t.expected_hit_rate)
    }
}

impl Default for TierTableConfig {
    fn default() -> Self {
        Self {
            basis: TierBasis::FlagScore,
            thresholds: vec![
                TierThreshold::new(Tier::Platinum, 8.0),
                TierThreshold::new(Tier::Gold, 5.0),
                TierThreshold::new(Tier::Silver, 3.0),
                TierThreshold::new(Tier::Skip, 0.0),
            ],
        }
    }
}

/// One sport/market configuration of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub name: String,
    pub market: MarketType,
    #[serde(default)]
    pub projection: ProjectionConfig,
    #[serde(default)]
    pub flags: Vec<FlagRuleConfig>,
    #[serde(default)]
    pub tiers: TierTableConfig,
    /// Picks with a smaller absolute edge percentage back no side.
    #[serde(default)]
    pub min_edge_pct: f64,
    /// Decimal places kept on derived values.
    #[serde(default = "default_precision")]
    pub precision: u32,
}

fn default_precision() -> u32 {
    4
}

impl Default for ModelProfile {
    fn default() -> Self {
        Self::nba_spread()
    }
}

impl ModelProfile {
    /// NBA point spreads. Only home favorites the model likes by 5+ points
    /// more than the market earn a tier:
    ///
    /// | home edge | green zone | points | tier |
    /// |---|---|---|---|
    /// | 7+ | yes | 6 | PLATINUM |
    /// | 5+ | yes | 5 | GOLD |
    /// | 5+ | no | 3 or 4 | SILVER |
    /// | under 5, or away favored | any | 0 or 2 | SKIP |
    #[must_use]
    pub fn nba_spread() -> Self {
        Self {
            name: "nba_spread".to_string(),
            market: MarketType::Spread,
            projection: ProjectionConfig::default(),
            flags: vec![
                FlagRuleConfig::category("home_edge", "plus_7", 4),
                FlagRuleConfig::category("home_edge", "plus_5", 3),
                FlagRuleConfig::boolean("green_zone", 2),
            ],
            tiers: TierTableConfig {
                basis: TierBasis::FlagScore,
                thresholds: vec![
                    TierThreshold::new(Tier::Platinum, 6.0).expecting(0.844),
                    TierThreshold::new(Tier::Gold, 5.0).expecting(0.789),
                    TierThreshold::new(Tier::Silver, 3.0).expecting(0.744),
                    TierThreshold::new(Tier::Skip, 0.0),
                ],
            },
            min_edge_pct: 0.0,
            precision: default_precision(),
        }
    }

    /// NBA player points props, scored on edge size plus supporting flags.
    #[must_use]
    pub fn nba_points_prop() -> Self {
        Self {
            name: "nba_points_prop".to_string(),
            market: MarketType::PlayerProp,
            projection: ProjectionConfig::default(),
            flags: vec![
                FlagRuleConfig::category("edge_band", "strong", 5),
                FlagRuleConfig::category("edge_band", "good", 3),
                FlagRuleConfig::category("edge_band", "marginal", 1),
                FlagRuleConfig::boolean("player_rested", 2),
                FlagRuleConfig::boolean("vs_opponent_sample", 2),
                FlagRuleConfig::boolean("consistent_performer", 1),
                FlagRuleConfig::boolean("minutes_stable", 1),
            ],
            tiers: TierTableConfig {
                basis: TierBasis::FlagScore,
                thresholds: vec![
                    TierThreshold::new(Tier::Platinum, 8.0).expecting(0.60),
                    TierThreshold::new(Tier::Gold, 5.0).expecting(0.55),
                    TierThreshold::new(Tier::Silver, 3.0),
                    TierThreshold::new(Tier::Skip, 0.0),
                ],
            },
            min_edge_pct: 5.0,
            precision: default_precision(),
        }
    }

    /// Looks up a built-in preset by name.
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "nba_spread" => Some(Self::nba_spread()),
            "nba_points_prop" => Some(Self::nba_points_prop()),
            _ => None,
        }
    }

    /// # Errors
    /// Returns `InvalidConfiguration` describing the first problem found.
    pub fn validate(&self) -> EngineResult<()> {
        self.projection.validate()?;
        self.tiers.validate()?;
        for rule in &self.flags {
            if rule.signal.trim().is_empty() {
                return Err(EngineError::config("flag rule with empty signal name"));
            }
            if rule.equals.as_deref().is_some_and(|c| c.trim().is_empty()) {
                return Err(EngineError::config(format!(
                    "flag rule for {} has an empty category",
                    rule.signal
                )));
            }
        }
        if !self.min_edge_pct.is_finite() || self.min_edge_pct < 0.0 {
            return Err(EngineError::config(format!(
                "min_edge_pct must be a non-negative number, got {}",
                self.min_edge_pct
            )));
        }
        if self.precision > MAX_PRECISION {
            return Err(EngineError::config(format!(
                "precision must be at most {MAX_PRECISION}, got {}",
                self.precision
            )));
        }
        Ok(())
    }
}

/// Season date span used to pick the season for a prediction date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonSpan {
    pub id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub stats_path: PathBuf,
    pub lines_path: PathBuf,
    pub slate_path: PathBuf,
    pub outcomes_path: PathBuf,
    pub ledger_path: PathBuf,
    #[serde(default)]
    pub seasons: Vec<SeasonSpan>,
    /// Season used when no span covers a date.
    pub default_season: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            stats_path: PathBuf::from("data/stats.csv"),
            lines_path: PathBuf::from("data/lines.csv"),
            slate_path: PathBuf::from("data/slate.csv"),
            outcomes_path: PathBuf::from("data/outcomes.csv"),
            ledger_path: PathBuf::from("data/results.csv"),
            seasons: Vec::new(),
            default_season: "2025-26".to_string(),
        }
    }
}

impl DataConfig {
    /// Season identifier for a date.
    #[must_use]
    pub fn season_for(&self, date: NaiveDate) -> &str {
        self.seasons
            .iter()
            .find(|s| s.start <= date && date <= s.end)
            .map_or(self.default_season.as_str(), |s| s.id.as_str())
    }

    /// # Errors
    /// Returns `InvalidConfiguration` if a season span is inverted.
    pub fn validate(&self) -> EngineResult<()> {
        for span in &self.seasons {
            if span.start > span.end {
                return Err(EngineError::config(format!(
                    "season {} starts after it ends",
                    span.id
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSettings {
    /// Time of day (UTC) picks are made on each simulated date.
    #[serde(default = "default_decision_time")]
    pub decision_time: NaiveTime,
    /// Evaluate dates on a worker pool.
    #[serde(default)]
    pub parallel: bool,
    /// Hit rate under the null hypothesis.
    #[serde(default = "default_null_hit_rate")]
    pub null_hit_rate: f64,
    #[serde(default = "default_significance_level")]
    pub significance_level: f64,
    /// American price used for flat-stake units, e.g. -110.
    #[serde(default = "default_american_price")]
    pub american_price: i32,
}

fn default_decision_time() -> NaiveTime {
    NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn default_null_hit_rate() -> f64 {
    0.5
}

fn default_significance_level() -> f64 {
    0.05
}

fn default_american_price() -> i32 {
    -110
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            decision_time: default_decision_time(),
            parallel: false,
            null_hit_rate: default_null_hit_rate(),
            significance_level: default_significance_level(),
            american_price: default_american_price(),
        }
    }
}

impl BacktestSettings {
    /// # Errors
    /// Returns `InvalidConfiguration` for out-of-range probabilities or prices.
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.null_hit_rate > 0.0 && self.null_hit_rate < 1.0) {
            return Err(EngineError::config(format!(
                "null_hit_rate must be within (0, 1), got {}",
                self.null_hit_rate
            )));
        }
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(EngineError::config(format!(
                "significance_level must be within (0, 1), got {}",
                self.significance_level
            )));
        }
        if self.american_price.abs() < 100 {
            return Err(EngineError::config(format!(
                "american_price must be <= -100 or >= 100, got {}",
                self.american_price
            )));
        }
        Ok(())
    }
}
