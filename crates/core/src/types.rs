//! Input records and market conventions.
//!
//! Records here are produced by external ingestion and are immutable once
//! stored. Newer records supersede older ones by `recorded_at` / `captured_at`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Which side of a fixture an entity is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Home => Self::Away,
            Self::Away => Self::Home,
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "home" | "h" => Ok(Self::Home),
            "away" | "a" => Ok(Self::Away),
            other => Err(format!("unknown side '{other}'")),
        }
    }
}

/// Aggregation window a statistic record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SampleWindow {
    /// A single completed game.
    Game,
    /// Season-to-date aggregate.
    Season,
    /// Aggregate over the last `n` games.
    LastN(u32),
    /// Aggregate over games against one opponent.
    VsOpponent,
    /// How an opponent's defense deviates from league average, per stat.
    Matchup,
    /// Pre-game facts such as injury adjustments.
    Situational,
}

impl fmt::Display for SampleWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Game => write!(f, "game"),
            Self::Season => write!(f, "season"),
            Self::LastN(n) => write!(f, "last_{n}"),
            Self::VsOpponent => write!(f, "vs_opponent"),
            Self::Matchup => write!(f, "matchup"),
            Self::Situational => write!(f, "situational"),
        }
    }
}

impl FromStr for SampleWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        match lowered.as_str() {
            "game" => Ok(Self::Game),
            "season" => Ok(Self::Season),
            "vs_opponent" => Ok(Self::VsOpponent),
            "matchup" => Ok(Self::Matchup),
            "situational" => Ok(Self::Situational),
            other => other
                .strip_prefix("last_")
                .and_then(|n| n.parse::<u32>().ok())
                .map(Self::LastN)
                .ok_or_else(|| format!("unknown sample window '{s}'")),
        }
    }
}

impl TryFrom<String> for SampleWindow {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SampleWindow> for String {
    fn from(value: SampleWindow) -> Self {
        value.to_string()
    }
}

/// Per-entity statistics for one date and window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    pub entity_id: String,
    /// Opponent faced, for game and vs-opponent records.
    pub opponent_id: Option<String>,
    pub date: NaiveDate,
    pub season: String,
    pub side: Side,
    pub window: SampleWindow,
    /// When the record became available. The no-look-ahead filter keys on this.
    pub recorded_at: DateTime<Utc>,
    pub stats: BTreeMap<String, f64>,
}

/// Separates a position from a statistic in position-keyed stat names,
/// e.g. `G:PTS` for points allowed to guards.
pub const POSITION_SEPARATOR: char = ':';

/// Components of a combo statistic, summed per game.
#[must_use]
pub fn combo_components(stat: &str) -> Option<&'static [&'static str]> {
    match stat {
        "PRA" => Some(&["PTS", "REB", "AST"]),
        "PR" => Some(&["PTS", "REB"]),
        "PA" => Some(&["PTS", "AST"]),
        "RA" => Some(&["REB", "AST"]),
        _ => None,
    }
}

/// Stat name keyed by position, e.g. `position_stat("C", "REB") == "C:REB"`.
#[must_use]
pub fn position_stat(position: &str, stat: &str) -> String {
    format!("{position}{POSITION_SEPARATOR}{stat}")
}

impl StatRecord {
    /// Returns a statistic by name.
    ///
    /// A combo statistic that was not recorded directly is the sum of its
    /// components, and is absent unless every component is present. The same
    /// applies to position-keyed names (`G:PRA` sums `G:PTS`, `G:REB`, `G:AST`).
    #[must_use]
    pub fn stat(&self, name: &str) -> Option<f64> {
        if let Some(value) = self.stats.get(name) {
            return Some(*value);
        }
        let (position, base) = match name.split_once(POSITION_SEPARATOR) {
            Some((position, base)) => (Some(position), base),
            None => (None, name),
        };
        combo_components(base)?
            .iter()
            .map(|part| match position {
                Some(position) => self.stats.get(&position_stat(position, part)).copied(),
                None => self.stats.get(*part).copied(),
            })
            .sum()
    }

    /// Returns the first statistic that is NaN or infinite.
    #[must_use]
    pub fn first_non_finite(&self) -> Option<(&str, f64)> {
        self.stats
            .iter()
            .find(|(_, v)| !v.is_finite())
            .map(|(k, v)| (k.as_str(), *v))
    }
}

/// Market a line is published for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketType {
    /// Point spread, quoted from the home side (negative = home favored).
    Spread,
    /// Game total points.
    Total,
    /// Player statistic over/under.
    PlayerProp,
}

impl MarketType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spread => "spread",
            Self::Total => "total",
            Self::PlayerProp => "player_prop",
        }
    }

    /// Side the model backs for a given `projection - line` value.
    ///
    /// Spreads are quoted from the home side, so a model spread below the
    /// market line means the model likes home more than the market does.
    #[must_use]
    pub fn pick_for(self, raw_edge: f64) -> Option<PickSide> {
        if raw_edge == 0.0 || !raw_edge.is_finite() {
            return None;
        }
        Some(match (self, raw_edge < 0.0) {
            (Self::Spread, true) => PickSide::Home,
            (Self::Spread, false) => PickSide::Away,
            (_, false) => PickSide::Over,
            (_, true) => PickSide::Under,
        })
    }

    /// Grades a pick against the realized value.
    ///
    /// For spreads `actual` is the realized home margin (home points minus
    /// away points). For totals and props it is the realized statistic.
    #[must_use]
    pub fn grade(self, pick: PickSide, line: f64, actual: f64) -> BetResult {
        let cover = match self {
            Self::Spread => actual + line,
            Self::Total | Self::PlayerProp => actual - line,
        };
        if cover == 0.0 {
            return BetResult::Push;
        }
        let backed_positive = matches!(pick, PickSide::Home | PickSide::Over);
        if (cover > 0.0) == backed_positive {
            BetResult::Win
        } else {
            BetResult::Loss
        }
    }

    /// Closing line value: points by which the line taken beat the close,
    /// positive when the market moved toward the pick.
    #[must_use]
    pub fn closing_line_value(self, pick: PickSide, line: f64, closing: f64) -> f64 {
        let moved = closing - line;
        let toward_positive = match self {
            Self::Spread => -moved,
            Self::Total | Self::PlayerProp => moved,
        };
        if matches!(pick, PickSide::Home | PickSide::Over) {
            toward_positive
        } else {
            -toward_positive
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spread" | "ats" => Ok(Self::Spread),
            "total" | "totals" => Ok(Self::Total),
            "player_prop" | "prop" | "props" => Ok(Self::PlayerProp),
            other => Err(format!("unknown market '{other}'")),
        }
    }
}

/// A published market line. Several may exist per game as the line moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketLine {
    pub entity_id: String,
    pub market: MarketType,
    /// Date of the event the line is for.
    pub date: NaiveDate,
    pub value: f64,
    pub captured_at: DateTime<Utc>,
}

/// One prediction request on a slate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fixture {
    pub date: NaiveDate,
    /// Home team for spreads and totals, the player for props.
    pub entity_id: String,
    pub opponent_id: String,
    pub side: Side,
    pub market: MarketType,
    /// Statistic being projected (e.g. `margin`, `total_points`, `PTS`).
    pub stat: String,
    /// Player position, for position-keyed opponent adjustments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

impl Fixture {
    /// Spread and total fixtures are keyed by the home team; lines and
    /// outcomes for them are read from the home side.
    ///
    /// # Errors
    /// Returns `DataIntegrity` for an away-side spread or total fixture.
    pub fn validate(&self) -> EngineResult<()> {
        match (self.market, self.side) {
            (MarketType::Spread | MarketType::Total, Side::Away) => Err(EngineError::integrity(
                self.date,
                format!(
                    "{} fixture for {} must name the home team, got the away side",
                    self.market, self.entity_id
                ),
            )),
            _ => Ok(()),
        }
    }
}

/// The side a prediction backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PickSide {
    Home,
    Away,
    Over,
    Under,
}

impl fmt::Display for PickSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Home => "HOME",
            Self::Away => "AWAY",
            Self::Over => "OVER",
            Self::Under => "UNDER",
        };
        f.write_str(label)
    }
}

impl FromStr for PickSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "HOME" => Ok(Self::Home),
            "AWAY" => Ok(Self::Away),
            "OVER" => Ok(Self::Over),
            "UNDER" => Ok(Self::Under),
            other => Err(format!("unknown pick side '{other}'")),
        }
    }
}

/// Result of a graded pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BetResult {
    Win,
    Loss,
    Push,
}

impl fmt::Display for BetResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Win => "WIN",
            Self::Loss => "LOSS",
            Self::Push => "PUSH",
        };
        f.write_str(label)
    }
}

impl FromStr for BetResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "WIN" | "W" => Ok(Self::Win),
            "LOSS" | "L" => Ok(Self::Loss),
            "PUSH" | "P" => Ok(Self::Push),
            other => Err(format!("unknown result '{other}'")),
        }
    }
}

/// Rounds to a fixed number of decimal places.
#[must_use]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    // Normalize -0.0 so serialized output is stable.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================
    // Market conventions
    // ============================================

    #[test]
    fn spread_pick_follows_home_perspective() {
        // Model spread -7.5 vs market -4.5: model likes home more.
        assert_eq!(MarketType::Spread.pick_for(-3.0), Some(PickSide::Home));
        assert_eq!(MarketType::Spread.pick_for(2.0), Some(PickSide::Away));
        assert_eq!(MarketType::Spread.pick_for(0.0), None);
    }

    #[test]
    fn over_under_pick_follows_sign() {
        assert_eq!(MarketType::Total.pick_for(4.0), Some(PickSide::Over));
        assert_eq!(MarketType::PlayerProp.pick_for(-1.5), Some(PickSide::Under));
    }

    #[test]
    fn spread_grading_uses_home_margin() {
        // Home -4.5, home wins by 5: covers.
        assert_eq!(MarketType::Spread.grade(PickSide::Home, -4.5, 5.0), BetResult::Win);
        assert_eq!(MarketType::Spread.grade(PickSide::Away, -4.5, 5.0), BetResult::Loss);
        // Home -4.5, home wins by 3: away covers.
        assert_eq!(MarketType::Spread.grade(PickSide::Away, -4.5, 3.0), BetResult::Win);
        // Home +3, home loses by 3: push.
        assert_eq!(MarketType::Spread.grade(PickSide::Home, 3.0, -3.0), BetResult::Push);
    }

    #[test]
    fn total_grading() {
        assert_eq!(MarketType::Total.grade(PickSide::Over, 220.5, 221.0), BetResult::Win);
        assert_eq!(MarketType::Total.grade(PickSide::Under, 220.5, 221.0), BetResult::Loss);
        assert_eq!(MarketType::PlayerProp.grade(PickSide::Over, 25.0, 25.0), BetResult::Push);
    }

    #[test]
    fn closing_line_value_follows_the_pick() {
        // Home took -3.5, market closed -5.5: two points of value.
        assert_eq!(MarketType::Spread.closing_line_value(PickSide::Home, -3.5, -5.5), 2.0);
        assert_eq!(MarketType::Spread.closing_line_value(PickSide::Away, -3.5, -5.5), -2.0);
        // Over 24.5 closing 26.0.
        assert_eq!(MarketType::PlayerProp.closing_line_value(PickSide::Over, 24.5, 26.0), 1.5);
        assert_eq!(MarketType::Total.closing_line_value(PickSide::Under, 220.5, 222.5), -2.0);
        assert_eq!(MarketType::Total.closing_line_value(PickSide::Under, 220.5, 220.5), 0.0);
    }

    fn fixture(market: MarketType, side: Side) -> Fixture {
        Fixture {
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            entity_id: "ATL".into(),
            opponent_id: "MIL".into(),
            side,
            market,
            stat: "margin".into(),
            position: None,
        }
    }

    // ============================================
    // Stat lookup
    // ============================================

    fn box_score(stats: &[(&str, f64)]) -> StatRecord {
        StatRecord {
            entity_id: "Nikola Jokic".into(),
            opponent_id: Some("OKC".into()),
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            season: "2025-26".into(),
            side: Side::Home,
            window: SampleWindow::Game,
            recorded_at: DateTime::parse_from_rfc3339("2026-03-02T05:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            stats: stats.iter().map(|(k, v)| ((*k).to_string(), *v)).collect(),
        }
    }

    #[test]
    fn combo_stats_sum_their_components() {
        let record = box_score(&[("PTS", 31.0), ("REB", 12.0), ("AST", 9.0)]);
        assert_eq!(record.stat("PRA"), Some(52.0));
        assert_eq!(record.stat("PR"), Some(43.0));
        assert_eq!(record.stat("PA"), Some(40.0));
        assert_eq!(record.stat("RA"), Some(21.0));
        assert_eq!(record.stat("3PM"), None);
    }

    #[test]
    fn combo_needs_every_component() {
        let record = box_score(&[("PTS", 31.0), ("REB", 12.0)]);
        assert_eq!(record.stat("PR"), Some(43.0));
        assert_eq!(record.stat("PRA"), None);
    }

    #[test]
    fn recorded_combo_wins_over_components() {
        let record = box_score(&[("PTS", 31.0), ("REB", 12.0), ("AST", 9.0), ("PRA", 50.0)]);
        assert_eq!(record.stat("PRA"), Some(50.0));
    }

    #[test]
    fn position_keyed_combos() {
        let allowed = box_score(&[("C:PTS", 1.5), ("C:REB", 2.0), ("C:AST", -0.5), ("PTS", 0.2)]);
        assert_eq!(allowed.stat(&position_stat("C", "PRA")), Some(3.0));
        assert_eq!(allowed.stat("C:PTS"), Some(1.5));
        assert_eq!(allowed.stat("G:PTS"), None);
        assert_eq!(allowed.stat("PTS"), Some(0.2));
    }

    #[test]
    fn game_markets_are_keyed_by_home_team() {
        assert!(fixture(MarketType::Spread, Side::Home).validate().is_ok());
        let err = fixture(MarketType::Spread, Side::Away).validate().unwrap_err();
        assert_eq!(err.kind(), "data_integrity");
        assert!(fixture(MarketType::Total, Side::Away).validate().is_err());
        assert!(fixture(MarketType::PlayerProp, Side::Away).validate().is_ok());
    }

    // ============================================
    // Parsing
    // ============================================

    #[test]
    fn sample_window_parses_last_n() {
        assert_eq!("last_10".parse::<SampleWindow>(), Ok(SampleWindow::LastN(10)));
        assert_eq!("Matchup".parse::<SampleWindow>(), Ok(SampleWindow::Matchup));
        assert!("last_x".parse::<SampleWindow>().is_err());
        assert_eq!(SampleWindow::LastN(5).to_string(), "last_5");
    }

    #[test]
    fn market_and_pick_parse() {
        assert_eq!("props".parse::<MarketType>(), Ok(MarketType::PlayerProp));
        assert_eq!("under".parse::<PickSide>(), Ok(PickSide::Under));
        assert_eq!("push".parse::<BetResult>(), Ok(BetResult::Push));
    }

    #[test]
    fn round_to_normalizes_negative_zero() {
        assert_eq!(round_to(23.456_78, 2), 23.46);
        assert_eq!(round_to(-0.000_01, 2).to_bits(), 0.0f64.to_bits());
    }

    #[test]
    fn non_finite_stats_are_reported() {
        let record = StatRecord {
            entity_id: "BOS".into(),
            opponent_id: None,
            date: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            season: "2025-26".into(),
            side: Side::Home,
            window: SampleWindow::Game,
            recorded_at: Utc::now(),
            stats: BTreeMap::from([("margin".to_string(), f64::NAN)]),
        };
        assert_eq!(record.first_non_finite().map(|(k, _)| k), Some("margin"));
    }
}
