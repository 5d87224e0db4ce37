//! Per-tier hit-rate report.
//!
//! Built from graded picks, either at the end of a backtest or from a
//! result ledger. Each row carries the counts, the hit rate with its Wilson
//! interval, a binomial p-value against the configured null rate, and
//! flat-stake units at the configured American price.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use axiom_core::{BacktestSettings, BetResult, HitRateStats, OutcomeRecord, Tier, TierTableConfig};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Win/loss/push counts for one tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierTally {
    pub wins: usize,
    pub losses: usize,
    pub pushes: usize,
}

impl TierTally {
    pub fn add(&mut self, result: BetResult) {
        match result {
            BetResult::Win => self.wins += 1,
            BetResult::Loss => self.losses += 1,
            BetResult::Push => self.pushes += 1,
        }
    }

    pub fn merge(&mut self, other: &Self) {
        self.wins += other.wins;
        self.losses += other.losses;
        self.pushes += other.pushes;
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.wins + self.losses + self.pushes
    }
}

/// Tallies keyed by tier.
pub type TierTallies = BTreeMap<Tier, TierTally>;

/// Tallies graded records by their tier.
#[must_use]
pub fn tally(records: &[OutcomeRecord]) -> TierTallies {
    let mut tallies = TierTallies::new();
    for record in records {
        tallies.entry(record.tier).or_default().add(record.result);
    }
    tallies
}

/// Profit in units for one winning one-unit stake at an American price.
///
/// -110 pays 100/110; +150 pays 1.5.
#[must_use]
pub fn win_payout(american_price: i32) -> Decimal {
    let price = Decimal::from(american_price.unsigned_abs());
    if american_price < 0 {
        Decimal::ONE_HUNDRED / price
    } else {
        price / Decimal::ONE_HUNDRED
    }
}

/// One row of the tier table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierReport {
    /// `None` on the row that combines every tier.
    pub tier: Option<Tier>,
    /// Graded picks, pushes included.
    pub total_count: usize,
    pub win_count: usize,
    pub loss_count: usize,
    pub push_count: usize,
    pub hit_rate: f64,
    pub wilson_ci_lower: f64,
    pub wilson_ci_upper: f64,
    pub sample_p_value: f64,
    pub is_significant: bool,
    /// Hit rate the tier is configured to deliver, if any.
    pub expected_hit_rate: Option<f64>,
    /// Whether the expected rate lies inside the observed interval.
    /// `None` without an expectation or without decided picks.
    pub expected_in_interval: Option<bool>,
    /// Flat one-unit stakes; pushes return the stake.
    pub units: Decimal,
    /// `units / total_count`.
    pub roi: Decimal,
}

impl TierReport {
    #[must_use]
    pub fn build(
        tier: Tier,
        tally: &TierTally,
        expected_hit_rate: Option<f64>,
        settings: &BacktestSettings,
    ) -> Self {
        Self::from_tally(Some(tier), tally, expected_hit_rate, settings)
    }

    /// Row for all tiers combined. Carries no expectation.
    #[must_use]
    pub fn overall(tally: &TierTally, settings: &BacktestSettings) -> Self {
        Self::from_tally(None, tally, None, settings)
    }

    /// Tier name, or `ALL` for the combined row.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.tier.map_or("ALL", Tier::as_str)
    }

    fn from_tally(
        tier: Option<Tier>,
        tally: &TierTally,
        expected_hit_rate: Option<f64>,
        settings: &BacktestSettings,
    ) -> Self {
        let stats = HitRateStats::from_counts(
            tally.wins,
            tally.losses,
            tally.pushes,
            settings.null_hit_rate,
            settings.significance_level,
        );

        let units = win_payout(settings.american_price) * Decimal::from(tally.wins)
            - Decimal::from(tally.losses);
        let roi = if tally.total() > 0 {
            units / Decimal::from(tally.total())
        } else {
            Decimal::ZERO
        };

        let expected_in_interval = expected_hit_rate
            .filter(|_| tally.wins + tally.losses > 0)
            .map(|rate| stats.interval_contains(rate));

        Self {
            tier,
            total_count: tally.total(),
            win_count: tally.wins,
            loss_count: tally.losses,
            push_count: tally.pushes,
            hit_rate: stats.hit_rate,
            wilson_ci_lower: stats.wilson_ci_lower,
            wilson_ci_upper: stats.wilson_ci_upper,
            sample_p_value: stats.p_value,
            is_significant: stats.is_significant,
            expected_hit_rate,
            expected_in_interval,
            units: units.round_dp(4),
            roi: roi.round_dp(4),
        }
    }
}

/// A date left out of the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDate {
    pub date: NaiveDate,
    pub reason: String,
}

/// Aggregate result of a replay or a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub run_id: Uuid,
    pub profile: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Dates whose picks were graded into the aggregate.
    pub dates_evaluated: usize,
    pub skipped_dates: usize,
    pub skipped: Vec<SkippedDate>,
    /// Last date before which every date is either evaluated or skipped.
    pub completed_through: Option<NaiveDate>,
    /// The run stopped early on request.
    pub interrupted: bool,
    pub predictions: usize,
    /// Entities skipped for recoverable reasons, such as a missing line.
    pub skipped_entities: usize,
    /// Picks whose event has no realized value yet.
    pub ungraded: usize,
    /// Highest tier first.
    pub tiers: Vec<TierReport>,
    /// All tiers combined.
    pub overall: TierReport,
}

impl BacktestReport {
    /// Builds rows for every tier, highest first. The `overall` row carries
    /// no expectation.
    #[must_use]
    pub fn with_tallies(
        profile: &str,
        tallies: &TierTallies,
        table: &TierTableConfig,
        settings: &BacktestSettings,
    ) -> Self {
        let empty = TierTally::default();
        let tiers = Tier::DESCENDING
            .iter()
            .map(|&tier| {
                let tally = tallies.get(&tier).unwrap_or(&empty);
                TierReport::build(tier, tally, table.expected_hit_rate(tier), settings)
            })
            .collect();

        let mut combined = TierTally::default();
        for tally in tallies.values() {
            combined.merge(tally);
        }
        let overall = TierReport::overall(&combined, settings);

        Self {
            run_id: Uuid::new_v4(),
            profile: profile.to_string(),
            start: None,
            end: None,
            dates_evaluated: 0,
            skipped_dates: 0,
            skipped: Vec::new(),
            completed_through: None,
            interrupted: false,
            predictions: 0,
            skipped_entities: 0,
            ungraded: 0,
            tiers,
            overall,
        }
    }

    /// Rebuilds the tier table from ledger records.
    #[must_use]
    pub fn from_outcomes(
        profile: &str,
        records: &[OutcomeRecord],
        table: &TierTableConfig,
        settings: &BacktestSettings,
    ) -> Self {
        let mut report = Self::with_tallies(profile, &tally(records), table, settings);
        report.start = records.iter().map(|r| r.date).min();
        report.end = records.iter().map(|r| r.date).max();
        report.completed_through = report.end;
        report.dates_evaluated = records
            .iter()
            .map(|r| r.date)
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        report
    }

    #[must_use]
    pub fn tier(&self, tier: Tier) -> Option<&TierReport> {
        self.tiers.iter().find(|row| row.tier == Some(tier))
    }

    /// Graded picks across all tiers.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.overall.total_count
    }

    /// Plain-text rendering for terminals and logs.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let banner = "=".repeat(96);
        let range = match (self.start, self.end) {
            (Some(s), Some(e)) => format!("{s} to {e}"),
            _ => "no dates".to_string(),
        };

        let _ = writeln!(out, "{banner}");
        let _ = writeln!(out, "TIER REPORT: {} ({range})", self.profile);
        let _ = writeln!(out, "run {}", self.run_id);
        let _ = writeln!(out, "{banner}");
        let _ = writeln!(
            out,
            "{:<10} {:>6} {:>5} {:>5} {:>5} {:>7} {:>17} {:>8} {:>4} {:>9} {:>8}",
            "tier", "total", "win", "loss", "push", "hit", "wilson 95%", "p", "sig", "units", "roi"
        );
        let _ = writeln!(out, "{}", "-".repeat(96));
        for row in &self.tiers {
            write_row(&mut out, row);
        }
        let _ = writeln!(out, "{}", "-".repeat(96));
        write_row(&mut out, &self.overall);

        let expectations: Vec<&TierReport> = self
            .tiers
            .iter()
            .filter(|row| row.expected_hit_rate.is_some())
            .collect();
        if !expectations.is_empty() {
            let _ = writeln!(out);
            for row in expectations {
                let verdict = match row.expected_in_interval {
                    Some(true) => "consistent",
                    Some(false) => "OUTSIDE INTERVAL",
                    None => "no decided picks",
                };
                let _ = writeln!(
                    out,
                    "{:<10} expected {:.1}%: {verdict}",
                    row.label(),
                    row.expected_hit_rate.unwrap_or_default() * 100.0
                );
            }
        }

        let _ = writeln!(out, "{banner}");
        let _ = writeln!(
            out,
            "dates evaluated: {}  skipped dates: {}  predictions: {}  skipped entities: {}  ungraded: {}",
            self.dates_evaluated,
            self.skipped_dates,
            self.predictions,
            self.skipped_entities,
            self.ungraded
        );
        for skipped in &self.skipped {
            let _ = writeln!(out, "  skipped {}: {}", skipped.date, skipped.reason);
        }
        if self.interrupted {
            let through = self
                .completed_through
                .map_or_else(|| "nothing".to_string(), |d| d.to_string());
            let _ = writeln!(out, "INTERRUPTED: partial results through {through}");
        }
        let _ = writeln!(out, "{banner}");
        out
    }
}

fn write_row(out: &mut String, row: &TierReport) {
    let _ = writeln!(
        out,
        "{:<10} {:>6} {:>5} {:>5} {:>5} {:>6.1}% {:>7.1}% - {:>5.1}% {:>8.4} {:>4} {:>9} {:>8}",
        row.label(),
        row.total_count,
        row.win_count,
        row.loss_count,
        row.push_count,
        row.hit_rate * 100.0,
        row.wilson_ci_lower * 100.0,
        row.wilson_ci_upper * 100.0,
        row.sample_p_value,
        if row.is_significant { "yes" } else { "no" },
        row.units,
        row.roi
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use axiom_core::{MarketType, PickSide, TierBasis, TierThreshold};
    use rust_decimal_macros::dec;

    fn table() -> TierTableConfig {
        TierTableConfig {
            basis: TierBasis::FlagScore,
            thresholds: vec![
                TierThreshold::new(Tier::Platinum, 8.0).expecting(0.6),
                TierThreshold::new(Tier::Gold, 5.0),
                TierThreshold::new(Tier::Silver, 3.0),
                TierThreshold::new(Tier::Skip, 0.0),
            ],
        }
    }

    fn record(day: u32, tier: Tier, result: BetResult) -> OutcomeRecord {
        OutcomeRecord {
            entity_id: format!("E{day}"),
            market: MarketType::Total,
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            tier,
            pick: PickSide::Over,
            line: 220.5,
            actual: 224.0,
            result,
            closing_line: None,
            clv: None,
        }
    }

    // ============================================
    // Units
    // ============================================

    #[test]
    fn payouts_follow_american_odds() {
        assert_eq!(win_payout(-110).round_dp(6), dec!(0.909091));
        assert_eq!(win_payout(-100), dec!(1));
        assert_eq!(win_payout(150), dec!(1.5));
    }

    #[test]
    fn units_and_roi_at_minus_110() {
        let tally = TierTally {
            wins: 11,
            losses: 10,
            pushes: 1,
        };
        let row = TierReport::build(Tier::Gold, &tally, None, &BacktestSettings::default());
        // 11 * 100/110 - 10 = 0
        assert_eq!(row.units, dec!(0));
        assert_eq!(row.roi, dec!(0));
        assert_eq!(row.total_count, 22);
    }

    // ============================================
    // Aggregation
    // ============================================

    #[test]
    fn ledger_records_group_by_tier() {
        let mut records = vec![
            record(1, Tier::Platinum, BetResult::Win),
            record(2, Tier::Platinum, BetResult::Win),
            record(2, Tier::Platinum, BetResult::Loss),
            record(3, Tier::Silver, BetResult::Push),
        ];
        records[2].entity_id = "X".into();

        let report =
            BacktestReport::from_outcomes("nba", &records, &table(), &BacktestSettings::default());

        let platinum = report.tier(Tier::Platinum).unwrap();
        assert_eq!(
            (platinum.win_count, platinum.loss_count, platinum.push_count),
            (2, 1, 0)
        );
        assert!((platinum.hit_rate - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(platinum.expected_hit_rate, Some(0.6));
        assert_eq!(platinum.expected_in_interval, Some(true));

        let silver = report.tier(Tier::Silver).unwrap();
        assert_eq!(silver.total_count, 1);
        assert_eq!(silver.hit_rate, 0.0);
        assert_eq!(silver.sample_p_value, 1.0);

        assert_eq!(report.tier(Tier::Gold).unwrap().total_count, 0);
        assert_eq!(report.total_count(), 4);
        assert_eq!(report.dates_evaluated, 3);
        assert_eq!(report.start, NaiveDate::from_ymd_opt(2026, 3, 1));
        assert_eq!(report.end, NaiveDate::from_ymd_opt(2026, 3, 3));
    }

    #[test]
    fn tiers_are_listed_highest_first() {
        let report = BacktestReport::from_outcomes(
            "nba",
            &[],
            &table(),
            &BacktestSettings::default(),
        );
        let order: Vec<Option<Tier>> = report.tiers.iter().map(|r| r.tier).collect();
        let expected: Vec<Option<Tier>> = Tier::DESCENDING.iter().copied().map(Some).collect();
        assert_eq!(order, expected);
        assert_eq!(report.total_count(), 0);
        assert!(!report.overall.is_significant);
    }

    #[test]
    fn overall_row_is_not_a_tier() {
        let records = [
            record(1, Tier::Platinum, BetResult::Win),
            record(2, Tier::Skip, BetResult::Loss),
        ];
        let report =
            BacktestReport::from_outcomes("nba", &records, &table(), &BacktestSettings::default());

        assert_eq!(report.overall.tier, None);
        assert_eq!(report.overall.label(), "ALL");
        assert_eq!(report.overall.total_count, 2);
        assert_eq!(report.overall.expected_hit_rate, None);
        // The SKIP row holds only SKIP picks.
        assert_eq!(report.tier(Tier::Skip).unwrap().total_count, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["overall"]["tier"].is_null());
        assert_eq!(json["tiers"][3]["tier"], "SKIP");
    }

    #[test]
    fn lopsided_sample_is_significant() {
        let tally = TierTally {
            wins: 70,
            losses: 30,
            pushes: 0,
        };
        let row = TierReport::build(Tier::Gold, &tally, Some(0.5), &BacktestSettings::default());
        assert!(row.is_significant);
        assert!(row.sample_p_value < 0.001);
        assert_eq!(row.expected_in_interval, Some(false));
    }

    // ============================================
    // Rendering
    // ============================================

    #[test]
    fn text_report_names_skips_and_interruptions() {
        let mut report = BacktestReport::from_outcomes(
            "nba",
            &[record(1, Tier::Gold, BetResult::Win)],
            &table(),
            &BacktestSettings::default(),
        );
        report.skipped_dates = 1;
        report.skipped.push(SkippedDate {
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            reason: "duplicate spread fixture for BOS".into(),
        });
        report.interrupted = true;

        let text = report.to_text();
        assert!(text.contains("PLATINUM"));
        assert!(text.contains("skipped dates: 1"));
        assert!(text.contains("duplicate spread fixture for BOS"));
        assert!(text.contains("INTERRUPTED: partial results through 2026-03-01"));
        assert!(text.contains("expected 60.0%: no decided picks"));
    }

    #[test]
    fn report_serializes_to_json() {
        let report = BacktestReport::from_outcomes(
            "nba",
            &[record(1, Tier::Gold, BetResult::Win)],
            &table(),
            &BacktestSettings::default(),
        );
        let json = serde_json::to_string(&report).unwrap();
        let back: BacktestReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.run_id, report.run_id);
        assert_eq!(back.tier(Tier::Gold).unwrap().win_count, 1);
    }
}
