//! Edge calculation against market lines.
//!
//! Conventions, per market:
//!
//! | market | line notation | `raw_edge` | `directional_edge` | pick |
//! |---|---|---|---|---|
//! | spread | home spread, negative = home favored | `projection - line` | `line - projection` (positive favors home) | `raw < 0` Home, `raw > 0` Away |
//! | total / player prop | over/under number | `projection - line` | `projection - line` | `raw > 0` Over, `raw < 0` Under |
//!
//! `edge_pct` is `raw_edge / |line| * 100`, or zero for a zero line.

use axiom_core::{
    round_to, Edge, EngineError, EngineResult, Fixture, MarketLine, MarketType,
    PredictionContext, Projection, StatRepository,
};
use chrono::NaiveDate;

/// Compares projections with market lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCalculator {
    min_edge_pct: f64,
    precision: u32,
}

impl EdgeCalculator {
    #[must_use]
    pub fn new(min_edge_pct: f64, precision: u32) -> Self {
        Self {
            min_edge_pct,
            precision,
        }
    }

    /// Computes the edge of `projection` over `line`.
    ///
    /// `projection.value` must already be in the market's line notation.
    ///
    /// # Errors
    /// Returns `MissingLine` when `line` is `None`, and `DataIntegrity` when
    /// the line or projection is not a finite number.
    pub fn calculate(
        &self,
        projection: &Projection,
        market: MarketType,
        date: NaiveDate,
        line: Option<&MarketLine>,
    ) -> EngineResult<Edge> {
        let line = line.ok_or_else(|| EngineError::MissingLine {
            entity_id: projection.entity_id.clone(),
            market: market.to_string(),
            date,
        })?;
        if !line.value.is_finite() {
            return Err(EngineError::integrity(
                date,
                format!("{market} line for {} is {}", line.entity_id, line.value),
            ));
        }
        if !projection.value.is_finite() {
            return Err(EngineError::integrity(
                date,
                format!("projection for {} is {}", projection.entity_id, projection.value),
            ));
        }

        let raw_edge = round_to(projection.value - line.value, self.precision);
        let directional_edge = match market {
            MarketType::Spread => -raw_edge,
            MarketType::Total | MarketType::PlayerProp => raw_edge,
        };
        let edge_pct = if line.value == 0.0 {
            0.0
        } else {
            round_to(raw_edge / line.value.abs() * 100.0, self.precision)
        };

        let pick = if edge_pct.abs() < self.min_edge_pct {
            None
        } else {
            market.pick_for(raw_edge)
        };

        Ok(Edge {
            entity_id: projection.entity_id.clone(),
            market,
            projection: projection.value,
            line: line.value,
            raw_edge,
            directional_edge: round_to(directional_edge, self.precision),
            edge_pct,
            pick,
        })
    }

    /// Looks up the latest line visible at `ctx.as_of` and computes the edge.
    ///
    /// # Errors
    /// See [`EdgeCalculator::calculate`].
    pub fn for_fixture<R>(
        &self,
        repo: &R,
        ctx: &PredictionContext,
        fixture: &Fixture,
        projection: &Projection,
    ) -> EngineResult<Edge>
    where
        R: StatRepository + ?Sized,
    {
        let line = repo.latest_line(&fixture.entity_id, fixture.market, fixture.date, ctx.as_of);
        self.calculate(projection, fixture.market, fixture.date, line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axiom_core::PickSide;
    use chrono::{TimeZone, Utc};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 20).unwrap()
    }

    fn projection(value: f64) -> Projection {
        Projection {
            entity_id: "LAL".into(),
            stat: "margin".into(),
            value,
            contributions: Vec::new(),
            dropped: Vec::new(),
        }
    }

    fn line(market: MarketType, value: f64) -> MarketLine {
        MarketLine {
            entity_id: "LAL".into(),
            market,
            date: date(),
            value,
            captured_at: Utc.with_ymd_and_hms(2026, 1, 20, 15, 0, 0).unwrap(),
        }
    }

    fn calc() -> EdgeCalculator {
        EdgeCalculator::new(0.0, 4)
    }

    // ============================================
    // Spreads
    // ============================================

    #[test]
    fn spread_edge_toward_home_favorite() {
        // Market: home -4.5. Model: home -7.5.
        let l = line(MarketType::Spread, -4.5);
        let edge = calc()
            .calculate(&projection(-7.5), MarketType::Spread, date(), Some(&l))
            .unwrap();
        assert_eq!(edge.raw_edge, -3.0);
        assert_eq!(edge.directional_edge, 3.0);
        assert_eq!(edge.pick, Some(PickSide::Home));
        assert_eq!(edge.edge_pct, -66.6667);
    }

    #[test]
    fn spread_edge_toward_away_side() {
        // Market: home -6. Model: home -2.
        let l = line(MarketType::Spread, -6.0);
        let edge = calc()
            .calculate(&projection(-2.0), MarketType::Spread, date(), Some(&l))
            .unwrap();
        assert_eq!(edge.raw_edge, 4.0);
        assert_eq!(edge.directional_edge, -4.0);
        assert_eq!(edge.pick, Some(PickSide::Away));
    }

    #[test]
    fn spread_with_home_underdog() {
        // Market: home +3. Model: home +1.
        let l = line(MarketType::Spread, 3.0);
        let edge = calc()
            .calculate(&projection(1.0), MarketType::Spread, date(), Some(&l))
            .unwrap();
        assert_eq!(edge.raw_edge, -2.0);
        assert_eq!(edge.pick, Some(PickSide::Home));
    }

    // ============================================
    // Over/under markets
    // ============================================

    #[test]
    fn prop_over_and_under() {
        let l = line(MarketType::PlayerProp, 25.5);
        let over = calc()
            .calculate(&projection(28.0), MarketType::PlayerProp, date(), Some(&l))
            .unwrap();
        assert_eq!(over.raw_edge, 2.5);
        assert_eq!(over.directional_edge, 2.5);
        assert_eq!(over.edge_pct, 9.8039);
        assert_eq!(over.pick, Some(PickSide::Over));

        let under = calc()
            .calculate(&projection(22.0), MarketType::PlayerProp, date(), Some(&l))
            .unwrap();
        assert_eq!(under.raw_edge, -3.5);
        assert_eq!(under.pick, Some(PickSide::Under));
    }

    #[test]
    fn small_edges_back_no_side() {
        let l = line(MarketType::PlayerProp, 25.5);
        let edge = EdgeCalculator::new(5.0, 4)
            .calculate(&projection(26.5), MarketType::PlayerProp, date(), Some(&l))
            .unwrap();
        assert_eq!(edge.edge_pct, 3.9216);
        assert_eq!(edge.pick, None);
    }

    #[test]
    fn zero_edge_backs_no_side() {
        let l = line(MarketType::Total, 221.5);
        let edge = calc()
            .calculate(&projection(221.5), MarketType::Total, date(), Some(&l))
            .unwrap();
        assert_eq!(edge.raw_edge, 0.0);
        assert_eq!(edge.pick, None);
    }

    #[test]
    fn pick_em_line_has_zero_percentage() {
        let l = line(MarketType::Spread, 0.0);
        let edge = calc()
            .calculate(&projection(-1.5), MarketType::Spread, date(), Some(&l))
            .unwrap();
        assert_eq!(edge.edge_pct, 0.0);
        assert_eq!(edge.pick, Some(PickSide::Home));
    }

    // ============================================
    // Failures
    // ============================================

    #[test]
    fn missing_line_is_recoverable() {
        let err = calc()
            .calculate(&projection(-3.0), MarketType::Spread, date(), None)
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingLine { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn nan_line_is_an_integrity_error() {
        let l = line(MarketType::Total, f64::NAN);
        let err = calc()
            .calculate(&projection(220.0), MarketType::Total, date(), Some(&l))
            .unwrap_err();
        assert!(matches!(err, EngineError::DataIntegrity { .. }));
    }
}
