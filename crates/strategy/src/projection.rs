//! Weighted-blend projection engine.
//!
//! Each configured source produces an estimate or is dropped for lack of
//! data. Dropped weight is redistributed proportionally over the sources
//! that remain: with available set `A`, source `i` in `A` gets
//! `w_i / sum(w_j for j in A)`. The result depends only on which sources are
//! available, never on the order they were computed in.

use axiom_core::{
    position_stat, round_to, Contribution, DroppedSource, EngineError, EngineResult, Fixture, PredictionContext,
    Projection, ProjectionConfig, ProjectionSource, SampleWindow, StatRepository,
};

use crate::history::{latest_record, mean, GameLog};

/// A source's value for one projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceEstimate {
    pub source: ProjectionSource,
    pub value: f64,
    pub samples: usize,
}

/// What a source produced: an estimate, or the reason it was dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    Ready(SourceEstimate),
    Insufficient {
        source: ProjectionSource,
        required: usize,
        available: usize,
    },
}

impl SourceOutcome {
    /// Builds a ready estimate when `samples` meets `required`.
    #[must_use]
    pub fn from_samples(source: ProjectionSource, values: &[f64], required: usize) -> Self {
        match mean(values) {
            Some(value) if values.len() >= required => Self::Ready(SourceEstimate {
                source,
                value,
                samples: values.len(),
            }),
            _ => Self::Insufficient {
                source,
                required,
                available: values.len(),
            },
        }
    }

    #[must_use]
    pub fn source(&self) -> ProjectionSource {
        match self {
            Self::Ready(estimate) => estimate.source,
            Self::Insufficient { source, .. } => *source,
        }
    }
}

/// Blends projection sources with configured weights.
#[derive(Debug, Clone)]
pub struct ProjectionEngine {
    config: ProjectionConfig,
    precision: u32,
}

impl ProjectionEngine {
    /// # Errors
    /// Returns `InvalidConfiguration` if weights or sample minimums are invalid.
    pub fn new(config: ProjectionConfig, precision: u32) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config, precision })
    }

    #[must_use]
    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Projects the fixture's stat for its entity from data visible at `ctx.as_of`.
    ///
    /// Sources:
    /// - `recent_form`: mean of the last `recent_window` games
    /// - `season_avg`: mean of games in `ctx.season`
    /// - `vs_opponent_avg`: mean of all games against the fixture's opponent
    /// - `matchup_adjustment`: season mean shifted by the opponent's latest
    ///   matchup record for the stat
    ///
    /// # Errors
    /// Returns `InsufficientData` when every weighted source is short of data,
    /// or `DataIntegrity` when visible records hold non-finite values.
    pub fn project<R>(
        &self,
        repo: &R,
        ctx: &PredictionContext,
        fixture: &Fixture,
    ) -> EngineResult<Projection>
    where
        R: StatRepository + ?Sized,
    {
        let log = GameLog::load(repo, &fixture.entity_id, fixture.date, ctx.as_of)?;
        let stat = fixture.stat.as_str();
        let min = &self.config.min_samples;

        let season_values = log.season(stat, &ctx.season);

        let mut outcomes = Vec::with_capacity(ProjectionSource::ALL.len());
        for source in ProjectionSource::ALL {
            if self.config.weights.get(source) <= 0.0 {
                continue;
            }
            let required = min.get(source);
            let outcome = match source {
                ProjectionSource::RecentForm => SourceOutcome::from_samples(
                    source,
                    &log.recent(stat, self.config.recent_window),
                    required,
                ),
                ProjectionSource::SeasonAvg => {
                    SourceOutcome::from_samples(source, &season_values, required)
                }
                ProjectionSource::VsOpponentAvg => SourceOutcome::from_samples(
                    source,
                    &log.vs_opponent(stat, &fixture.opponent_id),
                    required,
                ),
                ProjectionSource::MatchupAdjustment => {
                    self.matchup(repo, ctx, fixture, &season_values)?
                }
            };
            outcomes.push(outcome);
        }

        self.blend(&fixture.entity_id, stat, &outcomes)
    }

    fn matchup<R>(
        &self,
        repo: &R,
        ctx: &PredictionContext,
        fixture: &Fixture,
        season_values: &[f64],
    ) -> EngineResult<SourceOutcome>
    where
        R: StatRepository + ?Sized,
    {
        let source = ProjectionSource::MatchupAdjustment;
        let required = self.config.min_samples.get(source);
        let latest_for = |key: &str| {
            latest_record(
                repo,
                &fixture.opponent_id,
                SampleWindow::Matchup,
                fixture.date,
                ctx.as_of,
                key,
            )
        };

        // Prefer what the opponent allows to this position, when recorded.
        let stat = fixture
            .position
            .as_deref()
            .map(|position| position_stat(position, &fixture.stat))
            .filter(|key| latest_for(key.as_str()).is_some())
            .unwrap_or_else(|| fixture.stat.clone());
        let stat = stat.as_str();

        let adjustments = repo
            .records(&fixture.opponent_id, SampleWindow::Matchup, ctx.as_of)
            .into_iter()
            .filter(|r| r.date <= fixture.date && r.stat(stat).is_some())
            .count();
        let latest = latest_for(stat);

        let (Some(base), Some(record)) = (mean(season_values), latest) else {
            return Ok(SourceOutcome::Insufficient {
                source,
                required,
                available: if season_values.is_empty() { 0 } else { adjustments },
            });
        };
        if adjustments < required {
            return Ok(SourceOutcome::Insufficient {
                source,
                required,
                available: adjustments,
            });
        }

        let adjustment = record.stat(stat).unwrap_or(0.0);
        if !adjustment.is_finite() {
            return Err(EngineError::integrity(
                record.date,
                format!("{} matchup {stat} is {adjustment}", fixture.opponent_id),
            ));
        }

        Ok(SourceOutcome::Ready(SourceEstimate {
            source,
            value: base + adjustment,
            samples: adjustments,
        }))
    }

    /// Blends source outcomes, redistributing the weight of insufficient
    /// sources over the ones that remain.
    ///
    /// # Errors
    /// Returns `InsufficientData` when no weighted source is ready.
    pub fn blend(
        &self,
        entity_id: &str,
        stat: &str,
        outcomes: &[SourceOutcome],
    ) -> EngineResult<Projection> {
        let weights = &self.config.weights;

        let mut ready: Vec<&SourceEstimate> = Vec::new();
        let mut dropped = Vec::new();
        for outcome in outcomes {
            match outcome {
                SourceOutcome::Ready(estimate) if weights.get(estimate.source) > 0.0 => {
                    ready.push(estimate);
                }
                SourceOutcome::Ready(_) => {}
                SourceOutcome::Insufficient {
                    source,
                    required,
                    available,
                } => dropped.push(DroppedSource {
                    source: *source,
                    base_weight: weights.get(*source),
                    reason: format!("need {required}, have {available}"),
                }),
            }
        }
        // Blend in a fixed order so the floating-point sum is reproducible.
        ready.sort_by_key(|e| e.source);
        dropped.sort_by_key(|d| d.source);

        let available_weight: f64 = ready.iter().map(|e| weights.get(e.source)).sum();
        if ready.is_empty() || available_weight <= 0.0 {
            return Err(EngineError::InsufficientData {
                entity_id: entity_id.to_string(),
                what: format!("{stat} projection sources"),
                required: 1,
                available: 0,
            });
        }

        let contributions: Vec<Contribution> = ready
            .iter()
            .map(|e| {
                let base_weight = weights.get(e.source);
                Contribution {
                    source: e.source,
                    base_weight,
                    weight: base_weight / available_weight,
                    value: round_to(e.value, self.precision),
                    samples: e.samples,
                }
            })
            .collect();

        let value: f64 = ready
            .iter()
            .zip(&contributions)
            .map(|(e, c)| e.value * c.weight)
            .sum();

        if !dropped.is_empty() {
            tracing::debug!(
                entity = %entity_id,
                stat = %stat,
                dropped = dropped.len(),
                "redistributed weight from insufficient sources"
            );
        }

        Ok(Projection {
            entity_id: entity_id.to_string(),
            stat: stat.to_string(),
            value: round_to(value, self.precision),
            contributions,
            dropped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axiom_core::prediction::WEIGHT_TOLERANCE;
    use axiom_core::{MarketType, Side, SourceWeights, StatRecord};
    use axiom_data::InMemoryStatRepository;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use std::collections::BTreeMap;

    fn engine() -> ProjectionEngine {
        ProjectionEngine::new(ProjectionConfig::default(), 4).unwrap()
    }

    fn ready(source: ProjectionSource, value: f64) -> SourceOutcome {
        SourceOutcome::Ready(SourceEstimate {
            source,
            value,
            samples: 10,
        })
    }

    fn short(source: ProjectionSource) -> SourceOutcome {
        SourceOutcome::Insufficient {
            source,
            required: 3,
            available: 1,
        }
    }

    // ============================================
    // Blending and redistribution
    // ============================================

    #[test]
    fn insufficient_vs_opponent_weight_is_redistributed() {
        let outcomes = [
            ready(ProjectionSource::RecentForm, 28.0),
            ready(ProjectionSource::SeasonAvg, 25.0),
            short(ProjectionSource::VsOpponentAvg),
            ready(ProjectionSource::MatchupAdjustment, 1.0),
        ];
        let projection = engine().blend("P1", "PTS", &outcomes).unwrap();

        assert!((projection.value - 23.5).abs() < 1e-9, "got {}", projection.value);
        let weight = |s| projection.contribution(s).unwrap().weight;
        assert!((weight(ProjectionSource::RecentForm) - 0.5).abs() < 1e-12);
        assert!((weight(ProjectionSource::SeasonAvg) - 0.375).abs() < 1e-12);
        assert!((weight(ProjectionSource::MatchupAdjustment) - 0.125).abs() < 1e-12);
        assert!(projection.contribution(ProjectionSource::VsOpponentAvg).is_none());
        assert_eq!(projection.dropped.len(), 1);
        assert_eq!(projection.dropped[0].base_weight, 0.2);
        assert_eq!(projection.dropped[0].reason, "need 3, have 1");
    }

    #[test]
    fn weights_sum_to_one_for_every_available_subset() {
        let engine = engine();
        for mask in 1u8..16 {
            let outcomes: Vec<_> = ProjectionSource::ALL
                .iter()
                .enumerate()
                .map(|(i, &s)| {
                    if mask & (1 << i) != 0 {
                        ready(s, 20.0 + i as f64)
                    } else {
                        short(s)
                    }
                })
                .collect();
            let projection = engine.blend("P1", "PTS", &outcomes).unwrap();
            assert!(
                (projection.weight_sum() - 1.0).abs() < WEIGHT_TOLERANCE,
                "mask {mask:04b} summed to {}",
                projection.weight_sum()
            );
            assert_eq!(
                projection.contributions.len() + projection.dropped.len(),
                4,
                "mask {mask:04b}"
            );
        }
    }

    #[test]
    fn multiple_insufficient_sources_share_proportionally() {
        let outcomes = [
            short(ProjectionSource::RecentForm),
            ready(ProjectionSource::SeasonAvg, 30.0),
            short(ProjectionSource::VsOpponentAvg),
            ready(ProjectionSource::MatchupAdjustment, 20.0),
        ];
        let projection = engine().blend("P1", "PTS", &outcomes).unwrap();
        // 0.3 / 0.4 and 0.1 / 0.4
        let season = projection.contribution(ProjectionSource::SeasonAvg).unwrap();
        assert!((season.weight - 0.75).abs() < 1e-12);
        assert_eq!(season.base_weight, 0.3);
        assert!((projection.value - 27.5).abs() < 1e-9);
    }

    #[test]
    fn all_sources_insufficient_is_an_error() {
        let outcomes: Vec<_> = ProjectionSource::ALL.iter().map(|&s| short(s)).collect();
        let err = engine().blend("P1", "PTS", &outcomes).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData { .. }));
    }

    #[test]
    fn outcome_order_does_not_change_the_blend() {
        let forward = [
            ready(ProjectionSource::RecentForm, 28.3),
            ready(ProjectionSource::SeasonAvg, 25.1),
            ready(ProjectionSource::VsOpponentAvg, 31.7),
            short(ProjectionSource::MatchupAdjustment),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();
        let a = engine().blend("P1", "PTS", &forward).unwrap();
        let b = engine().blend("P1", "PTS", &reversed).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.value.to_bits(), b.value.to_bits());
    }

    #[test]
    fn zero_weight_sources_are_ignored() {
        let config = ProjectionConfig {
            weights: SourceWeights {
                recent_form: 0.5,
                season_avg: 0.5,
                vs_opponent_avg: 0.0,
                matchup_adjustment: 0.0,
            },
            ..ProjectionConfig::default()
        };
        let engine = ProjectionEngine::new(config, 4).unwrap();
        let outcomes = [
            ready(ProjectionSource::RecentForm, 10.0),
            ready(ProjectionSource::SeasonAvg, 20.0),
            ready(ProjectionSource::VsOpponentAvg, 99.0),
        ];
        let projection = engine.blend("P1", "PTS", &outcomes).unwrap();
        assert_eq!(projection.contributions.len(), 2);
        assert!((projection.value - 15.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_weights_are_rejected_at_construction() {
        let mut config = ProjectionConfig::default();
        config.weights.recent_form = 0.9;
        assert!(matches!(
            ProjectionEngine::new(config, 4),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }

    // ============================================
    // Projection from repository data
    // ============================================

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn at(d: u32, hour: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(&day(d).and_hms_opt(hour, 0, 0).unwrap())
    }

    fn record(entity: &str, opponent: &str, d: u32, window: SampleWindow, pts: f64) -> StatRecord {
        StatRecord {
            entity_id: entity.into(),
            opponent_id: Some(opponent.into()),
            date: day(d),
            season: "2025-26".into(),
            side: Side::Away,
            window,
            recorded_at: at(d, 23),
            stats: BTreeMap::from([("PTS".to_string(), pts)]),
        }
    }

    fn fixture(d: u32) -> Fixture {
        Fixture {
            date: day(d),
            entity_id: "P1".into(),
            opponent_id: "DAL".into(),
            side: Side::Away,
            market: MarketType::PlayerProp,
            stat: "PTS".into(),
            position: None,
        }
    }

    #[test]
    fn projects_from_visible_history() {
        let mut repo = InMemoryStatRepository::new();
        // Five games, one against DAL.
        for (d, opp, pts) in [
            (2, "BOS", 20.0),
            (4, "NYK", 24.0),
            (6, "DAL", 30.0),
            (8, "MIA", 26.0),
            (10, "ORL", 25.0),
        ] {
            repo.insert_record(record("P1", opp, d, SampleWindow::Game, pts));
        }
        repo.insert_record(record("DAL", "P1", 11, SampleWindow::Matchup, 1.0));

        let ctx = PredictionContext::new("2025-26", at(12, 17));
        let projection = engine().project(&repo, &ctx, &fixture(12)).unwrap();

        // recent = season = 25.0, vs DAL dropped (1 game), matchup = 25 + 1
        assert_eq!(projection.dropped.len(), 1);
        assert_eq!(projection.dropped[0].source, ProjectionSource::VsOpponentAvg);
        let matchup = projection
            .contribution(ProjectionSource::MatchupAdjustment)
            .unwrap();
        assert_eq!(matchup.value, 26.0);
        // 25 * 0.5 + 25 * 0.375 + 26 * 0.125
        assert!((projection.value - 25.125).abs() < 1e-9);
    }

    #[test]
    fn combo_prop_projects_from_component_sums() {
        let mut repo = InMemoryStatRepository::new();
        for (d, pts, reb, ast) in [(2, 20.0, 8.0, 4.0), (4, 26.0, 10.0, 6.0), (6, 23.0, 9.0, 5.0)] {
            let mut game = record("P1", "BOS", d, SampleWindow::Game, pts);
            game.stats.insert("REB".into(), reb);
            game.stats.insert("AST".into(), ast);
            repo.insert_record(game);
        }
        let ctx = PredictionContext::new("2025-26", at(8, 17));
        let pra = Fixture {
            stat: "PRA".into(),
            ..fixture(8)
        };

        let projection = engine().project(&repo, &ctx, &pra).unwrap();
        // Per-game PRA 32, 42, 37: recent and season both average 37.
        assert_eq!(projection.stat, "PRA");
        assert!((projection.value - 37.0).abs() < 1e-9);
        let recent = projection.contribution(ProjectionSource::RecentForm).unwrap();
        assert_eq!(recent.samples, 3);
    }

    #[test]
    fn matchup_prefers_position_adjustment() {
        let mut repo = InMemoryStatRepository::new();
        for d in [2, 4, 6] {
            repo.insert_record(record("P1", "BOS", d, SampleWindow::Game, 20.0));
        }
        let mut allowed = record("DAL", "P1", 7, SampleWindow::Matchup, 1.0);
        allowed.stats.insert(position_stat("G", "PTS"), 3.0);
        repo.insert_record(allowed);
        let ctx = PredictionContext::new("2025-26", at(8, 17));
        let matchup_value = |position: Option<&str>| {
            let f = Fixture {
                position: position.map(str::to_string),
                ..fixture(8)
            };
            engine()
                .project(&repo, &ctx, &f)
                .unwrap()
                .contribution(ProjectionSource::MatchupAdjustment)
                .unwrap()
                .value
        };

        assert_eq!(matchup_value(Some("G")), 23.0);
        // No center-specific row: falls back to the team-wide adjustment.
        assert_eq!(matchup_value(Some("C")), 21.0);
        assert_eq!(matchup_value(None), 21.0);
    }

    #[test]
    fn future_records_are_invisible() {
        let mut repo = InMemoryStatRepository::new();
        for d in [2, 4, 6] {
            repo.insert_record(record("P1", "BOS", d, SampleWindow::Game, 20.0));
        }
        // Game played before the fixture but recorded after the decision time.
        let mut late = record("P1", "BOS", 7, SampleWindow::Game, 80.0);
        late.recorded_at = at(9, 12);
        repo.insert_record(late);

        let ctx = PredictionContext::new("2025-26", at(8, 17));
        let projection = engine().project(&repo, &ctx, &fixture(8)).unwrap();
        assert_eq!(
            projection
                .contribution(ProjectionSource::RecentForm)
                .unwrap()
                .samples,
            3
        );
        assert!((projection.value - 20.0).abs() < 1e-9);
    }

    #[test]
    fn no_history_is_insufficient() {
        let repo = InMemoryStatRepository::new();
        let ctx = PredictionContext::new("2025-26", at(8, 17));
        let err = engine().project(&repo, &ctx, &fixture(8)).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData { .. }));
    }
}
