//! Per-entity prediction pipeline.
//!
//! Projection, edge, flag score, and tier for each fixture on a slate.
//! Recoverable failures skip the entity and are reported next to the
//! successful predictions; they never abort the batch.

use axiom_core::{
    round_to, EngineError, EngineResult, Fixture, MarketType, ModelProfile, Prediction,
    PredictionContext, SignalContext, StatRepository, Tier,
};
use axiom_signals::{FlagScorer, SignalRegistry, TierClassifier};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::edge::EdgeCalculator;
use crate::facts::FactBuilder;
use crate::projection::ProjectionEngine;

/// A fixture that produced no prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedEntity {
    pub fixture: Fixture,
    /// Error kind, e.g. `missing_line`.
    pub kind: String,
    pub reason: String,
}

impl SkippedEntity {
    fn new(fixture: &Fixture, error: &EngineError) -> Self {
        Self {
            fixture: fixture.clone(),
            kind: error.kind().to_string(),
            reason: error.to_string(),
        }
    }
}

/// Output of one slate run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub predictions: Vec<Prediction>,
    pub skipped: Vec<SkippedEntity>,
}

impl BatchResult {
    /// First data-integrity problem in the batch, if any.
    #[must_use]
    pub fn integrity_failure(&self) -> Option<&SkippedEntity> {
        self.skipped.iter().find(|s| s.kind == "data_integrity")
    }

    /// Predictions that back a side above the lowest tier.
    pub fn actionable(&self) -> impl Iterator<Item = &Prediction> {
        self.predictions.iter().filter(|p| p.is_actionable())
    }
}

/// Runs the full scoring pipeline for one model profile.
#[derive(Debug, Clone)]
pub struct Predictor {
    profile: ModelProfile,
    projection: ProjectionEngine,
    edges: EdgeCalculator,
    facts: FactBuilder,
    scorer: FlagScorer,
    classifier: TierClassifier,
}

impl Predictor {
    /// Resolves every configured component.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` for invalid weights, thresholds, or flag
    /// rules that do not match the registry.
    pub fn new(profile: &ModelProfile, registry: &SignalRegistry) -> EngineResult<Self> {
        profile.validate()?;
        Ok(Self {
            projection: ProjectionEngine::new(profile.projection.clone(), profile.precision)?,
            edges: EdgeCalculator::new(profile.min_edge_pct, profile.precision),
            facts: FactBuilder::new(profile.projection.recent_window),
            scorer: FlagScorer::resolve(&profile.flags, registry)?,
            classifier: TierClassifier::new(&profile.tiers)?,
            profile: profile.clone(),
        })
    }

    #[must_use]
    pub fn profile(&self) -> &ModelProfile {
        &self.profile
    }

    /// Scores one fixture.
    ///
    /// Spread fixtures project the home margin and express it as a home
    /// spread (the margin negated) before comparing with the line.
    ///
    /// # Errors
    /// Returns the first error met: `InsufficientData`, `MissingLine`, or
    /// `DataIntegrity`.
    pub fn predict<R>(
        &self,
        repo: &R,
        ctx: &PredictionContext,
        fixture: &Fixture,
    ) -> EngineResult<Prediction>
    where
        R: StatRepository + ?Sized,
    {
        fixture.validate()?;
        let projection = self.projection.project(repo, ctx, fixture)?;
        let projection = match fixture.market {
            MarketType::Spread => projection.negated(),
            MarketType::Total | MarketType::PlayerProp => projection,
        };

        let edge = self.edges.for_fixture(repo, ctx, fixture, &projection)?;
        let facts = self.facts.build(repo, ctx, fixture)?;

        let signal_ctx = SignalContext {
            entity_id: fixture.entity_id.clone(),
            opponent_id: fixture.opponent_id.clone(),
            date: fixture.date,
            market: fixture.market,
            side: fixture.side,
            projection: projection.value,
            line: edge.line,
            raw_edge: edge.raw_edge,
            edge_pct: edge.edge_pct,
            pick: edge.pick,
            facts,
        };
        let flag_score = self.scorer.score(&signal_ctx);

        let tier_score = round_to(
            self.classifier.score_for(&flag_score, &edge),
            self.profile.precision,
        );
        // A prediction that backs no side cannot be bet, whatever its score.
        let tier = if edge.pick.is_some() {
            self.classifier.classify(tier_score)
        } else {
            Tier::Skip
        };

        tracing::debug!(
            entity = %fixture.entity_id,
            date = %fixture.date,
            projection = projection.value,
            line = edge.line,
            edge = edge.raw_edge,
            score = flag_score.total,
            tier = %tier,
            "prediction scored"
        );

        Ok(Prediction {
            fixture: fixture.clone(),
            as_of: ctx.as_of,
            projection,
            edge,
            flag_score,
            tier_score,
            tier,
        })
    }

    /// Scores every fixture on a date's slate for this profile's market.
    ///
    /// Fixtures for other markets are ignored. Per-entity failures are
    /// collected in `skipped`.
    ///
    /// # Errors
    /// Returns an error only when the slate itself cannot be read.
    pub fn predict_slate<R>(
        &self,
        repo: &R,
        ctx: &PredictionContext,
        date: NaiveDate,
    ) -> EngineResult<BatchResult>
    where
        R: StatRepository + ?Sized,
    {
        let fixtures: Vec<Fixture> = repo
            .slate(date)?
            .into_iter()
            .filter(|f| f.market == self.profile.market)
            .collect();

        let mut batch = BatchResult::default();
        for fixture in &fixtures {
            match self.predict(repo, ctx, fixture) {
                Ok(prediction) => batch.predictions.push(prediction),
                Err(e) => {
                    tracing::debug!(
                        entity = %fixture.entity_id,
                        date = %date,
                        error = %e,
                        "entity skipped"
                    );
                    batch.skipped.push(SkippedEntity::new(fixture, &e));
                }
            }
        }

        tracing::debug!(
            date = %date,
            predictions = batch.predictions.len(),
            skipped = batch.skipped.len(),
            "slate scored"
        );
        Ok(batch)
    }
}
