//! Tier classification.

use axiom_core::{
    Edge, EngineResult, FlagScore, Tier, TierBasis, TierTableConfig, TierThreshold,
};

/// Maps a score to a tier using a descending threshold table.
#[derive(Debug, Clone, PartialEq)]
pub struct TierClassifier {
    basis: TierBasis,
    thresholds: Vec<TierThreshold>,
}

impl TierClassifier {
    /// Builds a classifier from a validated threshold table.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if the table is empty or not strictly
    /// descending in both score and tier.
    pub fn new(table: &TierTableConfig) -> EngineResult<Self> {
        table.validate()?;
        Ok(Self {
            basis: table.basis,
            thresholds: table.thresholds.clone(),
        })
    }

    #[must_use]
    pub fn basis(&self) -> TierBasis {
        self.basis
    }

    /// Highest tier whose minimum the score reaches. A score equal to a
    /// threshold belongs to that threshold's tier. Scores below every
    /// threshold fall to `Skip`.
    #[must_use]
    pub fn classify(&self, score: f64) -> Tier {
        if score.is_nan() {
            return Tier::Skip;
        }
        self.thresholds
            .iter()
            .find(|t| score >= t.min_score)
            .map_or(Tier::Skip, |t| t.tier)
    }

    /// Number the table is applied to for a scored edge.
    #[must_use]
    pub fn score_for(&self, flag_score: &FlagScore, edge: &Edge) -> f64 {
        match self.basis {
            TierBasis::FlagScore => f64::from(flag_score.total),
            TierBasis::EdgePercent => edge.edge_pct.abs(),
        }
    }
}
