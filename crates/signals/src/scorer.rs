//! Flag scorer.
//!
//! A generic weighted-predicate sum: each configured rule names a registered
//! signal and a point value, and the score is the sum of points for rules
//! that match. The scorer knows nothing about what the signals mean.

use axiom_core::{
    EngineError, EngineResult, FlagContribution, FlagRuleConfig, FlagScore, SignalContext,
    SignalEvaluator, SignalKind, SignalReading,
};

use crate::registry::SignalRegistry;

/// A flag rule bound to its evaluator.
#[derive(Debug, Clone)]
struct ResolvedRule {
    signal: String,
    kind: SignalKind,
    points: u32,
    equals: Option<String>,
    evaluator: SignalEvaluator,
}

impl ResolvedRule {
    fn matches(&self, reading: &SignalReading) -> bool {
        match (reading, &self.equals) {
            (SignalReading::Flag(fired), None) => *fired,
            (SignalReading::Category(category), Some(expected)) => category == expected,
            _ => {
                tracing::warn!(
                    signal = %self.signal,
                    expected = ?self.kind,
                    got = ?reading.kind(),
                    "signal returned a reading of the wrong kind, not counted"
                );
                false
            }
        }
    }
}

/// Scores a [`SignalContext`] against a fixed set of flag rules.
#[derive(Debug, Clone)]
pub struct FlagScorer {
    rules: Vec<ResolvedRule>,
}

impl FlagScorer {
    /// Binds configured rules to registered signals.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` when a rule names an unknown signal,
    /// sets `equals` on a boolean signal, omits it on a categorical one, or
    /// names a category the signal never produces.
    pub fn resolve(rules: &[FlagRuleConfig], registry: &SignalRegistry) -> EngineResult<Self> {
        let mut resolved = Vec::with_capacity(rules.len());

        for rule in rules {
            let definition = registry.get(&rule.signal).ok_or_else(|| {
                EngineError::config(format!(
                    "unknown signal '{}' (registered: {})",
                    rule.signal,
                    registry.names().join(", ")
                ))
            })?;

            match (definition.kind, rule.equals.as_deref()) {
                (SignalKind::Boolean, Some(category)) => {
                    return Err(EngineError::config(format!(
                        "signal '{}' is boolean but the rule expects category '{category}'",
                        rule.signal
                    )));
                }
                (SignalKind::Categorical, None) => {
                    return Err(EngineError::config(format!(
                        "signal '{}' is categorical and needs an `equals` category",
                        rule.signal
                    )));
                }
                (SignalKind::Categorical, Some(category)) if !definition.has_category(category) => {
                    return Err(EngineError::config(format!(
                        "signal '{}' never produces category '{category}' (expected one of: {})",
                        rule.signal,
                        definition.categories.join(", ")
                    )));
                }
                _ => {}
            }

            resolved.push(ResolvedRule {
                signal: rule.signal.clone(),
                kind: definition.kind,
                points: rule.points,
                equals: rule.equals.clone(),
                evaluator: definition.evaluator,
            });
        }

        Ok(Self { rules: resolved })
    }

    /// Number of configured rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Largest score any context can reach.
    #[must_use]
    pub fn max_score(&self) -> u32 {
        self.rules.iter().map(|r| r.points).sum()
    }

    /// Evaluates every rule and sums the points of those that match.
    #[must_use]
    pub fn score(&self, ctx: &SignalContext) -> FlagScore {
        let contributions = self
            .rules
            .iter()
            .map(|rule| {
                let reading = (rule.evaluator)(ctx);
                FlagContribution {
                    signal: rule.signal.clone(),
                    category: rule.equals.clone(),
                    fired: rule.matches(&reading),
                    reading: reading.to_string(),
                    points: rule.points,
                }
            })
            .collect();

        FlagScore::from_contributions(contributions)
    }
}
