//! Situational facts for signal evaluation.
//!
//! Facts are plain numbers keyed by the names in [`axiom_core::signal::facts`],
//! derived from the same point-in-time view as the projection.

use std::collections::BTreeMap;

use axiom_core::signal::facts;
use axiom_core::{
    EngineError, EngineResult, Fixture, PredictionContext, SampleWindow, StatRepository,
};
use chrono::Duration;

use crate::history::{latest_record, mean, std_dev, GameLog};

/// Stat name carrying playing time in game records.
pub const MINUTES_STAT: &str = "minutes";

/// Stat name carrying the injury adjustment in situational records.
pub const INJURY_ADJUSTMENT_STAT: &str = "injury_adjustment";

/// Derives the facts the built-in signals read.
#[derive(Debug, Clone, Copy)]
pub struct FactBuilder {
    recent_window: usize,
}

impl FactBuilder {
    #[must_use]
    pub fn new(recent_window: usize) -> Self {
        Self { recent_window }
    }

    /// # Errors
    /// Returns `DataIntegrity` when visible records hold non-finite values.
    pub fn build<R>(
        &self,
        repo: &R,
        ctx: &PredictionContext,
        fixture: &Fixture,
    ) -> EngineResult<BTreeMap<String, f64>>
    where
        R: StatRepository + ?Sized,
    {
        let stat = fixture.stat.as_str();
        let yesterday = fixture.date - Duration::days(1);
        let entity_log = GameLog::load(repo, &fixture.entity_id, fixture.date, ctx.as_of)?;
        let opponent_log = GameLog::load(repo, &fixture.opponent_id, fixture.date, ctx.as_of)?;

        let mut out = BTreeMap::new();
        let flag = |b: bool| if b { 1.0 } else { 0.0 };

        out.insert(
            facts::ENTITY_BACK_TO_BACK.to_string(),
            flag(entity_log.played_on(yesterday)),
        );
        out.insert(
            facts::OPPONENT_BACK_TO_BACK.to_string(),
            flag(opponent_log.played_on(yesterday)),
        );
        out.insert(
            facts::VS_OPPONENT_GAMES.to_string(),
            entity_log.vs_opponent(stat, &fixture.opponent_id).len() as f64,
        );
        out.insert(
            facts::SEASON_GAMES.to_string(),
            entity_log.season(stat, &ctx.season).len() as f64,
        );

        let recent = entity_log.recent(stat, self.recent_window);
        if let Some(m) = mean(&recent) {
            out.insert(facts::RECENT_MEAN.to_string(), m);
        }
        if let Some(sd) = std_dev(&recent) {
            out.insert(facts::RECENT_STD_DEV.to_string(), sd);
        }
        if let Some(minutes) = mean(&entity_log.recent(MINUTES_STAT, self.recent_window)) {
            out.insert(facts::AVG_MINUTES.to_string(), minutes);
        }

        let injury = latest_record(
            repo,
            &fixture.entity_id,
            SampleWindow::Situational,
            fixture.date,
            ctx.as_of,
            INJURY_ADJUSTMENT_STAT,
        )
        .and_then(|r| r.stat(INJURY_ADJUSTMENT_STAT).map(|v| (r.date, v)));
        let injury_adjustment = match injury {
            Some((date, v)) if !v.is_finite() => {
                return Err(EngineError::integrity(
                    date,
                    format!("{} injury adjustment is {v}", fixture.entity_id),
                ));
            }
            Some((_, v)) => v,
            None => 0.0,
        };
        out.insert(facts::INJURY_ADJUSTMENT.to_string(), injury_adjustment);

        Ok(out)
    }
}
