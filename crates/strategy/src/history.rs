//! Point-in-time game history for one entity.
//!
//! A [`GameLog`] holds the completed games an entity had played strictly
//! before a fixture date, as visible at the prediction's `as_of` instant.
//! When a game was re-recorded (a stat correction), the latest version
//! visible at `as_of` is used.

use std::collections::BTreeMap;

use axiom_core::{EngineError, EngineResult, SampleWindow, StatRecord, StatRepository};
use chrono::{DateTime, NaiveDate, Utc};

/// Completed games for an entity, oldest first, one record per date.
#[derive(Debug, Clone)]
pub struct GameLog<'a> {
    games: Vec<&'a StatRecord>,
}

impl<'a> GameLog<'a> {
    /// Loads games dated before `before` and recorded no later than `as_of`.
    ///
    /// # Errors
    /// Returns `DataIntegrity` when a visible game carries a NaN or infinite
    /// statistic.
    pub fn load<R>(
        repo: &'a R,
        entity_id: &str,
        before: NaiveDate,
        as_of: DateTime<Utc>,
    ) -> EngineResult<Self>
    where
        R: StatRepository + ?Sized,
    {
        let mut by_date: BTreeMap<NaiveDate, &'a StatRecord> = BTreeMap::new();

        for record in repo.records(entity_id, SampleWindow::Game, as_of) {
            if record.date >= before {
                continue;
            }
            if let Some((stat, value)) = record.first_non_finite() {
                return Err(EngineError::integrity(
                    record.date,
                    format!("{entity_id} has non-finite {stat} ({value})"),
                ));
            }
            by_date
                .entry(record.date)
                .and_modify(|existing| {
                    if record.recorded_at > existing.recorded_at {
                        *existing = record;
                    }
                })
                .or_insert(record);
        }

        Ok(Self {
            games: by_date.into_values().collect(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.games.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// True when the entity has a game on `date`.
    #[must_use]
    pub fn played_on(&self, date: NaiveDate) -> bool {
        self.games
            .binary_search_by_key(&date, |g| g.date)
            .is_ok()
    }

    /// Values of a stat over the last `n` games that recorded it.
    #[must_use]
    pub fn recent(&self, stat: &str, n: usize) -> Vec<f64> {
        let mut values: Vec<f64> = self
            .games
            .iter()
            .rev()
            .filter_map(|g| g.stat(stat))
            .take(n)
            .collect();
        values.reverse();
        values
    }

    /// Values of a stat over games in one season.
    #[must_use]
    pub fn season(&self, stat: &str, season: &str) -> Vec<f64> {
        self.games
            .iter()
            .filter(|g| g.season == season)
            .filter_map(|g| g.stat(stat))
            .collect()
    }

    /// Values of a stat over games against one opponent, any season.
    #[must_use]
    pub fn vs_opponent(&self, stat: &str, opponent_id: &str) -> Vec<f64> {
        self.games
            .iter()
            .filter(|g| g.opponent_id.as_deref() == Some(opponent_id))
            .filter_map(|g| g.stat(stat))
            .collect()
    }
}

/// Latest record in a window dated on or before `date`, visible at `as_of`.
pub fn latest_record<'a, R>(
    repo: &'a R,
    entity_id: &str,
    window: SampleWindow,
    date: NaiveDate,
    as_of: DateTime<Utc>,
    stat: &str,
) -> Option<&'a StatRecord>
where
    R: StatRepository + ?Sized,
{
    repo.records(entity_id, window, as_of)
        .into_iter()
        .filter(|r| r.date <= date && r.stat(stat).is_some())
        .max_by_key(|r| (r.date, r.recorded_at))
}

/// Arithmetic mean. `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation. `None` with fewer than two values.
#[must_use]
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}
