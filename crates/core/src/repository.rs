//! Seams to the external collaborators: stat storage, ground truth, and the
//! result ledger. Retrieval mechanics live behind these traits.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::prediction::OutcomeRecord;
use crate::types::{Fixture, MarketLine, MarketType, SampleWindow, StatRecord};

/// Explicit replacement for "current season" / "current time" globals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionContext {
    /// Season identifier used for season-to-date averages.
    pub season: String,
    /// Nothing recorded or captured after this instant may be used.
    pub as_of: DateTime<Utc>,
}

impl PredictionContext {
    #[must_use]
    pub fn new(season: impl Into<String>, as_of: DateTime<Utc>) -> Self {
        Self {
            season: season.into(),
            as_of,
        }
    }
}

/// Read-only view over historical statistics and market lines.
///
/// Every query takes the `as_of` instant. Implementations must never
/// return a record with `recorded_at > as_of` or a line with
/// `captured_at > as_of`.
pub trait StatRepository: Send + Sync {
    /// Records for an entity in a window, oldest first.
    fn records(
        &self,
        entity_id: &str,
        window: SampleWindow,
        as_of: DateTime<Utc>,
    ) -> Vec<&StatRecord>;

    /// Most recently captured line for an entity, market, and event date.
    fn latest_line(
        &self,
        entity_id: &str,
        market: MarketType,
        date: NaiveDate,
        as_of: DateTime<Utc>,
    ) -> Option<&MarketLine>;

    /// Last line captured for the event at any time. Only for grading;
    /// predictions must go through [`StatRepository::latest_line`].
    fn closing_line(&self, entity_id: &str, market: MarketType, date: NaiveDate) -> Option<f64> {
        self.latest_line(entity_id, market, date, DateTime::<Utc>::MAX_UTC)
            .map(|l| l.value)
    }

    /// Fixtures scheduled on a date.
    ///
    /// # Errors
    /// Returns `DataIntegrity` when the stored slate is inconsistent.
    fn slate(&self, date: NaiveDate) -> EngineResult<Vec<Fixture>>;
}

/// Source of realized values used to grade picks. Never written by the engine.
pub trait OutcomeSource: Send + Sync {
    /// Realized value for a fixture, or `None` if the event has not completed.
    ///
    /// # Errors
    /// Returns `DataIntegrity` when the stored value is unusable.
    fn actual(
        &self,
        entity_id: &str,
        market: MarketType,
        date: NaiveDate,
    ) -> EngineResult<Option<f64>>;
}

/// Append-only store of graded picks.
pub trait ResultLedger {
    /// Appends a record. Returns `false` when an entry with the same
    /// (date, entity, market) key already exists.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be written.
    fn append(&mut self, record: OutcomeRecord) -> Result<bool>;

    /// All stored records in insertion order.
    fn records(&self) -> &[OutcomeRecord];
}
