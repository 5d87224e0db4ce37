//! Point-in-time views for replay.
//!
//! A backtest must never use information that was not available when the
//! pick would have been made. Each simulated date borrows the shared
//! repository through a view that caps every query at the decision
//! instant; the pipeline runs against that view alone. Nothing is copied,
//! so concurrent dates share one repository.

use axiom_core::{
    EngineResult, Fixture, MarketLine, MarketType, SampleWindow, StatRecord, StatRepository,
};
use axiom_data::InMemoryStatRepository;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// The instant picks are made on `date`.
#[must_use]
pub fn decision_instant(date: NaiveDate, decision_time: NaiveTime) -> DateTime<Utc> {
    date.and_time(decision_time).and_utc()
}

/// Read-only view of a repository as it stood at one decision instant.
#[derive(Debug)]
pub struct PointInTimeView<'a, R: ?Sized = InMemoryStatRepository> {
    source: &'a R,
    date: NaiveDate,
    as_of: DateTime<Utc>,
}

impl<R: ?Sized> Clone for PointInTimeView<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: ?Sized> Copy for PointInTimeView<'_, R> {}

impl<'a, R: StatRepository + ?Sized> PointInTimeView<'a, R> {
    #[must_use]
    pub fn new(source: &'a R, date: NaiveDate, decision_time: NaiveTime) -> Self {
        Self {
            source,
            date,
            as_of: decision_instant(date, decision_time),
        }
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }
}

/// Every query is answered at the earlier of the requested instant and the
/// decision instant.
impl<R: StatRepository + ?Sized> StatRepository for PointInTimeView<'_, R> {
    fn records(
        &self,
        entity_id: &str,
        window: SampleWindow,
        as_of: DateTime<Utc>,
    ) -> Vec<&StatRecord> {
        self.source.records(entity_id, window, as_of.min(self.as_of))
    }

    fn latest_line(
        &self,
        entity_id: &str,
        market: MarketType,
        date: NaiveDate,
        as_of: DateTime<Utc>,
    ) -> Option<&MarketLine> {
        self.source.latest_line(entity_id, market, date, as_of.min(self.as_of))
    }

    /// Slates are schedules, not observations, and pass through unfiltered.
    fn slate(&self, date: NaiveDate) -> EngineResult<Vec<Fixture>> {
        self.source.slate(date)
    }
}
