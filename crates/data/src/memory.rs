//! In-memory stat repository.
//!
//! Holds every record ever ingested, including corrections and line moves.
//! Queries filter by `as_of`. The repository is immutable once loaded, so
//! worker threads share one instance by reference.

use std::collections::{BTreeMap, HashMap, HashSet};

use axiom_core::{
    EngineError, EngineResult, Fixture, MarketLine, MarketType, SampleWindow, StatRecord,
    StatRepository,
};
use chrono::{DateTime, NaiveDate, Utc};

type RecordKey = (String, SampleWindow);
type LineKey = (String, MarketType, NaiveDate);

#[derive(Debug, Clone, Default)]
pub struct InMemoryStatRepository {
    /// Sorted by (date, recorded_at).
    records: HashMap<RecordKey, Vec<StatRecord>>,
    /// Sorted by captured_at.
    lines: HashMap<LineKey, Vec<MarketLine>>,
    slates: BTreeMap<NaiveDate, Vec<Fixture>>,
}

impl InMemoryStatRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_record(&mut self, record: StatRecord) {
        let bucket = self
            .records
            .entry((record.entity_id.clone(), record.window))
            .or_default();
        let at = bucket.partition_point(|r| (r.date, r.recorded_at) <= (record.date, record.recorded_at));
        bucket.insert(at, record);
    }

    pub fn insert_line(&mut self, line: MarketLine) {
        let bucket = self
            .lines
            .entry((line.entity_id.clone(), line.market, line.date))
            .or_default();
        let at = bucket.partition_point(|l| l.captured_at <= line.captured_at);
        bucket.insert(at, line);
    }

    /// Adds a fixture to its date's slate, in insertion order.
    pub fn insert_fixture(&mut self, fixture: Fixture) {
        self.slates.entry(fixture.date).or_default().push(fixture);
    }

    pub fn extend_records(&mut self, records: impl IntoIterator<Item = StatRecord>) {
        for record in records {
            self.insert_record(record);
        }
    }

    pub fn extend_lines(&mut self, lines: impl IntoIterator<Item = MarketLine>) {
        for line in lines {
            self.insert_line(line);
        }
    }

    pub fn extend_fixtures(&mut self, fixtures: impl IntoIterator<Item = Fixture>) {
        for fixture in fixtures {
            self.insert_fixture(fixture);
        }
    }

    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.values().map(Vec::len).sum()
    }

    /// Dates with a non-empty slate, ascending.
    #[must_use]
    pub fn slate_dates(&self) -> Vec<NaiveDate> {
        self.slates
            .iter()
            .filter(|(_, fixtures)| !fixtures.is_empty())
            .map(|(date, _)| *date)
            .collect()
    }
}

impl StatRepository for InMemoryStatRepository {
    fn records(
        &self,
        entity_id: &str,
        window: SampleWindow,
        as_of: DateTime<Utc>,
    ) -> Vec<&StatRecord> {
        self.records
            .get(&(entity_id.to_string(), window))
            .map(|bucket| bucket.iter().filter(|r| r.recorded_at <= as_of).collect())
            .unwrap_or_default()
    }

    fn latest_line(
        &self,
        entity_id: &str,
        market: MarketType,
        date: NaiveDate,
        as_of: DateTime<Utc>,
    ) -> Option<&MarketLine> {
        self.lines
            .get(&(entity_id.to_string(), market, date))?
            .iter()
            .rev()
            .find(|l| l.captured_at <= as_of)
    }

    fn slate(&self, date: NaiveDate) -> EngineResult<Vec<Fixture>> {
        let fixtures = self.slates.get(&date).cloned().unwrap_or_default();
        let mut seen = HashSet::with_capacity(fixtures.len());
        for f in &fixtures {
            f.validate()?;
            if !seen.insert((f.entity_id.as_str(), f.market)) {
                return Err(EngineError::integrity(
                    date,
                    format!("duplicate {} fixture for {}", f.market, f.entity_id),
                ));
            }
        }
        Ok(fixtures)
    }
}
