//! CSV loaders for stats, lines, and slates.
//!
//! Stats are stored long: one row per statistic, grouped back into records
//! by (entity, date, window, recorded_at).
//!
//! ```text
//! stats:   entity_id,opponent_id,date,recorded_at,side,window,season,stat,value
//! lines:   entity_id,market,date,value,captured_at
//! slate:   date,entity_id,opponent_id,side,market,stat[,position]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use axiom_core::{DataConfig, Fixture, MarketLine, SampleWindow, Side, StatRecord};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::memory::InMemoryStatRepository;

#[derive(Debug, Deserialize)]
struct StatRow {
    entity_id: String,
    opponent_id: Option<String>,
    date: NaiveDate,
    recorded_at: DateTime<Utc>,
    side: Side,
    window: SampleWindow,
    season: String,
    stat: String,
    value: f64,
}

pub struct CsvStorage;

impl CsvStorage {
    /// Reads long-format stat rows and groups them into records.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, a row is malformed, or
    /// rows of one record disagree on opponent, side, or season.
    pub fn read_stats(path: impl AsRef<Path>) -> Result<Vec<StatRecord>> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open stats CSV: {}", path.display()))?;

        let mut grouped: BTreeMap<(String, NaiveDate, String, DateTime<Utc>), StatRecord> =
            BTreeMap::new();

        for (i, row) in reader.deserialize::<StatRow>().enumerate() {
            let row = row.with_context(|| format!("{}: bad stat row {}", path.display(), i + 1))?;
            let key = (
                row.entity_id.clone(),
                row.date,
                row.window.to_string(),
                row.recorded_at,
            );
            let record = grouped.entry(key).or_insert_with(|| StatRecord {
                entity_id: row.entity_id.clone(),
                opponent_id: row.opponent_id.clone(),
                date: row.date,
                season: row.season.clone(),
                side: row.side,
                window: row.window,
                recorded_at: row.recorded_at,
                stats: BTreeMap::new(),
            });
            if record.opponent_id != row.opponent_id
                || record.side != row.side
                || record.season != row.season
            {
                bail!(
                    "{}: row {} disagrees with earlier rows for {} on {}",
                    path.display(),
                    i + 1,
                    row.entity_id,
                    row.date
                );
            }
            record.stats.insert(row.stat, row.value);
        }

        Ok(grouped.into_values().collect())
    }

    /// # Errors
    /// Returns an error if the file cannot be read or a row is malformed.
    pub fn read_lines(path: impl AsRef<Path>) -> Result<Vec<MarketLine>> {
        Self::read_rows(path.as_ref(), "lines")
    }

    /// # Errors
    /// Returns an error if the file cannot be read or a row is malformed.
    pub fn read_slate(path: impl AsRef<Path>) -> Result<Vec<Fixture>> {
        Self::read_rows(path.as_ref(), "slate")
    }

    fn read_rows<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<Vec<T>> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open {what} CSV: {}", path.display()))?;
        reader
            .deserialize()
            .enumerate()
            .map(|(i, row)| {
                row.with_context(|| format!("{}: bad {what} row {}", path.display(), i + 1))
            })
            .collect()
    }

    /// Loads stats, lines, and slates named in the data configuration.
    ///
    /// # Errors
    /// Returns an error if any file cannot be read.
    pub fn load_repository(config: &DataConfig) -> Result<InMemoryStatRepository> {
        let mut repo = InMemoryStatRepository::new();
        repo.extend_records(Self::read_stats(&config.stats_path)?);
        repo.extend_lines(Self::read_lines(&config.lines_path)?);
        repo.extend_fixtures(Self::read_slate(&config.slate_path)?);

        tracing::info!(
            records = repo.record_count(),
            lines = repo.line_count(),
            dates = repo.slate_dates().len(),
            "loaded stat repository"
        );
        Ok(repo)
    }
}
