//! Result ledgers: append-only stores of graded picks.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axiom_core::{MarketType, OutcomeRecord, ResultLedger};
use chrono::NaiveDate;

type LedgerKey = (NaiveDate, String, MarketType);

const LEDGER_COLUMNS: [&str; 10] = [
    "entity_id",
    "market",
    "date",
    "tier",
    "pick",
    "line",
    "actual",
    "result",
    "closing_line",
    "clv",
];

fn key_of(record: &OutcomeRecord) -> LedgerKey {
    (record.date, record.entity_id.clone(), record.market)
}

/// Ledger held in memory. Used by backtests and as the index behind [`CsvLedger`].
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    records: Vec<OutcomeRecord>,
    keys: HashSet<LedgerKey>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, record: &OutcomeRecord) -> bool {
        self.keys.contains(&key_of(record))
    }

    fn push(&mut self, record: OutcomeRecord) -> bool {
        if !self.keys.insert(key_of(&record)) {
            return false;
        }
        self.records.push(record);
        true
    }
}

impl ResultLedger for MemoryLedger {
    fn append(&mut self, record: OutcomeRecord) -> Result<bool> {
        Ok(self.push(record))
    }

    fn records(&self) -> &[OutcomeRecord] {
        &self.records
    }
}

/// Ledger persisted as an append-only CSV file.
///
/// ```text
/// entity_id,market,date,tier,pick,line,actual,result,closing_line,clv
/// ```
///
/// Files written before the closing-line columns existed still load; the
/// file is rewritten with the current header before the next append.
#[derive(Debug)]
pub struct CsvLedger {
    path: PathBuf,
    index: MemoryLedger,
    stale_header: bool,
}

impl CsvLedger {
    /// Opens a ledger, loading existing rows. A missing file is an empty ledger.
    ///
    /// # Errors
    /// Returns an error if an existing file cannot be parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut index = MemoryLedger::new();
        let mut stale_header = false;

        if path.exists() {
            let mut reader = csv::Reader::from_path(&path)
                .with_context(|| format!("Failed to open ledger: {}", path.display()))?;
            let headers = reader.headers()?;
            stale_header = !headers.is_empty() && !headers.iter().eq(LEDGER_COLUMNS);
            for (i, row) in reader.deserialize::<OutcomeRecord>().enumerate() {
                let record = row
                    .with_context(|| format!("{}: bad ledger row {}", path.display(), i + 1))?;
                if !index.push(record) {
                    tracing::warn!(path = %path.display(), row = i + 1, "duplicate ledger row ignored");
                }
            }
        }

        tracing::debug!(path = %path.display(), records = index.records.len(), "ledger opened");
        Ok(Self {
            path,
            index,
            stale_header,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrites every held row under the current header.
    fn rewrite(&mut self) -> Result<()> {
        let staging = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&staging)
                .with_context(|| format!("Failed to create {}", staging.display()))?;
            for record in self.index.records() {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        std::fs::rename(&staging, &self.path)
            .with_context(|| format!("Failed to replace ledger: {}", self.path.display()))?;
        tracing::info!(path = %self.path.display(), records = self.index.records.len(), "ledger header upgraded");
        self.stale_header = false;
        Ok(())
    }
}

impl ResultLedger for CsvLedger {
    fn append(&mut self, record: OutcomeRecord) -> Result<bool> {
        if self.index.contains(&record) {
            return Ok(false);
        }
        if self.stale_header {
            self.rewrite()?;
        }

        let needs_header = std::fs::metadata(&self.path).map_or(true, |m| m.len() == 0);
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open ledger for append: {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(&record)?;
        writer.flush()?;

        Ok(self.index.push(record))
    }

    fn records(&self) -> &[OutcomeRecord] {
        self.index.records()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axiom_core::{BetResult, PickSide, Tier};
    use tempfile::tempdir;

    fn outcome(entity: &str, d: u32, result: BetResult) -> OutcomeRecord {
        OutcomeRecord {
            entity_id: entity.into(),
            market: MarketType::Spread,
            date: NaiveDate::from_ymd_opt(2026, 1, d).unwrap(),
            tier: Tier::Gold,
            pick: PickSide::Home,
            line: -3.5,
            actual: 6.0,
            result,
            closing_line: None,
            clv: None,
        }
    }

    #[test]
    fn memory_ledger_deduplicates() {
        let mut ledger = MemoryLedger::new();
        assert!(ledger.append(outcome("BOS", 1, BetResult::Win)).unwrap());
        assert!(!ledger.append(outcome("BOS", 1, BetResult::Loss)).unwrap());
        assert!(ledger.append(outcome("BOS", 2, BetResult::Loss)).unwrap());
        assert_eq!(ledger.records().len(), 2);
        assert_eq!(ledger.records()[0].result, BetResult::Win);
    }

    #[test]
    fn csv_ledger_persists_across_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("results.csv");

        {
            let mut ledger = CsvLedger::open(&path).unwrap();
            assert!(ledger.records().is_empty());
            assert!(ledger.append(outcome("BOS", 1, BetResult::Win)).unwrap());
            assert!(ledger.append(outcome("DEN", 1, BetResult::Push)).unwrap());
        }

        let mut reopened = CsvLedger::open(&path).unwrap();
        assert_eq!(reopened.records().len(), 2);
        assert_eq!(reopened.records()[1], outcome("DEN", 1, BetResult::Push));
        assert!(!reopened.append(outcome("BOS", 1, BetResult::Loss)).unwrap());
        assert!(reopened.append(outcome("BOS", 2, BetResult::Loss)).unwrap());

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 4, "header plus three rows:\n{text}");
        assert!(text.starts_with("entity_id,market,date,tier,pick,line,actual,result,closing_line,clv"));
    }

    #[test]
    fn csv_ledger_keeps_closing_line_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let graded = OutcomeRecord {
            closing_line: Some(-5.0),
            clv: Some(1.5),
            ..outcome("BOS", 1, BetResult::Win)
        };

        CsvLedger::open(&path).unwrap().append(graded.clone()).unwrap();
        let reopened = CsvLedger::open(&path).unwrap();
        assert_eq!(reopened.records(), &[graded]);
    }

    #[test]
    fn ledger_without_closing_columns_still_loads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");
        std::fs::write(
            &path,
            "entity_id,market,date,tier,pick,line,actual,result\n\
             BOS,spread,2026-01-01,GOLD,HOME,-3.5,6.0,WIN\n",
        )
        .unwrap();

        let mut ledger = CsvLedger::open(&path).unwrap();
        assert_eq!(ledger.records(), &[outcome("BOS", 1, BetResult::Win)]);
        assert!(ledger.append(outcome("BOS", 2, BetResult::Loss)).unwrap());

        let reopened = CsvLedger::open(&path).unwrap();
        assert_eq!(reopened.records().len(), 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("entity_id,market,date,tier,pick,line,actual,result,closing_line,clv"));
    }
}
