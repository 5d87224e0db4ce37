//! Ground-truth realized values.
//!
//! ```text
//! outcomes: entity_id,market,date,actual
//! ```
//!
//! Spread rows hold the realized home margin (home points minus away points).

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use axiom_core::{EngineError, EngineResult, MarketType, OutcomeSource};
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct OutcomeRow {
    entity_id: String,
    market: MarketType,
    date: NaiveDate,
    actual: f64,
}

/// Read-only store of realized values keyed by (entity, market, date).
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    actuals: HashMap<(String, MarketType, NaiveDate), f64>,
}

impl GroundTruth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a realized value. Returns the previous value for the key, if any.
    pub fn insert(
        &mut self,
        entity_id: &str,
        market: MarketType,
        date: NaiveDate,
        actual: f64,
    ) -> Option<f64> {
        self.actuals
            .insert((entity_id.to_string(), market, date), actual)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actuals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actuals.is_empty()
    }

    /// Loads realized values from CSV.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, a row is malformed, or a
    /// key appears twice with different values.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open outcomes CSV: {}", path.display()))?;

        let mut truth = Self::new();
        for (i, row) in reader.deserialize::<OutcomeRow>().enumerate() {
            let row =
                row.with_context(|| format!("{}: bad outcome row {}", path.display(), i + 1))?;
            if let Some(previous) = truth.insert(&row.entity_id, row.market, row.date, row.actual)
            {
                // NaN never equals itself; compare bits so repeated NaN rows pass here
                // and are reported as integrity errors when graded.
                if previous.to_bits() != row.actual.to_bits() {
                    bail!(
                        "{}: conflicting outcomes for {} {} on {} ({previous} vs {})",
                        path.display(),
                        row.entity_id,
                        row.market,
                        row.date,
                        row.actual
                    );
                }
            }
        }

        tracing::info!(outcomes = truth.len(), "loaded ground truth");
        Ok(truth)
    }
}

impl OutcomeSource for GroundTruth {
    fn actual(
        &self,
        entity_id: &str,
        market: MarketType,
        date: NaiveDate,
    ) -> EngineResult<Option<f64>> {
        match self.actuals.get(&(entity_id.to_string(), market, date)) {
            Some(v) if !v.is_finite() => Err(EngineError::integrity(
                date,
                format!("{market} outcome for {entity_id} is {v}"),
            )),
            Some(v) => Ok(Some(*v)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    #[test]
    fn lookup_by_key() {
        let mut truth = GroundTruth::new();
        truth.insert("BOS", MarketType::Spread, date(), 7.0);
        assert_eq!(truth.actual("BOS", MarketType::Spread, date()), Ok(Some(7.0)));
        assert_eq!(truth.actual("BOS", MarketType::Total, date()), Ok(None));
    }

    #[test]
    fn non_finite_actual_is_an_integrity_error() {
        let mut truth = GroundTruth::new();
        truth.insert("BOS", MarketType::Total, date(), f64::INFINITY);
        assert!(matches!(
            truth.actual("BOS", MarketType::Total, date()),
            Err(EngineError::DataIntegrity { .. })
        ));
    }

    #[test]
    fn loads_csv_and_rejects_conflicts() {
        let mut ok = NamedTempFile::new().unwrap();
        write!(
            ok,
            "entity_id,market,date,actual\n\
             BOS,spread,2026-01-05,7\n\
             Jayson Tatum,player_prop,2026-01-05,29\n\
             BOS,spread,2026-01-05,7\n"
        )
        .unwrap();
        let truth = GroundTruth::from_csv(ok.path()).unwrap();
        assert_eq!(truth.len(), 2);
        assert_eq!(
            truth.actual("Jayson Tatum", MarketType::PlayerProp, date()),
            Ok(Some(29.0))
        );

        let mut bad = NamedTempFile::new().unwrap();
        write!(
            bad,
            "entity_id,market,date,actual\n\
             BOS,spread,2026-01-05,7\n\
             BOS,spread,2026-01-05,-3\n"
        )
        .unwrap();
        assert!(GroundTruth::from_csv(bad.path()).is_err());
    }
}
