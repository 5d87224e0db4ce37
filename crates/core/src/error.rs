//! Error taxonomy for the scoring engine.
//!
//! Only `InvalidConfiguration` is fatal. Everything else is handled at the
//! granularity where it occurs: a projection source, an entity, or a date.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors produced by the scoring and backtest pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Not enough historical observations to compute a value.
    #[error("insufficient data for {entity_id} ({what}): need {required}, have {available}")]
    InsufficientData {
        entity_id: String,
        what: String,
        required: usize,
        available: usize,
    },

    /// No market line was published as of the prediction time.
    #[error("no {market} line for {entity_id} on {date}")]
    MissingLine {
        entity_id: String,
        market: String,
        date: NaiveDate,
    },

    /// Configuration is unusable. Detected at load time and never recovered.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Stored records are inconsistent or corrupt.
    #[error("data integrity error on {date}: {reason}")]
    DataIntegrity { date: NaiveDate, reason: String },
}

impl EngineError {
    /// Builds an `InvalidConfiguration` error from anything printable.
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Builds a `DataIntegrity` error for a date.
    pub fn integrity(date: NaiveDate, reason: impl Into<String>) -> Self {
        Self::DataIntegrity {
            date,
            reason: reason.into(),
        }
    }

    /// Returns true for errors that skip a source, entity, or date rather than the run.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidConfiguration(_))
    }

    /// Short machine-readable label used in skip reports and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "insufficient_data",
            Self::MissingLine { .. } => "missing_line",
            Self::InvalidConfiguration(_) => "invalid_configuration",
            Self::DataIntegrity { .. } => "data_integrity",
        }
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_configuration_errors_are_fatal() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert!(EngineError::integrity(date, "nan line").is_recoverable());
        assert!(EngineError::MissingLine {
            entity_id: "BOS".into(),
            market: "spread".into(),
            date,
        }
        .is_recoverable());
        assert!(!EngineError::config("weights").is_recoverable());
    }

    #[test]
    fn messages_name_the_entity() {
        let err = EngineError::InsufficientData {
            entity_id: "LeBron James".into(),
            what: "vs_opponent_avg".into(),
            required: 3,
            available: 1,
        };
        let text = err.to_string();
        assert!(text.contains("LeBron James"));
        assert!(text.contains("need 3, have 1"));
        assert_eq!(err.kind(), "insufficient_data");
    }
}
