//! Settle CLI command.
//!
//! Grades predictions written by `predict --json` against ground truth and
//! appends them to the result ledger, with the closing line read from the
//! lines file. Events without a realized value stay
//! pending and can be settled by a later run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use axiom_core::{AppConfig, OutcomeRecord, OutcomeSource, ResultLedger, StatRepository};
use axiom_data::{CsvLedger, CsvStorage, GroundTruth, InMemoryStatRepository};
use axiom_strategy::BatchResult;
use clap::Args;

/// Arguments for the settle command.
#[derive(Args, Debug, Clone)]
pub struct SettleArgs {
    /// Predictions JSON written by `predict --json`
    #[arg(long)]
    pub predictions: PathBuf,

    /// Ledger path (defaults to data.ledger_path)
    #[arg(long)]
    pub ledger: Option<PathBuf>,
}

/// Counts from one settle run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SettleSummary {
    pub graded: usize,
    pub duplicates: usize,
    pub pending: usize,
    pub no_pick: usize,
    pub failed: usize,
}

pub fn run_settle(args: SettleArgs, config: &AppConfig) -> Result<()> {
    let text = std::fs::read_to_string(&args.predictions)
        .with_context(|| format!("Failed to read {}", args.predictions.display()))?;
    let batch: BatchResult = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", args.predictions.display()))?;

    let outcomes = GroundTruth::from_csv(&config.data.outcomes_path)?;
    let mut lines = InMemoryStatRepository::new();
    if config.data.lines_path.exists() {
        lines.extend_lines(CsvStorage::read_lines(&config.data.lines_path)?);
    } else {
        tracing::warn!(path = %config.data.lines_path.display(), "no lines file, closing lines unknown");
    }
    let path = args.ledger.unwrap_or_else(|| config.data.ledger_path.clone());
    let mut ledger = CsvLedger::open(&path)?;

    let summary = settle_batch(&batch, &outcomes, &lines, &mut ledger)?;
    tracing::info!(
        path = %path.display(),
        graded = summary.graded,
        duplicates = summary.duplicates,
        pending = summary.pending,
        "settled"
    );
    println!(
        "graded: {}  already in ledger: {}  pending: {}  no pick: {}  failed: {}",
        summary.graded, summary.duplicates, summary.pending, summary.no_pick, summary.failed
    );
    Ok(())
}

/// Grades each prediction that backs a side. Bad ground truth for one entity
/// is logged and counted; it does not stop the others.
pub fn settle_batch(
    batch: &BatchResult,
    outcomes: &dyn OutcomeSource,
    lines: &dyn StatRepository,
    ledger: &mut dyn ResultLedger,
) -> Result<SettleSummary> {
    let mut summary = SettleSummary::default();

    for prediction in &batch.predictions {
        let fixture = &prediction.fixture;
        if prediction.pick().is_none() {
            summary.no_pick += 1;
            continue;
        }
        let actual = match outcomes.actual(&fixture.entity_id, fixture.market, fixture.date) {
            Ok(Some(actual)) => actual,
            Ok(None) => {
                summary.pending += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!(entity = %fixture.entity_id, date = %fixture.date, error = %e, "cannot settle");
                summary.failed += 1;
                continue;
            }
        };
        let Some(record) = OutcomeRecord::settle(prediction, actual) else {
            summary.no_pick += 1;
            continue;
        };
        let closing = lines.closing_line(&fixture.entity_id, fixture.market, fixture.date);
        if ledger.append(record.with_closing_line(closing))? {
            summary.graded += 1;
        } else {
            summary.duplicates += 1;
        }
    }
    Ok(summary)
}
