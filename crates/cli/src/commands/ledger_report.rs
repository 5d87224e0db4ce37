//! Ledger report CLI command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use axiom_backtest::BacktestReport;
use axiom_core::{AppConfig, ResultLedger};
use axiom_data::CsvLedger;
use clap::Args;

use super::OutputFormat;

/// Arguments for the ledger-report command.
#[derive(Args, Debug, Clone)]
pub struct LedgerReportArgs {
    /// Ledger path (defaults to data.ledger_path)
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,

    /// Write the report to this path instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run_ledger_report(args: LedgerReportArgs, config: &AppConfig) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let path = args.ledger.unwrap_or_else(|| config.data.ledger_path.clone());
    let ledger = CsvLedger::open(&path)?;

    let report = BacktestReport::from_outcomes(
        &config.model.name,
        ledger.records(),
        &config.model.tiers,
        &config.backtest,
    );
    tracing::info!(
        path = %path.display(),
        records = ledger.records().len(),
        "ledger report built"
    );

    let rendered = match format {
        OutputFormat::Text => report.to_text(),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        }
    };
    super::emit(&rendered, args.output.as_deref())
}
