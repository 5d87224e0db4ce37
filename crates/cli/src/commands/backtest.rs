//! Backtest CLI command.
//!
//! Replays the pipeline over a date range using point-in-time views and
//! prints the per-tier report. Ctrl-C stops the run after the current date;
//! the partial report is still printed.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use axiom_backtest::BacktestHarness;
use axiom_core::AppConfig;
use axiom_data::{CsvLedger, CsvStorage, GroundTruth};
use axiom_signals::SignalRegistry;
use axiom_strategy::Predictor;
use chrono::NaiveDate;
use clap::Args;

use super::OutputFormat;

/// Arguments for the backtest command.
#[derive(Args, Debug, Clone)]
pub struct BacktestArgs {
    /// First simulated date (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Last simulated date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end: NaiveDate,

    /// Evaluate dates in parallel (overrides config)
    #[arg(long)]
    pub parallel: bool,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,

    /// Write the report to this path instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Append graded picks to this CSV ledger
    #[arg(long)]
    pub ledger: Option<PathBuf>,
}

pub async fn run_backtest(args: BacktestArgs, config: AppConfig) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;

    let repo = CsvStorage::load_repository(&config.data)?;
    let outcomes = GroundTruth::from_csv(&config.data.outcomes_path)?;
    let predictor = Predictor::new(&config.model, &SignalRegistry::with_builtin())?;

    let mut settings = config.backtest.clone();
    settings.parallel |= args.parallel;
    let harness = BacktestHarness::new(predictor, settings, config.data.clone())?;

    let stop = harness.stop_flag();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Received Ctrl+C, stopping after the current date");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let (start, end) = (args.start, args.end);
    let run = tokio::task::spawn_blocking(move || harness.run(&repo, &outcomes, start, end))
        .await
        .context("backtest task failed")??;
    watcher.abort();

    if let Some(path) = &args.ledger {
        let mut ledger = CsvLedger::open(path)?;
        let appended = run.record_to(&mut ledger)?;
        tracing::info!(
            path = %path.display(),
            appended,
            duplicates = run.graded.len() - appended,
            "ledger updated"
        );
    }

    let rendered = match format {
        OutputFormat::Text => run.report.to_text(),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&run.report).context("Failed to serialize report")?
        }
    };
    super::emit(&rendered, args.output.as_deref())
}
