//! CLI commands for the prediction engine.

pub mod backtest;
pub mod ledger_report;
pub mod predict;
pub mod settle;

pub use backtest::{run_backtest, BacktestArgs};
pub use ledger_report::{run_ledger_report, LedgerReportArgs};
pub use predict::{run_predict, PredictArgs};
pub use settle::{run_settle, SettleArgs};

use anyhow::{anyhow, Result};

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Parses an output format from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!(
                "Unknown format: '{}'. Valid formats: text, json",
                s
            )),
        }
    }
}

/// Writes `contents` to `path`, or stdout when no path is given.
pub fn emit(contents: &str, path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, contents)?;
            tracing::info!(path = %path.display(), "output written");
        }
        None => println!("{contents}"),
    }
    Ok(())
}
