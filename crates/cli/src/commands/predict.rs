//! Predict CLI command.
//!
//! Scores every fixture on a date's slate and prints the predictions next to
//! the entities that were skipped.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use axiom_core::{AppConfig, PredictionContext};
use axiom_data::CsvStorage;
use axiom_signals::SignalRegistry;
use axiom_strategy::{BatchResult, Predictor};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;

/// Arguments for the predict command.
#[derive(Args, Debug, Clone)]
pub struct PredictArgs {
    /// Slate date (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,

    /// Decision instant (RFC 3339); defaults to now
    #[arg(long)]
    pub as_of: Option<DateTime<Utc>>,

    /// Write the full batch as JSON to this path
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Only print predictions above the lowest tier
    #[arg(long)]
    pub actionable_only: bool,
}

pub fn run_predict(args: PredictArgs, config: &AppConfig) -> Result<()> {
    let repo = CsvStorage::load_repository(&config.data)?;
    let predictor = Predictor::new(&config.model, &SignalRegistry::with_builtin())?;

    let as_of = args.as_of.unwrap_or_else(Utc::now);
    let ctx = PredictionContext::new(config.data.season_for(args.date), as_of);
    let batch = predictor.predict_slate(&repo, &ctx, args.date)?;

    tracing::info!(
        date = %args.date,
        %as_of,
        predictions = batch.predictions.len(),
        actionable = batch.actionable().count(),
        skipped = batch.skipped.len(),
        "slate scored"
    );

    print!("{}", format_batch(&batch, args.actionable_only));

    if let Some(path) = &args.json {
        let json = serde_json::to_string_pretty(&batch).context("Failed to serialize batch")?;
        super::emit(&json, Some(path))?;
    }
    Ok(())
}

fn format_batch(batch: &BatchResult, actionable_only: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<24} {:<8} {:>9} {:>8} {:>8} {:>9} {:<6} {:>5} {:<9} flags",
        "entity", "vs", "proj", "line", "edge", "edge %", "pick", "score", "tier"
    );
    let _ = writeln!(out, "{}", "-".repeat(110));

    for p in &batch.predictions {
        if actionable_only && !p.is_actionable() {
            continue;
        }
        let pick = p.pick().map_or_else(|| "-".to_string(), |s| s.to_string());
        let _ = writeln!(
            out,
            "{:<24} {:<8} {:>9.2} {:>8.1} {:>8.2} {:>8.2}% {:<6} {:>5} {:<9} {}",
            p.fixture.entity_id,
            p.fixture.opponent_id,
            p.projection.value,
            p.edge.line,
            p.edge.raw_edge,
            p.edge.edge_pct,
            pick,
            p.flag_score.total,
            p.tier.as_str(),
            p.flag_score.fired().join(",")
        );
    }

    if !batch.skipped.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "skipped:");
        for s in &batch.skipped {
            let _ = writeln!(out, "  {:<24} [{}] {}", s.fixture.entity_id, s.kind, s.reason);
        }
    }
    out
}
