use std::path::PathBuf;

use anyhow::Result;
use axiom_core::{AppConfig, ConfigLoader};
use clap::{Parser, Subcommand};

mod commands;

use commands::{BacktestArgs, LedgerReportArgs, PredictArgs, SettleArgs};

#[derive(Parser)]
#[command(name = "axiom")]
#[command(about = "Sports prediction scoring and tier validation", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = axiom_core::config_loader::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Profile overlay, read from axiom.<profile>.toml next to the config file
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Built-in model preset (nba_spread, nba_points_prop)
    #[arg(long, global = true, conflicts_with = "profile")]
    preset: Option<String>,

    /// Optional log file path (logs to file instead of stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a date's slate
    Predict(PredictArgs),
    /// Replay the pipeline over a date range and report hit rates per tier
    Backtest(BacktestArgs),
    /// Grade stored predictions and append them to the ledger
    Settle(SettleArgs),
    /// Per-tier report from the result ledger
    LedgerReport(LedgerReportArgs),
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    match (&cli.profile, &cli.preset) {
        (Some(profile), _) => ConfigLoader::load_with_profile(&cli.config, profile),
        (None, Some(preset)) => ConfigLoader::load_with_preset(&cli.config, preset),
        (None, None) => ConfigLoader::load_from(&cli.config),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    let config = load_config(&cli)?;
    tracing::info!(
        config = %cli.config.display(),
        profile = %config.model.name,
        market = %config.model.market,
        "configuration ready"
    );

    match cli.command {
        Commands::Predict(args) => commands::run_predict(args, &config)?,
        Commands::Backtest(args) => commands::run_backtest(args, config).await?,
        Commands::Settle(args) => commands::run_settle(args, &config)?,
        Commands::LedgerReport(args) => commands::run_ledger_report(args, &config)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn backtest_arguments_parse() {
        let cli = Cli::try_parse_from([
            "axiom",
            "backtest",
            "--start",
            "2026-01-01",
            "--end",
            "2026-01-31",
            "--parallel",
            "--format",
            "json",
            "--preset",
            "nba_points_prop",
        ])
        .unwrap();
        assert_eq!(cli.preset.as_deref(), Some("nba_points_prop"));
        let Commands::Backtest(args) = cli.command else {
            panic!("expected backtest");
        };
        assert!(args.parallel);
        assert_eq!(args.format, "json");
        assert_eq!(args.start.to_string(), "2026-01-01");
    }

    #[test]
    fn profile_and_preset_conflict() {
        let parsed = Cli::try_parse_from([
            "axiom",
            "--profile",
            "mlb",
            "--preset",
            "nba_spread",
            "ledger-report",
        ]);
        assert!(parsed.is_err());
    }
}
