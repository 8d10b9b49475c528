// In app/src/main.rs

use anyhow::{Context, Result};
use api_client::ApiClient;
use app_config::{LiveConfig, Settings};
use chrono::Utc;
use clap::{Parser, Subcommand};
use engine::{AssetAnalysis, AssetOutcome, CycleReport, Engine, PortfolioStatus};
use execution::{Executor, LiveExecutor, PaperExecutor};
use std::time::Duration;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

mod backtests;

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Buys Binance futures near their rolling price floor, and backtests the idea."
)]
struct Cli {
    /// Print results as JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs trading cycles until Ctrl-C.
    Run,

    /// Runs a single trading cycle and exits.
    Cycle,

    /// Shows position values, capacity and buy blocks of every traded asset.
    Status,

    /// Shows where every traded asset sits against its window low, without trading.
    Analyze,

    /// Round-trip take-profit / stop-loss backtest over recent history.
    Backtest {
        /// Symbols to test (defaults to the enabled pairs of live.toml).
        #[arg(short, long, num_args = 1..)]
        symbols: Vec<String>,

        /// Days of history to fetch.
        #[arg(long, default_value_t = 1)]
        days: u32,
    },

    /// Buy-only accumulation backtest over recent history.
    Accumulate {
        #[arg(short, long)]
        symbol: String,

        #[arg(long, default_value_t = 7)]
        days: u32,

        /// Overrides the configured buy range, in percent.
        #[arg(long)]
        range_pct: Option<f64>,
    },

    /// Runs the accumulation backtest once per candidate range and picks the best.
    Sweep {
        #[arg(short, long)]
        symbol: String,

        #[arg(long, default_value_t = 7)]
        days: u32,
    },
}

// --- Main Application Entry Point ---

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from a .env file, if it exists.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = app_config::load_settings().context("Failed to load settings")?;
    init_tracing(&settings.app.log_level)?;

    // Nothing runs on parameters that fail validation.
    settings.validate().context("Invalid settings")?;
    tracing::info!(environment = %settings.app.environment, "Settings loaded");

    match cli.command {
        Commands::Run => handle_run(&settings).await?,
        Commands::Cycle => handle_cycle(&settings, cli.json).await?,
        Commands::Status => handle_status(&settings, cli.json).await?,
        Commands::Analyze => handle_analyze(&settings, cli.json).await?,
        Commands::Backtest { symbols, days } => {
            backtests::handle_backtest(&settings, symbols, days, cli.json).await?
        }
        Commands::Accumulate {
            symbol,
            days,
            range_pct,
        } => backtests::handle_accumulate(&settings, symbol, days, range_pct, cli.json).await?,
        Commands::Sweep { symbol, days } => {
            backtests::handle_sweep(&settings, symbol, days, cli.json).await?
        }
    }

    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let level: tracing::Level = log_level
        .parse()
        .with_context(|| format!("Unknown log level '{log_level}'"))?;
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(
        Targets::new()
            .with_target("reqwest", tracing::Level::WARN)
            .with_target("hyper", tracing::Level::WARN)
            .with_default(level),
    );
    tracing_subscriber::registry().with(fmt_layer).init();
    Ok(())
}

/// Builds the live engine over the enabled pairs of `config/live.toml`.
///
/// Orders go to the exchange only when `live.live_trading_enabled` is set.
fn build_engine(settings: &Settings) -> Result<Engine> {
    let live_config: LiveConfig = app_config::load_live_config().context("Failed to load config/live.toml")?;
    let symbols = live_config.enabled_symbols();
    let api_client = ApiClient::new(&settings.binance)?;

    let executor: Box<dyn Executor> = if settings.live.live_trading_enabled {
        if !settings.binance.has_credentials() {
            anyhow::bail!("Live trading needs binance.api_key and binance.secret_key.");
        }
        tracing::warn!("LIVE TRADING IS ENABLED. REAL ORDERS WILL BE PLACED.");
        Box::new(LiveExecutor::new(api_client.clone()))
    } else {
        tracing::info!("Paper trading: orders are simulated.");
        Box::new(PaperExecutor::new(&settings.paper)?)
    };

    tracing::info!(
        assets = symbols.len(),
        position_value_usd = settings.live.position_value_usd,
        max_position_value_usd = settings.live.max_position_value_usd,
        buy_block_minutes = settings.live.buy_block_minutes,
        "Live engine configured"
    );
    Ok(Engine::from_settings(
        settings,
        symbols,
        executor,
        Box::new(api_client),
    )?)
}

// --- Live Subcommands ---

async fn handle_run(settings: &Settings) -> Result<()> {
    let mut engine = build_engine(settings)?;
    let cycles = engine
        .run(
            Duration::from_secs(settings.live.cycle_interval_secs),
            settings.live.status_every_cycles,
            shutdown_signal(),
        )
        .await;
    tracing::info!(cycles, "Trading bot stopped by user");
    Ok(())
}

async fn handle_cycle(settings: &Settings, json: bool) -> Result<()> {
    let mut engine = build_engine(settings)?;
    if !json {
        engine.log_portfolio_status(Utc::now()).await;
    }
    let report = engine.run_cycle(Utc::now()).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_cycle(&report);
    }
    Ok(())
}

async fn handle_status(settings: &Settings, json: bool) -> Result<()> {
    let engine = build_engine(settings)?;
    let status = engine
        .portfolio_status(Utc::now())
        .await
        .context("Error getting portfolio status")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }
    Ok(())
}

async fn handle_analyze(settings: &Settings, json: bool) -> Result<()> {
    let engine = build_engine(settings)?;
    let analyses = engine.analyze_assets().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&analyses)?);
    } else {
        print_analysis(&analyses);
    }
    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed the loop runs until killed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested, finishing current cycle");
}

fn print_cycle(report: &CycleReport) {
    println!("\n--- Cycle #{} ({}) ---", report.cycle, report.at.format("%Y-%m-%d %H:%M:%S"));
    for outcome in &report.outcomes {
        match outcome {
            AssetOutcome::Skipped { decision } => println!("[ ] {}: {}", decision.symbol, decision),
            AssetOutcome::Bought { decision, execution } => println!(
                "[+] {}: bought {} at ${:.4} (distance {:.3}%)",
                decision.symbol, execution.quantity, execution.price, decision.signal.distance_pct
            ),
            AssetOutcome::OrderFailed { decision, reason } => {
                println!("[x] {}: order failed - {}", decision.symbol, reason)
            }
            AssetOutcome::Failed { symbol, stage, error } => {
                println!("[!] {}: {} unavailable - {}", symbol, stage, error)
            }
        }
    }
    let summary = report.summary();
    println!("-----------------------------------");
    println!("Buy Signals:           {}", summary.buy_signals);
    println!("Actions Taken:         {}", summary.actions_taken);
    println!("Successful:            {}", summary.successful);
    println!("Failures:              {}", summary.failures);
}

fn print_analysis(analyses: &[AssetAnalysis]) {
    println!("\n--- Window Analysis ---");
    for analysis in analyses {
        println!("{}", analysis);
    }
    let in_range = analyses
        .iter()
        .filter(|a| a.analysis.as_ref().is_some_and(|w| w.latest.in_range))
        .count();
    println!("-----------------------------------");
    println!("In Buy Range:          {}/{}", in_range, analyses.len());
}

fn print_status(status: &PortfolioStatus) {
    println!("\n--- Portfolio Status ---");
    if let Some(value) = status.account_value {
        println!("Account Value:         ${:.2}", value);
    }
    for asset in &status.assets {
        println!("{}", asset);
        if let Some(message) = asset.gate.time_block_message() {
            println!("    {}", message);
        }
    }
    for (symbol, reason) in &status.unavailable {
        println!("{}: unavailable - {}", symbol, reason);
    }
}
