// In app/src/backtests.rs

use anyhow::{Context, Result};
use api_client::ApiClient;
use app_config::Settings;
use backtester::report::{print_accumulation, print_portfolio, print_round_trip, print_sweep};
use backtester::{AccumulationBacktest, PortfolioSummary, RangeSweep, RoundTripBacktest};
use chrono::{Duration, Utc};
use core_types::{CandleSeries, Symbol};
use strategies::RollingLowSignal;

/// Fetches the last `days` days of bars at the signal interval.
async fn fetch_days(api_client: &ApiClient, settings: &Settings, symbol: &Symbol, days: u32) -> Result<CandleSeries> {
    let end = Utc::now();
    let start = end - Duration::days(i64::from(days.max(1)));
    tracing::info!(symbol = %symbol, days, interval = %settings.signal.interval, "Fetching history");
    let series = api_client
        .fetch_history(
            symbol,
            &settings.signal.interval,
            start.timestamp_millis(),
            end.timestamp_millis(),
        )
        .await
        .with_context(|| format!("Failed to fetch history for {symbol}"))?;
    tracing::info!(symbol = %symbol, bars = series.len(), "History loaded");
    Ok(series)
}

pub async fn handle_backtest(settings: &Settings, symbols: Vec<String>, days: u32, json: bool) -> Result<()> {
    let symbols: Vec<Symbol> = if symbols.is_empty() {
        app_config::load_live_config()
            .context("No symbols given and config/live.toml could not be read")?
            .enabled_symbols()
    } else {
        symbols.into_iter().map(Symbol).collect()
    };
    if symbols.is_empty() {
        anyhow::bail!("No symbols to backtest.");
    }

    let api_client = ApiClient::new(&settings.binance)?;
    let signal = RollingLowSignal::from_settings(&settings.signal)?;
    let mut reports = Vec::with_capacity(symbols.len());

    // One asset's missing data does not stop the others.
    for symbol in &symbols {
        let series = match fetch_days(&api_client, settings, symbol, days).await {
            Ok(series) => series,
            Err(e) => {
                tracing::error!(symbol = %symbol, error = %format!("{e:#}"), "Skipping asset");
                continue;
            }
        };
        let backtest = RoundTripBacktest::new(symbol.clone(), signal.clone(), &settings.round_trip)?;
        match backtest.run(&series) {
            Ok(report) => {
                if !json {
                    print_round_trip(&report);
                }
                reports.push(report);
            }
            Err(e) => tracing::error!(symbol = %symbol, error = %e, "Backtest failed"),
        }
    }

    let summary = PortfolioSummary::from_reports(&reports);
    if json {
        let output = serde_json::json!({ "assets": reports, "portfolio": summary });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if reports.len() > 1 {
        print_portfolio(&summary, reports.len());
    }
    Ok(())
}

fn accumulation_for(settings: &Settings, symbol: Symbol, range_pct: Option<f64>) -> Result<AccumulationBacktest> {
    let mut signal = RollingLowSignal::from_settings(&settings.signal)?;
    if let Some(range_pct) = range_pct {
        signal = signal.with_range_pct(range_pct)?;
    }
    Ok(AccumulationBacktest::new(symbol, signal, &settings.accumulation)?)
}

pub async fn handle_accumulate(
    settings: &Settings,
    symbol: String,
    days: u32,
    range_pct: Option<f64>,
    json: bool,
) -> Result<()> {
    let symbol = Symbol(symbol);
    let backtest = accumulation_for(settings, symbol.clone(), range_pct)?;
    let api_client = ApiClient::new(&settings.binance)?;
    let series = fetch_days(&api_client, settings, &symbol, days).await?;

    let report = backtest.run(&series)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_accumulation(&report);
    }
    Ok(())
}

pub async fn handle_sweep(settings: &Settings, symbol: String, days: u32, json: bool) -> Result<()> {
    let symbol = Symbol(symbol);
    let base = accumulation_for(settings, symbol.clone(), None)?;
    let sweep = RangeSweep::new(&settings.sweep)?;
    let api_client = ApiClient::new(&settings.binance)?;
    let series = fetch_days(&api_client, settings, &symbol, days).await?;

    let report = sweep.run(&base, &series)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_sweep(&report);
    }
    Ok(())
}
