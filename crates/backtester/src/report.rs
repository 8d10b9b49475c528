// In crates/backtester/src/report.rs

use crate::accumulation::AccumulationReport;
use crate::round_trip::RoundTripReport;
use crate::sweep::SweepReport;
use analytics::MarketStats;
use rust_decimal::Decimal;
use std::io::{self, Write};

pub fn print_round_trip(report: &RoundTripReport) {
    print_with(|out| write_round_trip(out, report));
}

pub fn print_accumulation(report: &AccumulationReport) {
    print_with(|out| write_accumulation(out, report));
}

pub fn print_sweep(report: &SweepReport) {
    print_with(|out| write_sweep(out, report));
}

fn print_with(write: impl FnOnce(&mut io::StdoutLock<'static>) -> io::Result<()>) {
    let mut out = io::stdout().lock();
    if let Err(e) = write(&mut out) {
        tracing::warn!(error = %e, "Failed to print report");
    }
}

/// Writes a round-trip backtest in a readable format.
pub fn write_round_trip(out: &mut impl Write, report: &RoundTripReport) -> io::Result<()> {
    writeln!(out, "\n--- {} Round-Trip Backtest ---", report.symbol)?;
    writeln!(out, "-----------------------------------")?;
    for (i, trade) in report.trades.iter().enumerate() {
        writeln!(
            out,
            "#{:<3} {:<11} entry ${:>10.4} exit ${:>10.4} | P&L ${:>9.2} ({:+.2}%)",
            i + 1,
            trade.exit_reason.to_string(),
            trade.entry_price,
            trade.exit_price,
            trade.profit_loss,
            trade.profit_pct
        )?;
    }
    if let Some(open) = &report.open_position {
        writeln!(
            out,
            "Still holding: entry ${:.4}, marked ${:.4}, unrealized ${:.2} ({:+.2}%)",
            open.entry_price, open.mark_price, open.unrealized_pnl, open.unrealized_pct
        )?;
    }

    let perf = &report.performance;
    writeln!(out, "-----------------------------------")?;
    writeln!(out, "Starting Capital:      ${:.2}", report.starting_capital)?;
    writeln!(out, "Final Value:           ${:.2}", report.final_value)?;
    writeln!(out, "Total Return:          ${:.2} ({:+.2}%)", report.total_return, report.return_pct)?;
    writeln!(out, "Total Trades:          {}", perf.total_trades)?;
    writeln!(out, "Win Rate:              {:.2}%", perf.win_rate)?;
    writeln!(out, "Average Win:           ${:.2}", perf.avg_win)?;
    writeln!(out, "Average Loss:          ${:.2}", perf.avg_loss)?;
    writeln!(out, "Take Profit / Stop:    {} / {}", perf.take_profit_exits, perf.stop_loss_exits)?;
    writeln!(out, "Profit Factor:         {:.2}", perf.profit_factor)?;
    writeln!(out, "Expectancy:            ${:.2}", perf.expectancy)?;
    writeln!(out, "Max Drawdown:          ${:.2} ({:.2}%)", perf.max_drawdown_absolute, perf.max_drawdown_percentage)?;
    writeln!(out, "Avg. Trade Duration:   {:.1}s", perf.avg_trade_duration_secs)?;

    if let Some(market) = &report.market {
        write_market(out, market)?;
    }
    Ok(())
}

/// Writes an accumulation backtest.
pub fn write_accumulation(out: &mut impl Write, report: &AccumulationReport) -> io::Result<()> {
    writeln!(out, "\n--- {} Accumulation Backtest (range {}%) ---", report.symbol, report.range_pct)?;
    writeln!(out, "-----------------------------------")?;
    writeln!(out, "Initial Capital:       ${:.2}", report.initial_capital)?;
    writeln!(out, "Total Spent:           ${:.2}", report.total_spent)?;
    writeln!(out, "Remaining Capital:     ${:.2}", report.remaining_capital)?;
    writeln!(out, "Coins Owned:           {:.6}", report.total_coins)?;
    writeln!(out, "Final Price:           ${:.4}", report.final_price)?;
    writeln!(out, "Holdings Value:        ${:.2}", report.holdings_value)?;
    writeln!(out, "Final Value:           ${:.2}", report.final_value)?;
    writeln!(out, "Unrealized P&L:        ${:.2} ({:+.2}%)", report.unrealized_pnl, report.unrealized_pct)?;
    writeln!(out, "Total Return:          ${:.2} ({:+.2}%)", report.total_return, report.return_pct)?;

    if !report.daily.is_empty() {
        writeln!(out, "\nDaily Buy Summary:")?;
        for day in &report.daily {
            writeln!(out, "  {}: {} buys, ${:.2} spent", day.date, day.buys, day.spent)?;
        }
    }
    if let (Some(amount), Some(price)) = (report.avg_buy_amount, report.avg_buy_price) {
        writeln!(out, "\nAverage Buy Amount:    ${:.2}", amount)?;
        writeln!(out, "Average Buy Price:     ${:.4}", price)?;
        writeln!(out, "Capital Utilization:   {:.1}%", report.capital_utilization_pct)?;
    }

    if let Some(market) = &report.market {
        write_market(out, market)?;
    }
    Ok(())
}

/// One row per sweep candidate, then the full report of the best range.
pub fn write_sweep(out: &mut impl Write, report: &SweepReport) -> io::Result<()> {
    writeln!(out, "\n--- Range Sweep ---")?;
    writeln!(out, "{:>8} {:>6} {:>12} {:>10} {:>14}", "Range%", "Buys", "Return%", "Spent", "Opportunities")?;
    for result in &report.results {
        let opportunities = result.market.as_ref().map_or(0, |m| m.buy_opportunities);
        writeln!(
            out,
            "{:>8} {:>6} {:>+12.2} {:>10.2} {:>14}",
            result.range_pct,
            result.buys.len(),
            result.return_pct,
            result.total_spent,
            opportunities
        )?;
    }
    if let Some(best) = report.best() {
        writeln!(
            out,
            "\nBest range: {}% ({:+.2}% return, {} buys)",
            best.range_pct,
            best.return_pct,
            best.buys.len()
        )?;
        write_accumulation(out, best)?;
    }
    Ok(())
}

fn write_market(out: &mut impl Write, market: &MarketStats) -> io::Result<()> {
    writeln!(out, "\nPRICE STATISTICS:")?;
    writeln!(out, "  Price Range:         ${:.4} - ${:.4}", market.price.min, market.price.max)?;
    writeln!(out, "  Average Price:       ${:.4}", market.price.avg)?;
    writeln!(out, "  Price Volatility:    {:.2}%", market.price.volatility_pct())?;
    writeln!(out, "WINDOW LOW STATISTICS:")?;
    writeln!(out, "  Window Low Range:    ${:.4} - ${:.4}", market.window_low.min, market.window_low.max)?;
    writeln!(out, "  Average Window Low:  ${:.4}", market.window_low.avg)?;
    writeln!(out, "  Window Low Volatility: {:.2}%", market.window_low.volatility_pct())?;
    writeln!(out, "BUY OPPORTUNITIES:")?;
    writeln!(out, "  Total:               {}", market.buy_opportunities)?;
    writeln!(out, "  Taken:               {}", market.opportunities_taken)?;
    writeln!(out, "  Conversion Rate:     {:.1}%", market.conversion_rate_pct)?;
    if let Some(entry) = &market.entry_distance {
        writeln!(out, "  Avg Entry Distance:  {:.2}%", entry.avg)?;
        writeln!(out, "  Entry Distance Range: {:.2}% - {:.2}%", entry.min, entry.max)?;
    }
    if let Some(all) = &market.opportunity_distance {
        writeln!(out, "  Avg Opportunity Distance: {:.2}% ({:.2}% - {:.2}%)", all.avg, all.min, all.max)?;
    }
    writeln!(out, "-----------------------------------")?;
    Ok(())
}

/// Aggregate of several round-trip runs.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PortfolioSummary {
    pub starting_capital: Decimal,
    pub final_value: Decimal,
    pub total_return: Decimal,
    pub return_pct: Decimal,
    pub total_trades: u32,
    pub active_assets: usize,
    pub profitable_assets: usize,
    pub avg_return_per_trade: Option<Decimal>,
}

impl PortfolioSummary {
    pub fn from_reports(reports: &[RoundTripReport]) -> Self {
        let starting_capital: Decimal = reports.iter().map(|r| r.starting_capital).sum();
        let final_value: Decimal = reports.iter().map(|r| r.final_value).sum();
        let total_return = final_value - starting_capital;
        let total_trades: u32 = reports.iter().map(|r| r.performance.total_trades).sum();
        Self {
            starting_capital,
            final_value,
            total_return,
            return_pct: if starting_capital.is_zero() {
                Decimal::ZERO
            } else {
                total_return / starting_capital * Decimal::ONE_HUNDRED
            },
            total_trades,
            active_assets: reports
                .iter()
                .filter(|r| !r.trades.is_empty() || r.open_position.is_some())
                .count(),
            profitable_assets: reports
                .iter()
                .filter(|r| r.total_return > Decimal::ZERO)
                .count(),
            avg_return_per_trade: (total_trades > 0)
                .then(|| total_return / Decimal::from(total_trades)),
        }
    }
}

pub fn print_portfolio(summary: &PortfolioSummary, assets: usize) {
    println!("\n=== Portfolio Total ({assets} assets) ===");
    println!("Starting Capital:      ${:.2}", summary.starting_capital);
    println!("Final Value:           ${:.2}", summary.final_value);
    println!("Total Return:          ${:.2} ({:+.2}%)", summary.total_return, summary.return_pct);
    println!("Total Trades:          {}", summary.total_trades);
    println!("Active Assets:         {}/{}", summary.active_assets, assets);
    println!("Profitable Assets:     {}/{}", summary.profitable_assets, assets);
    if let Some(avg) = summary.avg_return_per_trade {
        println!("Avg Return per Trade:  ${:.2}", avg);
    }
}
