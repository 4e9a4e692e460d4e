//! Terminal output for simulation results.

use analytics::{RollingStats, StrategyStats};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Table};
use core_types::{RebalanceSummary, Window};
use wfo::StrategyResult;

fn number(value: Option<f64>) -> Cell {
    let text = match value {
        Some(v) => format!("{:.4}", v),
        None => "n/a".to_string(),
    };
    Cell::new(text).set_alignment(CellAlignment::Right)
}

fn percent(value: Option<f64>) -> Cell {
    number(value.map(|v| v * 100.0))
}

/// One row per strategy, benchmark last.
pub fn stats_table(stats: &[StrategyStats]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Strategy",
        "Periods",
        "Return %",
        "Vol %",
        "Sharpe",
        "Sortino",
        "Beta",
        "Treynor",
        "Starr",
        "VaR 5%",
        "CVaR 5%",
        "Max DD %",
        "Skew",
        "Kurtosis",
        "Turnover",
        "Size",
    ]);

    for s in stats {
        table.add_row(vec![
            Cell::new(&s.name),
            Cell::new(s.periods).set_alignment(CellAlignment::Right),
            percent(s.annual_return),
            percent(s.volatility),
            number(s.sharpe),
            number(s.sortino),
            number(s.beta),
            number(s.treynor),
            number(s.starr),
            number(s.var),
            number(s.cvar),
            percent(s.max_drawdown),
            number(s.skew),
            number(s.kurtosis),
            number(s.turnover),
            number(s.size),
        ]);
    }
    table
}

/// Latest value of each rolling series, one row per strategy.
pub fn rolling_table(rolling: &[RollingStats]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Strategy",
        "Window",
        "As of",
        "Rolling return %",
        "Rolling vol %",
        "Rolling Sharpe",
        "Rolling CVaR 5%",
    ]);
    for r in rolling {
        let [ret, vol, sharpe, cvar] = r.latest();
        let as_of = r
            .annual_return
            .last_date()
            .map_or_else(|| "n/a".to_string(), |d| d.to_string());
        table.add_row(vec![
            Cell::new(&r.name),
            Cell::new(r.window).set_alignment(CellAlignment::Right),
            Cell::new(as_of),
            percent(ret),
            percent(vol),
            number(sharpe),
            number(cvar),
        ]);
    }
    table
}

pub fn windows_table(windows: &[Window]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "In-sample start", "In-sample end", "Out-of-sample start", "Out-of-sample end"]);
    for (i, w) in windows.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(w.is_start()),
            Cell::new(w.is_end()),
            Cell::new(w.os_start()),
            Cell::new(w.os_end()),
        ]);
    }
    table
}

/// Per-rebalance changes of one strategy, with its heaviest holdings.
pub fn rebalance_table(rebalances: &[RebalanceSummary], top: usize) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Period", "Turnover", "Left", "New", "Size", "Top holdings"]);
    for r in rebalances {
        let holdings = r
            .holdings
            .iter()
            .take(top)
            .map(|(asset, w)| format!("{} {:.2}%", asset, w * 100.0))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(&r.label),
            number(r.turnover),
            Cell::new(r.positions_left),
            Cell::new(r.positions_added),
            Cell::new(r.size),
            Cell::new(holdings),
        ]);
    }
    table
}

/// Windows a strategy had to skip.
pub fn print_failures(result: &StrategyResult) {
    if result.failures.is_empty() {
        return;
    }
    println!("{}: {} window(s) without weights", result.name, result.failures.len());
    for failure in &result.failures {
        println!("  {}", failure);
    }
}
