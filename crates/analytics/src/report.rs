use core_types::ReturnSeries;
use serde::{Deserialize, Serialize};

/// A metric that could not be computed, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndefinedMetric {
    pub metric: String,
    pub reason: String,
}

/// Summary statistics of one strategy (or benchmark) over a lookback period.
///
/// This struct is the final output of the `AnalyticsEngine`. Every metric is an
/// `Option<>`: `None` means the metric is undefined for this series (too short,
/// zero volatility, no overlap with the benchmark...), with the reason listed
/// in `undefined`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyStats {
    pub name: String,
    /// Number of return periods the statistics cover.
    pub periods: usize,

    // I. Return and Volatility
    pub annual_return: Option<f64>,
    pub volatility: Option<f64>,
    pub skew: Option<f64>,
    pub kurtosis: Option<f64>,

    // II. Risk-Adjusted Ratios
    pub beta: Option<f64>,
    pub sharpe: Option<f64>,
    pub sortino: Option<f64>,
    pub treynor: Option<f64>,
    pub starr: Option<f64>,

    // III. Tail Risk and Drawdown
    pub var: Option<f64>,
    pub cvar: Option<f64>,
    pub max_drawdown: Option<f64>,

    // IV. Rebalancing
    pub turnover: Option<f64>,
    pub size: Option<f64>,

    pub undefined: Vec<UndefinedMetric>,
}

impl StrategyStats {
    /// Creates a report for `name` with every metric undefined.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            periods: 0,
            annual_return: None,
            volatility: None,
            skew: None,
            kurtosis: None,
            beta: None,
            sharpe: None,
            sortino: None,
            treynor: None,
            starr: None,
            var: None,
            cvar: None,
            max_drawdown: None,
            turnover: None,
            size: None,
            undefined: Vec::new(),
        }
    }

    pub fn is_undefined(&self, metric: &str) -> bool {
        self.undefined.iter().any(|u| u.metric == metric)
    }
}

/// Trailing-window metric series of one strategy (or benchmark), each dated at
/// the last observation of its window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingStats {
    pub name: String,
    /// Observations per window.
    pub window: usize,
    pub annual_return: ReturnSeries,
    pub volatility: ReturnSeries,
    pub sharpe: ReturnSeries,
    pub cvar: ReturnSeries,
}

impl RollingStats {
    /// The most recent value of every series, in field order.
    pub fn latest(&self) -> [Option<f64>; 4] {
        [&self.annual_return, &self.volatility, &self.sharpe, &self.cvar]
            .map(|series| series.values().last().copied())
    }
}
