use analytics::{metrics, StatsInput};
use configuration::{SimulationConfig, StrategyConfig};
use core_types::{CoreError, ReturnSeries, WeightHistory, Window};
use serde::Serialize;
use std::fmt;

/// A window whose weights could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowFailure {
    pub window: Window,
    pub reason: String,
}

impl fmt::Display for WindowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.window.label(), self.reason)
    }
}

/// The settings a strategy was simulated with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyDetails {
    pub method: String,
    pub in_sample_months: u32,
    pub out_of_sample_months: u32,
    pub os_equals_is: bool,
    pub min_weight: f64,
    pub max_weight: f64,
    pub smoothing_span: usize,
    pub momentum_filter: bool,
    pub tolerance: f64,
}

impl StrategyDetails {
    pub fn new(strategy: &StrategyConfig, config: &SimulationConfig, tolerance: f64) -> Self {
        Self {
            method: strategy.method.name().to_string(),
            in_sample_months: config.in_sample_months,
            out_of_sample_months: config.out_of_sample_months,
            os_equals_is: config.os_equals_is,
            min_weight: config.min_weight,
            max_weight: config.max_weight,
            smoothing_span: config.smoothing_span,
            momentum_filter: config.momentum_filter,
            tolerance,
        }
    }
}

/// Everything one strategy simulation produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyResult {
    pub name: String,
    pub details: StrategyDetails,
    pub weights: WeightHistory,
    /// Share value of one unit of starting capital.
    pub cumulative: ReturnSeries,
    /// Simple returns recovered from `cumulative`.
    pub returns: ReturnSeries,
    pub failures: Vec<WindowFailure>,
}

impl StrategyResult {
    pub fn stats_input(&self) -> StatsInput<'_> {
        StatsInput::strategy(&self.name, &self.returns, &self.weights)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A reference series without weights, scored next to the strategies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Benchmark {
    pub name: String,
    pub returns: ReturnSeries,
    pub cumulative: ReturnSeries,
}

impl Benchmark {
    pub fn new(name: impl Into<String>, returns: ReturnSeries) -> Result<Self, CoreError> {
        let cumulative = ReturnSeries::new(
            returns.dates().to_vec(),
            metrics::cumulative_return(returns.values()),
        )?;
        Ok(Self {
            name: name.into(),
            returns,
            cumulative,
        })
    }

    /// The benchmark restricted to `[from, to]`, cumulative curve restarted at the first date.
    pub fn between(&self, from: chrono::NaiveDate, to: chrono::NaiveDate) -> Result<Self, CoreError> {
        Self::new(self.name.clone(), self.returns.between(from, to))
    }

    pub fn stats_input(&self) -> StatsInput<'_> {
        StatsInput::benchmark(&self.name, &self.returns)
    }
}
