use crate::error::ConfigError;
use chrono::NaiveDate;
use core_types::{AllocationMethod, FailurePolicy};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub simulation: SimulationConfig,
    /// The strategies to simulate, all sharing the `[simulation]` settings.
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub data: DataConfig,
}

/// Contains parameters shared by every strategy run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Months of history each window optimizes on.
    #[serde(default = "default_in_sample_months")]
    pub in_sample_months: u32,
    /// Months each set of weights is held before rebalancing.
    #[serde(default = "default_out_of_sample_months")]
    pub out_of_sample_months: u32,
    /// Lower weight bound per asset. Negative values allow shorting.
    #[serde(default)]
    pub min_weight: f64,
    /// Upper weight bound per asset.
    #[serde(default = "default_max_weight")]
    pub max_weight: f64,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    /// Threads in the weight-calculation pool.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Optimize and simulate over the same full date range (a single window).
    #[serde(default)]
    pub os_equals_is: bool,
    /// EWMA span applied to in-sample returns. 1 disables smoothing.
    #[serde(default = "default_smoothing_span")]
    pub smoothing_span: usize,
    /// Exclude assets whose in-sample RSI is above 70.
    #[serde(default)]
    pub momentum_filter: bool,
    /// Convergence tolerance of the solver. Falls back to the solver default.
    #[serde(default)]
    pub optimizer_tolerance: Option<f64>,
    #[serde(default)]
    pub on_failure: FailurePolicy,
    /// Seed for the `random` allocation. Unseeded runs draw from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// A named strategy and the allocation method it uses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    #[serde(flatten)]
    pub method: AllocationMethod,
}

/// Settings for the statistics report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportConfig {
    /// Number of trailing periods the statistics cover. 0 means the whole series.
    #[serde(default)]
    pub days_back: usize,
    #[serde(default = "default_benchmark_name")]
    pub benchmark_name: String,
}

/// Where the binary reads its input tables from.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DataConfig {
    pub returns_path: Option<PathBuf>,
    pub benchmark_path: Option<PathBuf>,
}

// --- Default Implementations ---

fn default_in_sample_months() -> u32 {
    12
}

fn default_out_of_sample_months() -> u32 {
    3
}

fn default_max_weight() -> f64 {
    0.05
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_smoothing_span() -> usize {
    1
}

fn default_benchmark_name() -> String {
    "Benchmark".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            days_back: 0,
            benchmark_name: default_benchmark_name(),
        }
    }
}

impl SimulationConfig {
    /// Settings for `[date_from, date_to]` with every other field at its default.
    pub fn new(date_from: NaiveDate, date_to: NaiveDate) -> Self {
        Self {
            in_sample_months: default_in_sample_months(),
            out_of_sample_months: default_out_of_sample_months(),
            min_weight: 0.0,
            max_weight: default_max_weight(),
            date_from,
            date_to,
            worker_count: default_worker_count(),
            os_equals_is: false,
            smoothing_span: default_smoothing_span(),
            momentum_filter: false,
            optimizer_tolerance: None,
            on_failure: FailurePolicy::default(),
            seed: None,
        }
    }

    /// Rejects settings that would make every window meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.date_from >= self.date_to {
            return Err(ConfigError::ValidationError(format!(
                "date_from ({}) must be before date_to ({})",
                self.date_from, self.date_to
            )));
        }
        if !self.min_weight.is_finite() || !self.max_weight.is_finite() {
            return Err(ConfigError::ValidationError(
                "weight bounds must be finite".to_string(),
            ));
        }
        if self.min_weight > self.max_weight {
            return Err(ConfigError::ValidationError(format!(
                "min_weight ({}) is greater than max_weight ({})",
                self.min_weight, self.max_weight
            )));
        }
        if !self.os_equals_is && (self.in_sample_months == 0 || self.out_of_sample_months == 0) {
            return Err(ConfigError::ValidationError(
                "in_sample_months and out_of_sample_months must be positive".to_string(),
            ));
        }
        if self.worker_count == 0 {
            return Err(ConfigError::ValidationError(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if self.smoothing_span == 0 {
            return Err(ConfigError::ValidationError(
                "smoothing_span must be at least 1".to_string(),
            ));
        }
        if let Some(tol) = self.optimizer_tolerance {
            if !(tol > 0.0 && tol.is_finite()) {
                return Err(ConfigError::ValidationError(format!(
                    "optimizer_tolerance must be a positive number, got {}",
                    tol
                )));
            }
        }
        Ok(())
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "strategy name must not be empty".to_string(),
            ));
        }
        if let AllocationMethod::MinCvar { level } = self.method {
            if !(level > 0.0 && level <= 100.0) {
                return Err(ConfigError::ValidationError(format!(
                    "strategy '{}': CVaR level must be in (0, 100], got {}",
                    self.name, level
                )));
            }
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()?;

        let mut names = HashSet::new();
        for strategy in &self.strategies {
            strategy.validate()?;
            if !names.insert(strategy.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "strategy name '{}' is used more than once",
                    strategy.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{load_config, parse_config};
    use std::io::Write;

    const SAMPLE: &str = r#"
[simulation]
in_sample_months = 12
out_of_sample_months = 3
min_weight = 0.0
max_weight = 0.1
date_from = "2013-01-01"
date_to = "2017-12-31"
worker_count = 4
smoothing_span = 1
optimizer_tolerance = 1e-8

[[strategies]]
name = "Equal"
method = "equally_weighted"

[[strategies]]
name = "CVaR 5"
method = "min_cvar"
level = 5.0

[[strategies]]
name = "Min vol 10%"
method = "min_vol"
target_return = 0.1

[report]
days_back = 252
"#;

    #[test]
    fn test_parses_strategies_with_method_arguments() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.simulation.worker_count, 4);
        assert_eq!(config.simulation.optimizer_tolerance, Some(1e-8));
        assert_eq!(config.strategies.len(), 3);
        assert_eq!(config.strategies[0].method, AllocationMethod::EquallyWeighted);
        assert_eq!(config.strategies[1].method, AllocationMethod::MinCvar { level: 5.0 });
        assert_eq!(
            config.strategies[2].method,
            AllocationMethod::MinVol { target_return: Some(0.1) }
        );
        assert_eq!(config.report.days_back, 252);
        assert_eq!(config.report.benchmark_name, "Benchmark");
        assert_eq!(config.simulation.on_failure, FailurePolicy::Skip);
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = parse_config(
            r#"
[simulation]
date_from = "2013-01-01"
date_to = "2017-12-31"
"#,
        )
        .unwrap();
        assert_eq!(config.simulation.in_sample_months, 12);
        assert_eq!(config.simulation.out_of_sample_months, 3);
        assert_eq!(config.simulation.max_weight, 0.05);
        assert!(config.simulation.worker_count >= 1);
        assert!(config.strategies.is_empty());
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let mut sim = SimulationConfig::new(
            NaiveDate::from_ymd_opt(2013, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2017, 12, 31).unwrap(),
        );
        sim.min_weight = 0.2;
        sim.max_weight = 0.1;
        assert!(matches!(sim.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_rejects_inverted_dates_and_zero_periods() {
        let mut sim = SimulationConfig::new(
            NaiveDate::from_ymd_opt(2017, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2013, 12, 31).unwrap(),
        );
        assert!(sim.validate().is_err());

        sim.date_from = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
        sim.out_of_sample_months = 0;
        assert!(sim.validate().is_err());

        sim.os_equals_is = true;
        assert!(sim.validate().is_ok());
    }

    #[test]
    fn test_rejects_duplicate_strategy_names() {
        let toml = r#"
[simulation]
date_from = "2013-01-01"
date_to = "2017-12-31"

[[strategies]]
name = "A"
method = "max_sharpe"

[[strategies]]
name = "A"
method = "random"
"#;
        assert!(matches!(parse_config(toml), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_rejects_unknown_method() {
        let toml = r#"
[simulation]
date_from = "2013-01-01"
date_to = "2017-12-31"

[[strategies]]
name = "A"
method = "min_vol_master"
"#;
        assert!(matches!(parse_config(toml), Err(ConfigError::LoadError(_))));
    }

    #[test]
    fn test_load_config_reads_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.strategies[1].name, "CVaR 5");
    }
}
