use crate::error::AnalyticsError;
use crate::metrics;
use crate::report::{RollingStats, StrategyStats, UndefinedMetric};
use core_types::{ReturnSeries, WeightHistory};

/// Percentile level used for the reported VaR, CVaR and Starr ratio.
pub const TAIL_LEVEL: f64 = 5.0;

/// One series to score: a strategy with its weight history, or a benchmark
/// (no weights).
#[derive(Debug, Clone, Copy)]
pub struct StatsInput<'a> {
    pub name: &'a str,
    pub returns: &'a ReturnSeries,
    pub weights: Option<&'a WeightHistory>,
}

impl<'a> StatsInput<'a> {
    pub fn strategy(name: &'a str, returns: &'a ReturnSeries, weights: &'a WeightHistory) -> Self {
        Self {
            name,
            returns,
            weights: Some(weights),
        }
    }

    pub fn benchmark(name: &'a str, returns: &'a ReturnSeries) -> Self {
        Self {
            name,
            returns,
            weights: None,
        }
    }
}

/// A stateless calculator for deriving performance statistics from return series.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for calculating performance statistics.
    ///
    /// # Arguments
    ///
    /// * `input` - The simple-return series to score and, for strategies, its weight history.
    /// * `benchmark` - The market series used for beta and Treynor.
    /// * `days_back` - How many trailing periods to score. `0` scores the whole series.
    ///
    /// # Returns
    ///
    /// A `StrategyStats` in which every metric that could not be computed is `None`.
    pub fn calculate(
        &self,
        input: StatsInput<'_>,
        benchmark: &ReturnSeries,
        days_back: usize,
    ) -> StrategyStats {
        let mut report = StrategyStats::new(input.name);
        let returns = input.returns.tail(days_back);
        report.periods = returns.len();

        self.calculate_returns(returns.values(), &mut report);
        self.calculate_ratios(&returns, benchmark, &mut report);
        self.calculate_tail_risk(returns.values(), &mut report);
        self.calculate_rebalancing(input.weights, &mut report);

        tracing::debug!(
            strategy = %report.name,
            periods = report.periods,
            undefined = report.undefined.len(),
            "Calculated strategy statistics."
        );
        report
    }

    /// Scores several strategies and the benchmark over their common date range.
    ///
    /// Every series is cut to the latest first date and the earliest last date
    /// across all inputs. The benchmark's report comes last.
    pub fn compare(
        &self,
        strategies: &[StatsInput<'_>],
        benchmark: StatsInput<'_>,
        days_back: usize,
    ) -> Vec<StrategyStats> {
        let all: Vec<&StatsInput<'_>> = strategies.iter().chain(std::iter::once(&benchmark)).collect();

        let from = all.iter().filter_map(|s| s.returns.first_date()).max();
        let to = all.iter().filter_map(|s| s.returns.last_date()).min();

        let restrict = |series: &ReturnSeries| match (from, to) {
            (Some(from), Some(to)) => series.between(from, to),
            _ => ReturnSeries::default(),
        };

        let market = restrict(benchmark.returns);
        all.into_iter()
            .map(|input| {
                let returns = restrict(input.returns);
                self.calculate(
                    StatsInput {
                        returns: &returns,
                        ..*input
                    },
                    &market,
                    days_back,
                )
            })
            .collect()
    }

    /// Rolling annual return, volatility, Sharpe and CVaR over trailing
    /// `window`-period slices of the input's returns.
    pub fn rolling(&self, input: StatsInput<'_>, window: usize) -> RollingStats {
        RollingStats {
            name: input.name.to_string(),
            window,
            annual_return: metrics::rolling(input.returns, window, metrics::annualized_return),
            volatility: metrics::rolling(input.returns, window, metrics::annualized_volatility),
            sharpe: metrics::rolling(input.returns, window, |r| metrics::sharpe(r, 0.0)),
            cvar: metrics::rolling(input.returns, window, |r| {
                metrics::conditional_value_at_risk(r, TAIL_LEVEL)
            }),
        }
    }

    fn calculate_returns(&self, r: &[f64], report: &mut StrategyStats) {
        report.annual_return = record(report, "annual_return", metrics::annualized_return(r));
        report.volatility = record(report, "volatility", metrics::annualized_volatility(r));
        report.skew = record(report, "skew", metrics::skewness(r));
        report.kurtosis = record(report, "kurtosis", metrics::kurtosis(r));
    }

    fn calculate_ratios(
        &self,
        returns: &ReturnSeries,
        benchmark: &ReturnSeries,
        report: &mut StrategyStats,
    ) {
        let r = returns.values();
        report.beta = record(report, "beta", metrics::beta(returns, benchmark));
        report.sharpe = record(report, "sharpe", metrics::sharpe(r, 0.0));
        report.sortino = record(report, "sortino", metrics::sortino(r, 0.0));
        report.treynor = record(report, "treynor", metrics::treynor(returns, benchmark, 0.0));
        report.starr = record(report, "starr", metrics::starr_ratio(r, TAIL_LEVEL));
    }

    fn calculate_tail_risk(&self, r: &[f64], report: &mut StrategyStats) {
        report.var = record(report, "var", metrics::value_at_risk(r, TAIL_LEVEL));
        report.cvar = record(report, "cvar", metrics::conditional_value_at_risk(r, TAIL_LEVEL));
        report.max_drawdown = record(report, "max_drawdown", metrics::max_drawdown(r));
    }

    fn calculate_rebalancing(&self, weights: Option<&WeightHistory>, report: &mut StrategyStats) {
        match weights {
            Some(history) => {
                report.turnover = history.average_turnover();
                if report.turnover.is_none() {
                    report.undefined.push(UndefinedMetric {
                        metric: "turnover".to_string(),
                        reason: format!("{} rebalance(s), need at least 2", history.len()),
                    });
                }
                report.size = history.average_size();
                if report.size.is_none() {
                    report.undefined.push(UndefinedMetric {
                        metric: "size".to_string(),
                        reason: "empty weight history".to_string(),
                    });
                }
            }
            // Benchmarks never rebalance.
            None => {
                report.turnover = Some(0.0);
                report.size = Some(0.0);
            }
        }
    }
}

fn record(
    report: &mut StrategyStats,
    metric: &str,
    result: Result<f64, AnalyticsError>,
) -> Option<f64> {
    match result {
        Ok(value) if value.is_finite() => Some(value),
        Ok(value) => {
            report.undefined.push(UndefinedMetric {
                metric: metric.to_string(),
                reason: format!("non-finite value {}", value),
            });
            None
        }
        Err(e) => {
            report.undefined.push(UndefinedMetric {
                metric: metric.to_string(),
                reason: e.to_string(),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use core_types::{WeightVector, Window};

    fn series(start_day: u32, values: &[f64]) -> ReturnSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, start_day).unwrap();
        ReturnSeries::new(
            (0..values.len()).map(|i| start + chrono::Duration::days(i as i64)).collect(),
            values.to_vec(),
        )
        .unwrap()
    }

    fn history(rows: &[&[(&str, f64)]]) -> WeightHistory {
        WeightHistory::new(
            rows.iter()
                .enumerate()
                .map(|(i, pairs)| {
                    let m = i as u32 + 1;
                    let window = Window::new(
                        NaiveDate::from_ymd_opt(2019, m, 1).unwrap(),
                        NaiveDate::from_ymd_opt(2019, m, 20).unwrap(),
                        NaiveDate::from_ymd_opt(2020, m, 1).unwrap(),
                        NaiveDate::from_ymd_opt(2020, m + 1, 1).unwrap(),
                    )
                    .unwrap();
                    WeightVector::new(window, pairs.iter().map(|(a, w)| (a.to_string(), *w)).collect())
                })
                .collect(),
        )
    }

    const RETURNS: [f64; 8] = [0.01, -0.02, 0.015, 0.003, -0.007, 0.02, -0.011, 0.004];

    #[test]
    fn test_full_report_for_strategy() {
        let returns = series(1, &RETURNS);
        let market = series(1, &[0.005, -0.01, 0.01, 0.001, -0.004, 0.012, -0.006, 0.002]);
        let weights = history(&[&[("A", 0.5), ("B", 0.5)], &[("A", 0.7), ("B", 0.3)]]);

        let engine = AnalyticsEngine::new();
        let stats = engine.calculate(StatsInput::strategy("S", &returns, &weights), &market, 0);

        assert_eq!(stats.periods, 8);
        assert_relative_eq!(stats.annual_return.unwrap(), metrics::annualized_return(&RETURNS).unwrap());
        assert_relative_eq!(stats.var.unwrap(), metrics::value_at_risk(&RETURNS, 5.0).unwrap());
        assert!(stats.beta.is_some());
        assert!(stats.treynor.is_some());
        assert_relative_eq!(stats.turnover.unwrap(), 0.2, epsilon = 1e-12);
        assert_relative_eq!(stats.size.unwrap(), 2.0);
        assert!(stats.undefined.is_empty(), "{:?}", stats.undefined);
    }

    #[test]
    fn test_benchmark_reports_zero_turnover_and_size() {
        let market = series(1, &RETURNS);
        let stats = AnalyticsEngine::new().calculate(StatsInput::benchmark("Index", &market), &market, 0);
        assert_eq!(stats.turnover, Some(0.0));
        assert_eq!(stats.size, Some(0.0));
        assert_relative_eq!(stats.beta.unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_days_back_scores_the_tail() {
        let returns = series(1, &RETURNS);
        let stats = AnalyticsEngine::new().calculate(StatsInput::benchmark("S", &returns), &returns, 3);
        assert_eq!(stats.periods, 3);
        assert_relative_eq!(
            stats.annual_return.unwrap(),
            metrics::annualized_return(&RETURNS[5..]).unwrap()
        );
    }

    #[test]
    fn test_failed_metrics_are_undefined_not_fatal() {
        let returns = series(1, &[0.01]);
        let market = series(10, &[0.01, 0.02]);
        let stats = AnalyticsEngine::new().calculate(StatsInput::benchmark("S", &returns), &market, 0);

        assert!(stats.annual_return.is_some());
        assert!(stats.volatility.is_none());
        assert!(stats.beta.is_none());
        assert!(stats.is_undefined("volatility"));
        assert!(stats.is_undefined("beta"));
        assert!(stats.max_drawdown.is_some());
    }

    #[test]
    fn test_single_rebalance_turnover_is_undefined() {
        let returns = series(1, &RETURNS);
        let weights = history(&[&[("A", 1.0)]]);
        let stats = AnalyticsEngine::new().calculate(StatsInput::strategy("S", &returns, &weights), &returns, 0);
        assert_eq!(stats.turnover, None);
        assert!(stats.is_undefined("turnover"));
        assert_eq!(stats.size, Some(1.0));
    }

    #[test]
    fn test_compare_uses_common_date_range() {
        let long = series(1, &RETURNS);
        let short = series(3, &RETURNS[2..7]);
        let market = series(2, &RETURNS[1..]);
        let weights = history(&[&[("A", 1.0)], &[("A", 1.0)]]);

        let stats = AnalyticsEngine::new().compare(
            &[
                StatsInput::strategy("long", &long, &weights),
                StatsInput::strategy("short", &short, &weights),
            ],
            StatsInput::benchmark("market", &market),
            0,
        );

        assert_eq!(stats.len(), 3);
        assert!(stats.iter().all(|s| s.periods == 5));
        assert_eq!(stats[2].name, "market");
        assert_eq!(stats[0].turnover, Some(0.0));
    }

    #[test]
    fn test_rolling_series_end_on_the_last_date() {
        let returns = series(1, &RETURNS);
        let rolled = AnalyticsEngine::new().rolling(StatsInput::benchmark("Index", &returns), 5);

        assert_eq!(rolled.window, 5);
        assert_eq!(rolled.annual_return.len(), 4);
        assert_eq!(rolled.volatility.last_date(), returns.last_date());
        let [ret, vol, _, cvar] = rolled.latest();
        assert_relative_eq!(ret.unwrap(), metrics::annualized_return(&RETURNS[3..]).unwrap());
        assert_relative_eq!(vol.unwrap(), metrics::annualized_volatility(&RETURNS[3..]).unwrap());
        assert_relative_eq!(
            cvar.unwrap(),
            metrics::conditional_value_at_risk(&RETURNS[3..], TAIL_LEVEL).unwrap()
        );
    }
}
