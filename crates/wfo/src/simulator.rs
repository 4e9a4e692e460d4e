use crate::error::WfoError;
use crate::periods;
use crate::preprocess::Preprocessing;
use crate::result::{StrategyDetails, StrategyResult, WindowFailure};
use analytics::metrics;
use configuration::{SimulationConfig, StrategyConfig};
use core_types::{CoreError, FailurePolicy, ReturnMatrix, ReturnSeries, WeightHistory, WeightVector, Window};
use events::{EventSink, Phase, PhaseEvent};
use optimizer::{AllocationRule, OptimizerError, PortfolioOptimizer, SolverSettings};
use std::sync::{Arc, Mutex};

type WindowOutcome = (usize, Result<WeightVector, OptimizerError>);

/// The engine for simulating rolling-window strategies.
///
/// Weights are computed for every window in parallel; the windows are then
/// compounded in chronological order into one share-value series.
pub struct StrategySimulator {
    config: SimulationConfig,
    sink: Arc<dyn EventSink>,
}

impl StrategySimulator {
    pub fn new(config: SimulationConfig, sink: Arc<dyn EventSink>) -> Self {
        Self { config, sink }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The windows this simulator walks through.
    pub fn windows(&self) -> Result<Vec<Window>, WfoError> {
        periods::from_config(&self.config)
    }

    /// Simulates every strategy in turn. Stops at the first fatal error.
    pub fn run(
        &self,
        strategies: &[StrategyConfig],
        returns: &ReturnMatrix,
        benchmark: Option<&ReturnSeries>,
    ) -> Result<Vec<StrategyResult>, WfoError> {
        strategies
            .iter()
            .map(|strategy| self.simulate(strategy, returns, benchmark))
            .collect()
    }

    /// Runs one strategy over the configured date range.
    pub fn simulate(
        &self,
        strategy: &StrategyConfig,
        returns: &ReturnMatrix,
        benchmark: Option<&ReturnSeries>,
    ) -> Result<StrategyResult, WfoError> {
        let name = strategy.name.as_str();

        // --- 1. Variable setup ---
        self.sink.emit(PhaseEvent::start(Phase::VariableSetup, name));
        let rule = AllocationRule::from_method(&strategy.method, benchmark, self.config.seed)?;
        let settings = SolverSettings::with_tolerance(self.config.optimizer_tolerance);
        let optimizer = PortfolioOptimizer::new(self.config.min_weight, self.config.max_weight, settings)?;
        let preprocessing = Preprocessing::from_config(&self.config);
        // The first row of the range is neither fitted on nor compounded.
        let data = returns
            .between(self.config.date_from, self.config.date_to)
            .skip_rows(1);
        self.sink.emit(PhaseEvent::finish(Phase::VariableSetup, name));

        // --- 2. Date generation ---
        self.sink.emit(PhaseEvent::start(Phase::DateGeneration, name));
        let windows = self.windows()?;
        self.sink.emit(PhaseEvent::finish(Phase::DateGeneration, name));

        tracing::info!(
            strategy = name,
            method = rule.name(),
            windows = windows.len(),
            assets = data.asset_count(),
            "Simulating strategy."
        );

        // --- 3. Weight calculation ---
        self.sink.emit(PhaseEvent::start(Phase::WeightCalculation, name));
        let outcomes = self.calculate_weights(name, &windows, &data, &rule, &optimizer, &preprocessing)?;

        let mut rows = Vec::with_capacity(windows.len());
        let mut failures = Vec::new();
        for (index, outcome) in outcomes {
            match outcome {
                Ok(weights) => rows.push(weights),
                Err(e) => failures.push(WindowFailure {
                    window: windows[index],
                    reason: e.to_string(),
                }),
            }
        }
        self.sink.emit(PhaseEvent::finish(Phase::WeightCalculation, name));

        if !failures.is_empty() {
            tracing::warn!(
                strategy = name,
                failed = failures.len(),
                total = windows.len(),
                "Some windows have no weights."
            );
            if self.config.on_failure == FailurePolicy::Abort {
                return Err(WfoError::WindowsFailed(failures));
            }
        }

        // --- 4. Simulation ---
        self.sink.emit(PhaseEvent::start(Phase::Simulation, name));
        let weights = WeightHistory::new(rows);
        let cumulative = compound(&data, &weights)?;
        let simple = ReturnSeries::new(
            cumulative.dates().to_vec(),
            metrics::returns_from_cumulative(cumulative.values()),
        )?;
        self.sink.emit(PhaseEvent::finish(Phase::Simulation, name));

        Ok(StrategyResult {
            name: name.to_string(),
            details: StrategyDetails::new(strategy, &self.config, settings.tolerance),
            weights,
            cumulative,
            returns: simple,
            failures,
        })
    }

    /// Computes every window's weights on a dedicated pool and returns the
    /// outcomes sorted by window index.
    fn calculate_weights(
        &self,
        name: &str,
        windows: &[Window],
        data: &ReturnMatrix,
        rule: &AllocationRule,
        optimizer: &PortfolioOptimizer,
        preprocessing: &Preprocessing,
    ) -> Result<Vec<WindowOutcome>, WfoError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_count)
            .build()
            .map_err(|e| WfoError::ThreadPool(e.to_string()))?;

        let results: Mutex<Vec<WindowOutcome>> = Mutex::new(Vec::with_capacity(windows.len()));
        let sink = self.sink.as_ref();

        pool.install(|| {
            rayon::scope(|s| {
                let results = &results;
                for (index, window) in windows.iter().enumerate() {
                    s.spawn(move |_| {
                        let message = format!("{} {}", name, window.label());
                        sink.emit(PhaseEvent::start(Phase::WindowWeights, message.clone()));

                        let in_sample = data.between(window.is_start(), window.is_end()).complete_columns();
                        let prepared = preprocessing.apply(&in_sample);
                        let outcome = optimizer.allocate(rule, window, index, &prepared);

                        match &outcome {
                            Ok(_) => sink.emit(PhaseEvent::finish(Phase::WindowWeights, message)),
                            Err(e) => sink.emit(PhaseEvent::failed(Phase::WindowWeights, format!("{}: {}", message, e))),
                        }

                        match results.lock() {
                            Ok(mut guard) => guard.push((index, outcome)),
                            Err(poisoned) => poisoned.into_inner().push((index, outcome)),
                        }
                    });
                }
            });
        });

        let mut outcomes = results.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        outcomes.sort_by_key(|(index, _)| *index);
        Ok(outcomes)
    }
}

/// Compounds a weight history over the returns it governs.
///
/// Starting from a share value of 1, each window's weights are scaled by the
/// current share value and every held position grows with its asset's return
/// on each out-of-sample date (`os_start <= date < os_end`). A missing return
/// counts as zero. The share value after each date is the sum of the
/// positions, so value carries over unchanged from one window to the next.
pub fn compound(returns: &ReturnMatrix, history: &WeightHistory) -> Result<ReturnSeries, CoreError> {
    let mut share = 1.0;
    let mut series = ReturnSeries::default();

    for weights in history.rows() {
        let mut positions: Vec<(usize, f64)> = weights
            .iter()
            .filter_map(|(asset, w)| returns.asset_index(asset).map(|j| (j, w * share)))
            .collect();

        for (i, date) in returns.dates().iter().enumerate() {
            if !weights.window().applies_to(*date) {
                continue;
            }
            for (j, position) in positions.iter_mut() {
                let r = returns.value(i, *j);
                if !r.is_nan() {
                    *position *= 1.0 + r;
                }
            }
            share = positions.iter().map(|(_, p)| p).sum();
            series.push(*date, share)?;
        }
    }

    Ok(series)
}
