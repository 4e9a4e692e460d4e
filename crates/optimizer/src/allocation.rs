use crate::error::{OptimizerError, SolverError};
use crate::objective;
use crate::solver::{self, Problem, SolverSettings};
use analytics::metrics;
use core_types::{AllocationMethod, ReturnMatrix, ReturnSeries, WeightVector, Window};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Percentile pairs for tail matching are drawn from this grid.
pub const TAIL_MATCHING_LEVELS: [f64; 7] = [1.0, 5.0, 25.0, 50.0, 75.0, 95.0, 99.0];

/// Percentile grid for the stochastic dominance maximin.
pub const DOMINANCE_LEVELS: [f64; 9] = [1.0, 5.0, 10.0, 25.0, 50.0, 75.0, 90.0, 95.0, 100.0];

/// A fully resolved allocation rule, ready to be applied to any window.
#[derive(Debug, Clone, PartialEq)]
pub enum AllocationRule {
    EquallyWeighted,
    Random { seed: Option<u64> },
    Optimized(Objective),
}

/// A rule whose weights come out of the constrained solver.
#[derive(Debug, Clone, PartialEq)]
pub enum Objective {
    MinVol { target_return: Option<f64> },
    MaxSharpe,
    MinCvar { level: f64 },
    MaxReturnTailMatching { benchmark: ReturnSeries },
    StochasticDominance { benchmark: ReturnSeries },
}

impl AllocationRule {
    /// Resolves a configured method. Benchmark-relative methods fail here when
    /// no benchmark is available, before any window is processed.
    pub fn from_method(
        method: &AllocationMethod,
        benchmark: Option<&ReturnSeries>,
        seed: Option<u64>,
    ) -> Result<Self, OptimizerError> {
        let require_benchmark = || {
            benchmark
                .cloned()
                .ok_or_else(|| OptimizerError::MissingBenchmark(method.name().to_string()))
        };

        let objective = match method {
            AllocationMethod::EquallyWeighted => return Ok(AllocationRule::EquallyWeighted),
            AllocationMethod::Random => return Ok(AllocationRule::Random { seed }),
            AllocationMethod::MinVol { target_return } => Objective::MinVol {
                target_return: *target_return,
            },
            AllocationMethod::MaxSharpe => Objective::MaxSharpe,
            AllocationMethod::MinCvar { level } => Objective::MinCvar { level: *level },
            AllocationMethod::MaxReturnWithTailMatching => Objective::MaxReturnTailMatching {
                benchmark: require_benchmark()?,
            },
            AllocationMethod::StochasticDominance => Objective::StochasticDominance {
                benchmark: require_benchmark()?,
            },
        };
        Ok(AllocationRule::Optimized(objective))
    }

    pub fn name(&self) -> &'static str {
        match self {
            AllocationRule::EquallyWeighted => "equally_weighted",
            AllocationRule::Random { .. } => "random",
            AllocationRule::Optimized(objective) => objective.name(),
        }
    }
}

impl Objective {
    pub fn name(&self) -> &'static str {
        match self {
            Objective::MinVol { .. } => "min_vol",
            Objective::MaxSharpe => "max_sharpe",
            Objective::MinCvar { .. } => "min_cvar",
            Objective::MaxReturnTailMatching { .. } => "max_return_with_tail_matching",
            Objective::StochasticDominance { .. } => "stochastic_dominance",
        }
    }
}

/// Fits weights for one window under per-asset bounds and a full-investment budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioOptimizer {
    min_weight: f64,
    max_weight: f64,
    settings: SolverSettings,
}

impl PortfolioOptimizer {
    pub fn new(min_weight: f64, max_weight: f64, settings: SolverSettings) -> Result<Self, OptimizerError> {
        if !(min_weight <= max_weight) {
            return Err(OptimizerError::InvalidBounds {
                min: min_weight,
                max: max_weight,
            });
        }
        Ok(Self {
            min_weight,
            max_weight,
            settings,
        })
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min_weight, self.max_weight)
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Computes the weight vector for `window` from its cleaned in-sample returns.
    ///
    /// `window_index` only feeds the seed of a seeded random rule, so each
    /// window draws a different but reproducible vector.
    pub fn allocate(
        &self,
        rule: &AllocationRule,
        window: &Window,
        window_index: usize,
        in_sample: &ReturnMatrix,
    ) -> Result<WeightVector, OptimizerError> {
        let n = in_sample.asset_count();
        if n == 0 {
            return Err(OptimizerError::NoAssets(*window));
        }

        let weights = match rule {
            AllocationRule::EquallyWeighted => vec![1.0 / n as f64; n],
            AllocationRule::Random { seed } => random_weights(n, seed.map(|s| s.wrapping_add(window_index as u64))),
            AllocationRule::Optimized(goal) => {
                if in_sample.is_empty() {
                    return Err(OptimizerError::EmptyInSample(*window));
                }
                self.optimize(goal, window, in_sample)?
            }
        };

        Ok(WeightVector::from_assets(*window, in_sample.assets(), &weights))
    }

    fn optimize(
        &self,
        goal: &Objective,
        window: &Window,
        in_sample: &ReturnMatrix,
    ) -> Result<Vec<f64>, OptimizerError> {
        let returns = DMatrix::from_fn(in_sample.len(), in_sample.asset_count(), |i, j| in_sample.value(i, j));
        let r = &returns;
        let (lo, hi) = self.bounds();
        let budget = |w: &[f64]| w.iter().sum::<f64>() - 1.0;

        let problem = match goal {
            Objective::MinVol { target_return } => {
                let problem = Problem::new(|w| objective::vol(w, r), lo, hi).equality(budget);
                match *target_return {
                    Some(target) => problem.inequality(move |w| objective::ret(w, r) - target),
                    None => problem,
                }
            }
            Objective::MaxSharpe => Problem::new(|w| -objective::sharpe(w, r), lo, hi).equality(budget),
            Objective::MinCvar { level } => {
                let level = *level;
                Problem::new(move |w| -objective::cvar(w, r, level), lo, hi).equality(budget)
            }
            Objective::MaxReturnTailMatching { benchmark } => {
                let market = self.market_cvars(benchmark, window, &TAIL_MATCHING_LEVELS)?;
                let mut problem = Problem::new(|w| -objective::ret(w, r), lo, hi).equality(budget);
                for i in 0..TAIL_MATCHING_LEVELS.len() {
                    for j in (i + 1)..TAIL_MATCHING_LEVELS.len() {
                        let (p1, p2) = (TAIL_MATCHING_LEVELS[i], TAIL_MATCHING_LEVELS[j]);
                        let market_spread = market[j] - market[i];
                        problem = problem.inequality(move |w| {
                            (objective::cvar(w, r, p2) - objective::cvar(w, r, p1)) - market_spread
                        });
                    }
                }
                problem
            }
            Objective::StochasticDominance { benchmark } => {
                let market = self.market_cvars(benchmark, window, &DOMINANCE_LEVELS)?;
                Problem::new(
                    move |w| {
                        let worst = DOMINANCE_LEVELS
                            .iter()
                            .zip(&market)
                            .map(|(&level, m)| m - objective::cvar(w, r, level))
                            .fold(f64::INFINITY, f64::min);
                        -worst
                    },
                    lo,
                    hi,
                )
                .equality(budget)
            }
        };

        let n = in_sample.asset_count();
        let x0 = vec![1.0 / n as f64; n];
        let failure = |reason: SolverError| OptimizerError::OptimizationFailure {
            window: *window,
            reason,
        };

        let solution = solver::minimize(&problem, &x0, &self.settings).map_err(failure)?;
        if solution.x.iter().any(|w| !w.is_finite()) {
            return Err(failure(SolverError::NonFinite("solution".to_string())));
        }

        tracing::debug!(
            rule = goal.name(),
            window = %window.label(),
            iterations = solution.iterations,
            objective = solution.objective,
            "Window optimized."
        );
        Ok(solution.x)
    }

    /// Benchmark CVaR at each level over the window's in-sample dates.
    fn market_cvars(
        &self,
        benchmark: &ReturnSeries,
        window: &Window,
        levels: &[f64],
    ) -> Result<Vec<f64>, OptimizerError> {
        let market = benchmark.between(window.is_start(), window.is_end());
        levels
            .iter()
            .map(|&level| {
                metrics::conditional_value_at_risk(market.values(), level).map_err(|e| OptimizerError::Benchmark {
                    window: *window,
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

fn random_weights(n: usize, seed: Option<u64>) -> Vec<f64> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let draws: Vec<f64> = (0..n).map(|_| rng.r#gen::<f64>()).collect();
    let total: f64 = draws.iter().sum();
    if total > 0.0 {
        draws.into_iter().map(|d| d / total).collect()
    } else {
        vec![1.0 / n as f64; n]
    }
}
