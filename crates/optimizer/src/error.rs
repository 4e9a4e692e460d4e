use core_types::Window;
use thiserror::Error;

/// Why the numerical solver gave up on a problem.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Constraints are infeasible: {0}")]
    Infeasible(String),

    #[error("Line search failed to decrease the merit function at iteration {0}")]
    LineSearch(usize),

    #[error("No convergence after {0} iterations")]
    IterationLimit(usize),

    #[error("Non-finite value in {0}")]
    NonFinite(String),

    #[error("Singular or indefinite matrix in the quadratic subproblem")]
    Singular,

    #[error("Quadratic subproblem failed: {0}")]
    Subproblem(String),

    #[error("Problem has no variables")]
    Empty,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizerError {
    #[error("Optimization failed for window {window}: {reason}")]
    OptimizationFailure { window: Window, reason: SolverError },

    #[error("Allocation method '{0}' needs a benchmark series, but none was supplied")]
    MissingBenchmark(String),

    #[error("No asset has a complete in-sample history in window {0}")]
    NoAssets(Window),

    #[error("In-sample period of window {0} has no observations")]
    EmptyInSample(Window),

    #[error("Benchmark cannot be scored in window {window}: {reason}")]
    Benchmark { window: Window, reason: String },

    #[error("Invalid weight bounds: min {min} is greater than max {max}")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),
}
