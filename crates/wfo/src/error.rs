use crate::result::WindowFailure;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WfoError {
    #[error("No windows fit between {from} and {to}; widen the date range or shorten the periods")]
    EmptyWindowSequence { from: NaiveDate, to: NaiveDate },

    #[error("Invalid weight bounds: min {min} is greater than max {max}")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Date range or period error: {0}")]
    DateError(String),

    #[error("Allocation method '{0}' needs a benchmark series, but none was supplied")]
    MissingBenchmark(String),

    #[error("{} window(s) failed to compute weights", .0.len())]
    WindowsFailed(Vec<WindowFailure>),

    #[error("Failed to build the worker pool: {0}")]
    ThreadPool(String),

    #[error("Optimizer error: {0}")]
    Optimizer(optimizer::OptimizerError),

    #[error("Data error: {0}")]
    Core(#[from] core_types::CoreError),
}

impl From<optimizer::OptimizerError> for WfoError {
    fn from(error: optimizer::OptimizerError) -> Self {
        match error {
            optimizer::OptimizerError::MissingBenchmark(method) => WfoError::MissingBenchmark(method),
            optimizer::OptimizerError::InvalidBounds { min, max } => WfoError::InvalidBounds { min, max },
            other => WfoError::Optimizer(other),
        }
    }
}
