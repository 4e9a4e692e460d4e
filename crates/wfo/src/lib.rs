//! # Walkfolio WFO
//!
//! The walk-forward engine. It cuts the date range into rolling windows, asks
//! the optimizer for each window's weights on a dedicated worker pool and
//! compounds the out-of-sample returns into one continuous equity curve.
//!
//! Failures stay local to their window: with `FailurePolicy::Skip` a failed
//! window is left out of the weight history and reported in the result.

pub mod error;
pub mod periods;
pub mod preprocess;
pub mod result;
pub mod simulator;

pub use error::WfoError;
pub use preprocess::Preprocessing;
pub use result::{Benchmark, StrategyDetails, StrategyResult, WindowFailure};
pub use simulator::{compound, StrategySimulator};
