//! # Walkfolio Optimizer
//!
//! Turns one window's in-sample returns into portfolio weights.
//!
//! ## Architectural Principles
//!
//! - **Layer 2 Logic:** depends on `core-types` for the data model and on
//!   `analytics` for the risk metrics its objectives are built from. It knows
//!   nothing about windows being generated or compounded.
//! - **Explicit rules:** `AllocationRule` is resolved once per strategy from the
//!   configured `AllocationMethod`; benchmark-relative rules carry their
//!   benchmark with them.
//! - **Never degenerate:** a window whose problem cannot be solved yields an
//!   `OptimizationFailure` naming the window, not a fallback vector.
//!
//! ## Public API
//!
//! - `PortfolioOptimizer`: bounds plus solver settings, applied per window.
//! - `AllocationRule`: the supported allocation rules; `Objective` holds the
//!   solver-backed ones.
//! - `objective`: portfolio return, volatility, Sharpe and CVaR of `R·w`.
//! - `solver`: the SQP solver and its settings. Its quadratic subproblems go
//!   to Clarabel.

pub mod allocation;
pub mod error;
pub mod objective;
mod qp;
pub mod solver;

pub use allocation::{AllocationRule, Objective, PortfolioOptimizer, DOMINANCE_LEVELS, TAIL_MATCHING_LEVELS};
pub use error::{OptimizerError, SolverError};
pub use solver::{Problem, Solution, SolverSettings};
