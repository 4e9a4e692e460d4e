//! # Walkfolio Analytics
//!
//! This crate provides the tools for scoring the return series a strategy
//! simulation produces. It acts as the "unbiased judge" of the system.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of
//!   optimization or simulation. It depends only on `core-types` (Layer 0).
//! - **Stateless Calculation:** `metrics` holds pure functions over return
//!   slices; the `AnalyticsEngine` combines them into a `StrategyStats` report.
//!   A metric that cannot be computed is reported as undefined instead of
//!   failing the whole report.
//!
//! ## Public API
//!
//! - `metrics`: annualized return/volatility, Sharpe, Sortino, Treynor, beta,
//!   VaR/CVaR, Starr, drawdowns, skew/kurtosis, rolling metrics.
//! - `AnalyticsEngine`: per-strategy statistics, multi-strategy comparison and
//!   rolling metric series.
//! - `StrategyStats`: the standardized report.
//! - `AnalyticsError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod metrics;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use engine::{AnalyticsEngine, StatsInput, TAIL_LEVEL};
pub use error::AnalyticsError;
pub use report::{RollingStats, StrategyStats, UndefinedMetric};
