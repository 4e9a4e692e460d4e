//! # Walkfolio Core Types
//!
//! The Layer 0 crate: the data model shared by every other crate in the
//! workspace. It has no knowledge of optimization or statistics, it only
//! guarantees the shape of the data flowing between them.

pub mod enums;
pub mod error;
pub mod series;
pub mod weights;
pub mod window;

// Re-export the core types to provide a clean public API.
pub use enums::{AllocationMethod, FailurePolicy};
pub use error::CoreError;
pub use series::{ReturnMatrix, ReturnSeries};
pub use weights::{RebalanceSummary, WeightHistory, WeightVector, POSITION_THRESHOLD};
pub use window::Window;
