//! # Walkfolio Events
//!
//! This crate defines the progress events the simulation core emits while it
//! runs: timestamped phase-start / phase-finish records with a severity level.
//!
//! The core never prints. It receives an [`EventSink`] and reports through it,
//! so callers decide whether events end up in `tracing`, in a progress bar or
//! in memory for later inspection.

// Declare the modules that make up this crate.
pub mod error;
pub mod messages;
pub mod sink;

// Re-export the core types to provide a clean public API.
pub use error::EventsError;
pub use messages::{LogLevel, Phase, PhaseEvent, PhaseStatus};
pub use sink::{EventSink, MemorySink, NullSink, PhaseDuration, TracingSink};
