use crate::error::EventsError;
use crate::messages::{LogLevel, Phase, PhaseEvent, PhaseStatus};
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Mutex;

/// Receives progress events from the simulation core.
///
/// Implementations must be shareable across the weight-calculation workers.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PhaseEvent);
}

/// Forwards every event to the active `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: PhaseEvent) {
        let phase = event.phase.id();
        match event.level {
            LogLevel::Info => {
                tracing::info!(phase, status = %event.status, "{}", event.message)
            }
            LogLevel::Warn => {
                tracing::warn!(phase, status = %event.status, "{}", event.message)
            }
            LogLevel::Error => {
                tracing::error!(phase, status = %event.status, "{}", event.message)
            }
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: PhaseEvent) {}
}

/// Elapsed time between a phase's start and finish events.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseDuration {
    pub phase: Phase,
    pub message: String,
    pub elapsed: Duration,
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<PhaseEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Result<Vec<PhaseEvent>, EventsError> {
        self.events
            .lock()
            .map(|events| events.clone())
            .map_err(|e| EventsError::Poisoned(e.to_string()))
    }

    /// Pairs each start event with the finish event carrying the same phase and
    /// message. Phases that never finished are left out.
    pub fn phase_durations(&self) -> Result<Vec<PhaseDuration>, EventsError> {
        let events = self.events()?;
        let mut open: HashMap<(Phase, &str), chrono::DateTime<chrono::Utc>> = HashMap::new();
        let mut durations = Vec::new();

        for event in &events {
            let key = (event.phase, event.message.as_str());
            match event.status {
                PhaseStatus::Start => {
                    open.insert(key, event.timestamp);
                }
                PhaseStatus::Finish => {
                    if let Some(started) = open.remove(&key) {
                        durations.push(PhaseDuration {
                            phase: event.phase,
                            message: event.message.clone(),
                            elapsed: event.timestamp - started,
                        });
                    }
                }
                PhaseStatus::Failed => {}
            }
        }

        durations.sort_by_key(|d| d.phase);
        Ok(durations)
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: PhaseEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.emit(PhaseEvent::start(Phase::VariableSetup, "Defining variables"));
        sink.emit(PhaseEvent::finish(Phase::VariableSetup, "Defining variables"));

        let events = sink.events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].status, PhaseStatus::Start);
        assert_eq!(events[1].status, PhaseStatus::Finish);
    }

    #[test]
    fn test_phase_durations_pair_start_and_finish() {
        let sink = MemorySink::new();
        sink.emit(PhaseEvent::start(Phase::Simulation, "Simulating strategy"));
        sink.emit(PhaseEvent::start(Phase::WindowWeights, "window a"));
        sink.emit(PhaseEvent::finish(Phase::WindowWeights, "window a"));
        sink.emit(PhaseEvent::start(Phase::WindowWeights, "window b"));
        sink.emit(PhaseEvent::finish(Phase::Simulation, "Simulating strategy"));

        let durations = sink.phase_durations().unwrap();
        assert_eq!(durations.len(), 2);
        assert_eq!(durations[0].phase, Phase::WindowWeights);
        assert_eq!(durations[1].phase, Phase::Simulation);
        assert!(durations.iter().all(|d| d.elapsed >= Duration::zero()));
    }

    #[test]
    fn test_failed_events_are_warnings() {
        let event = PhaseEvent::failed(Phase::WindowWeights, "no convergence");
        assert_eq!(event.level, LogLevel::Warn);
        assert!(event.to_string().contains("Failed no convergence"));
    }

    #[test]
    fn test_tracing_sink_accepts_every_level() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let sink = TracingSink;
        sink.emit(PhaseEvent::start(Phase::DateGeneration, "Generating dates"));
        sink.emit(PhaseEvent::failed(Phase::WindowWeights, "solver"));
        NullSink.emit(PhaseEvent::finish(Phase::DateGeneration, "Generating dates"));
    }
}
