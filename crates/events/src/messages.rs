use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Enum representing the severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// The stages of a strategy run, numbered in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    VariableSetup,
    DateGeneration,
    WeightCalculation,
    WindowWeights,
    Simulation,
}

impl Phase {
    pub fn id(&self) -> u8 {
        match self {
            Phase::VariableSetup => 1,
            Phase::DateGeneration => 2,
            Phase::WeightCalculation => 3,
            Phase::WindowWeights => 4,
            Phase::Simulation => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseStatus {
    Start,
    Finish,
    Failed,
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PhaseStatus::Start => "Starting",
            PhaseStatus::Finish => "Finished",
            PhaseStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// A single timestamped progress record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseEvent {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub phase: Phase,
    pub status: PhaseStatus,
    pub message: String,
}

impl PhaseEvent {
    pub fn start(phase: Phase, message: impl Into<String>) -> Self {
        Self::now(LogLevel::Info, phase, PhaseStatus::Start, message)
    }

    pub fn finish(phase: Phase, message: impl Into<String>) -> Self {
        Self::now(LogLevel::Info, phase, PhaseStatus::Finish, message)
    }

    pub fn failed(phase: Phase, message: impl Into<String>) -> Self {
        Self::now(LogLevel::Warn, phase, PhaseStatus::Failed, message)
    }

    fn now(level: LogLevel, phase: Phase, status: PhaseStatus, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            phase,
            status,
            message: message.into(),
        }
    }
}

impl fmt::Display for PhaseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.status,
            self.message
        )
    }
}
