use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventsError {
    #[error("Event log lock is poisoned: {0}")]
    Poisoned(String),
}
