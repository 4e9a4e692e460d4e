use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Dates must be strictly increasing, but {current} follows {previous}")]
    UnorderedDates {
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("Window dates violate is_start <= is_end < os_start <= os_end: {0}")]
    InvalidWindow(String),

    #[error("Row {row} has {actual} values but the matrix has {expected} assets")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },
}
