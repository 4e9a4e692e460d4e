use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Not enough data to calculate {metric}: need {required} observations, got {actual}")]
    InsufficientData {
        metric: String,
        required: usize,
        actual: usize,
    },

    #[error("Calculation error: Division by zero encountered in metric '{0}'")]
    DivisionByZero(String),

    #[error("Series share no overlapping dates: {0}")]
    MisalignedSeries(String),

    #[error("Error in calculation: {0}")]
    Calculation(String),
}
