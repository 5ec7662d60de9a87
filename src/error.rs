use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("Insufficient data: need {needed} samples, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("Length mismatch: {frequencies} frequencies but {values} values")]
    LengthMismatch { frequencies: usize, values: usize },

    #[error("Non-finite input: {0}")]
    NonFinite(String),

    #[error("Degenerate circle: {0}")]
    DegenerateCircle(String),

    #[error("Characteristic polynomial root not found after {iterations} iterations")]
    RootNotFound { iterations: usize },

    #[error("Least-squares solver failed: {0}")]
    Solver(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sweep file line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, FitError>;
