/// Errors raised by the RBM kernel
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Dimension mismatch: expected {expected} parameters, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}

pub type Result<T> = std::result::Result<T, Error>;
