//! Error types for the spectral loss engine

use thiserror::Error;

/// Errors that can occur while building or evaluating a loss
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LossError {
    /// Invalid configuration, raised when a loss is constructed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid input signals, raised when a loss is evaluated
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Numerical error (non-finite filterbank weights, etc.)
    #[error("Numerical error: {0}")]
    NumericalError(String),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, LossError>;
