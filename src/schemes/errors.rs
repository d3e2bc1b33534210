//! Scheme dataset and registrar error types.

use thiserror::Error;

/// Errors raised while reading the scheme dataset.
#[derive(Debug, Error)]
pub enum SchemeError {
    /// The dataset file does not exist.
    #[error("scheme dataset not found: {path}")]
    NotFound { path: String },

    /// The dataset file exists but could not be read.
    #[error("failed to read scheme dataset {path}: {reason}")]
    Io { path: String, reason: String },

    /// The dataset file is not valid dataset JSON.
    #[error("failed to parse scheme dataset {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// Errors raised by the application registrar.
#[derive(Debug, Error)]
pub enum RegistrarError {
    /// A previous holder of the registry lock panicked.
    #[error("application registry lock poisoned: {reason}")]
    LockPoisoned { reason: String },
}
