//! Agent Core error types.
//!
//! These are failures of the machinery around a turn. Expected control
//! outcomes (duplicate application, no scheme selected) live in
//! `state::TurnError` instead and never surface as `AgentError`.

use thiserror::Error;

/// Errors that can occur during agent core operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Database operation failed.
    #[error("database error: {reason}")]
    DatabaseError { reason: String },

    /// Serialization error.
    #[error("serialization error: {reason}")]
    SerializationError { reason: String },

    /// The pipeline did not reach `Terminated` within the step ceiling.
    #[error("step limit exceeded: {steps} steps without terminating (last step: {last_step})")]
    StepLimitExceeded { steps: u32, last_step: String },

    /// A pipeline node panicked.
    #[error("node panicked: {reason}")]
    NodePanicked { reason: String },

    /// Tool execution error (eligibility engine / registrar).
    #[error("tool execution failed: {reason}")]
    ToolExecutionError { reason: String },

    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A state lock was poisoned by an earlier panic.
    #[error("state lock poisoned: {reason}")]
    LockPoisoned { reason: String },
}

impl From<rusqlite::Error> for AgentError {
    fn from(e: rusqlite::Error) -> Self {
        AgentError::DatabaseError {
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::SerializationError {
            reason: e.to_string(),
        }
    }
}

impl From<crate::schemes::RegistrarError> for AgentError {
    fn from(e: crate::schemes::RegistrarError) -> Self {
        AgentError::ToolExecutionError {
            reason: e.to_string(),
        }
    }
}
