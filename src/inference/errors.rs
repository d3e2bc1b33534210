//! Inference error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Structured logging
//! is the caller's responsibility — these types carry the context needed to build
//! meaningful log entries.

use thiserror::Error;

/// Errors that can occur while talking to the language oracle.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// TCP/HTTP connection to the model endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed {
        endpoint: String,
        reason: String,
    },

    /// The oracle did not respond within the configured timeout.
    #[error("inference timeout after {duration_secs}s")]
    Timeout {
        duration_secs: u64,
    },

    /// Every model in the fallback chain was unavailable.
    #[error("all models unavailable (tried: {})", attempted.join(", "))]
    AllModelsUnavailable {
        attempted: Vec<String>,
    },

    /// Non-2xx HTTP response from the model endpoint.
    #[error("HTTP {status}: {body}")]
    HttpError {
        status: u16,
        body: String,
    },

    /// The endpoint answered but the completion carried no text.
    #[error("empty completion from {model}")]
    EmptyCompletion {
        model: String,
    },

    /// The completion did not contain exactly one valid JSON object, or the
    /// object did not match the expected shape.
    #[error("malformed oracle payload: {reason}")]
    MalformedPayload {
        raw_excerpt: String,
        reason: String,
    },

    /// Configuration loading or validation error.
    #[error("config error: {reason}")]
    ConfigError {
        reason: String,
    },
}

impl InferenceError {
    /// Whether the oracle could not be reached at all (as opposed to answering
    /// with garbage).
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            InferenceError::ConnectionFailed { .. }
                | InferenceError::Timeout { .. }
                | InferenceError::AllModelsUnavailable { .. }
                | InferenceError::HttpError { .. }
        )
    }

    /// Whether this is a payload-level failure (the oracle answered, but the
    /// answer was unusable).
    pub fn is_payload_error(&self) -> bool {
        matches!(
            self,
            InferenceError::MalformedPayload { .. } | InferenceError::EmptyCompletion { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_unavailable() {
        let err = InferenceError::Timeout { duration_secs: 20 };
        assert!(err.is_unavailable());
        assert!(!err.is_payload_error());
    }

    #[test]
    fn test_malformed_payload_is_payload_error() {
        let err = InferenceError::MalformedPayload {
            raw_excerpt: "{\"intent\":".to_string(),
            reason: "unbalanced braces".to_string(),
        };
        assert!(err.is_payload_error());
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_all_models_unavailable_message() {
        let err = InferenceError::AllModelsUnavailable {
            attempted: vec!["groq".into(), "ollama".into()],
        };
        assert_eq!(err.to_string(), "all models unavailable (tried: groq, ollama)");
    }
}
