//! The language-oracle seam.
//!
//! `LanguageOracle` is the black-box text-completion contract; its output is
//! never trusted. `OracleAdapter` puts a hard timeout around every call and
//! validates the single JSON payload the prompt asked for.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::errors::InferenceError;
use super::json_payload::parse_json_payload;
use super::prompts::{render_prompt, PromptKind};

/// External text-completion service.
#[async_trait]
pub trait LanguageOracle: Send + Sync {
    /// Oracle name for logging.
    fn name(&self) -> &str;

    /// Complete `prompt` and return the raw text.
    async fn complete(&self, prompt: &str) -> Result<String, InferenceError>;
}

/// Oracle used when no endpoint is configured. Every call fails, which sends
/// extraction down the regex path and intent down the keyword heuristic.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineOracle;

#[async_trait]
impl LanguageOracle for OfflineOracle {
    fn name(&self) -> &str {
        "offline"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, InferenceError> {
        Err(InferenceError::ConnectionFailed {
            endpoint: "offline".to_string(),
            reason: "no language oracle configured".to_string(),
        })
    }
}

// ─── Adapter ─────────────────────────────────────────────────────────────────

/// Templated prompt in, validated JSON payload out.
#[derive(Clone)]
pub struct OracleAdapter {
    oracle: Arc<dyn LanguageOracle>,
    timeout: Duration,
}

impl OracleAdapter {
    pub fn new(oracle: Arc<dyn LanguageOracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    /// Adapter around [`OfflineOracle`].
    pub fn offline() -> Self {
        Self::new(Arc::new(OfflineOracle), Duration::from_secs(1))
    }

    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    /// Render `kind` for `utterance`, call the oracle, and decode the payload.
    pub async fn request<T: DeserializeOwned>(
        &self,
        kind: PromptKind,
        utterance: &str,
    ) -> Result<T, InferenceError> {
        let prompt = render_prompt(kind, utterance);
        let raw = self.complete_raw(&prompt).await?;
        let parsed = parse_json_payload::<T>(&raw);
        if let Err(ref e) = parsed {
            tracing::warn!(
                oracle = self.oracle.name(),
                prompt = ?kind,
                error = %e,
                "oracle payload rejected"
            );
        }
        parsed
    }

    /// Call the oracle under the adapter's timeout.
    pub async fn complete_raw(&self, prompt: &str) -> Result<String, InferenceError> {
        match tokio::time::timeout(self.timeout, self.oracle.complete(prompt)).await {
            Ok(Ok(text)) if text.trim().is_empty() => Err(InferenceError::EmptyCompletion {
                model: self.oracle.name().to_string(),
            }),
            Ok(result) => result,
            Err(_) => Err(InferenceError::Timeout {
                duration_secs: self.timeout.as_secs(),
            }),
        }
    }
}

// ─── Test doubles ────────────────────────────────────────────────────────────


// ─── Tests ───────────────────────────────────────────────────────────────────
