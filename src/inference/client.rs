//! OpenAI-compatible inference client.
//!
//! Sends non-streaming chat completion requests to the configured endpoint
//! and returns the raw completion text. Walks the fallback chain when the
//! active model is unreachable.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use super::config::{candidate_models, resolve_active_model, ModelConfig, OracleConfig};
use super::errors::InferenceError;
use super::oracle::LanguageOracle;
use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ResponseFormat};

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ─── InferenceClient ─────────────────────────────────────────────────────────

/// Client for the language oracle endpoint(s).
///
/// Holds no per-call state, so one instance is shared by every conversation
/// thread.
pub struct InferenceClient {
    http: HttpClient,
    config: OracleConfig,
    /// Display name of the active model (for logging).
    active_display_name: String,
}

impl InferenceClient {
    /// Create a new inference client from the oracle configuration.
    ///
    /// Resolves the active model from config. Does NOT check connectivity —
    /// that happens on the first request.
    pub fn from_config(config: OracleConfig) -> Result<Self, InferenceError> {
        let (_key, active) = resolve_active_model(&config)?;

        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: active.base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            active_display_name: active.display_name.clone(),
            config,
        })
    }

    /// The name of the active model.
    pub fn current_model_name(&self) -> &str {
        &self.active_display_name
    }

    /// Configured per-request timeout for a single model.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs.max(1))
    }

    /// Time one `complete` call may take when every model in the chain
    /// runs into its own timeout.
    pub fn call_budget(&self) -> Duration {
        let candidates = candidate_models(&self.config).len().max(1) as u32;
        self.timeout() * candidates
    }

    // ─── Chat Completion (non-streaming) ─────────────────────────────────

    /// Try each candidate model in order until one answers.
    async fn complete_with_fallback(&self, prompt: &str) -> Result<String, InferenceError> {
        let mut attempted = Vec::new();
        let mut last_error: Option<InferenceError> = None;

        for (key, model) in candidate_models(&self.config) {
            match self.try_request(&key, &model, prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if Self::is_retriable(&e) => {
                    tracing::warn!(model = %key, error = %e, "oracle model unavailable, trying next");
                    attempted.push(key);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        match last_error {
            Some(e) if attempted.len() == 1 => Err(e),
            _ => Err(InferenceError::AllModelsUnavailable { attempted }),
        }
    }

    /// Send a single request to one model.
    async fn try_request(
        &self,
        key: &str,
        model: &ModelConfig,
        prompt: &str,
    ) -> Result<String, InferenceError> {
        let url = format!("{}/chat/completions", model.base_url.trim_end_matches('/'));
        let model_name = model.model_name.clone().unwrap_or_else(|| key.to_string());

        let response_format = model.force_json_response.then(|| ResponseFormat {
            r#type: "json_object".to_string(),
        });

        let body = ChatCompletionRequest {
            model: model_name,
            messages: vec![ChatMessage::user(prompt)],
            temperature: model.temperature,
            max_tokens: model.max_tokens,
            stream: false,
            response_format,
        };

        tracing::debug!(
            url = %url,
            model = %body.model,
            prompt_bytes = prompt.len(),
            "oracle request"
        );

        let mut request = self.http.post(&url).json(&body);
        if let Some(token) = model
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
        {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout {
                    duration_secs: self.config.timeout_secs,
                }
            } else {
                InferenceError::ConnectionFailed {
                    endpoint: url.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(|e| InferenceError::MalformedPayload {
                raw_excerpt: String::new(),
                reason: format!("failed to decode completion body: {e}"),
            })?;

        parsed
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| InferenceError::EmptyCompletion {
                model: key.to_string(),
            })
    }

    // ─── Health Check ────────────────────────────────────────────────────

    /// Check if the active model endpoint is reachable.
    pub async fn health_check(&self) -> bool {
        let Ok((_, model)) = resolve_active_model(&self.config) else {
            return false;
        };
        let url = format!("{}/models", model.base_url.trim_end_matches('/'));

        match self.http.get(&url).timeout(CONNECT_TIMEOUT).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Whether an error should trigger a fallback attempt.
    ///
    /// HTTP 404 is included because local runtimes return 404 when a model
    /// isn't pulled; the next model in the chain may still be available.
    fn is_retriable(err: &InferenceError) -> bool {
        matches!(
            err,
            InferenceError::ConnectionFailed { .. }
                | InferenceError::Timeout { .. }
                | InferenceError::HttpError { status: 404, .. }
                | InferenceError::HttpError { status: 429, .. }
                | InferenceError::HttpError { status: 500, .. }
                | InferenceError::HttpError { status: 502..=504, .. }
        )
    }
}

#[async_trait]
impl LanguageOracle for InferenceClient {
    fn name(&self) -> &str {
        &self.active_display_name
    }

    async fn complete(&self, prompt: &str) -> Result<String, InferenceError> {
        self.complete_with_fallback(prompt).await
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn model(name: &str, url: &str) -> ModelConfig {
        ModelConfig {
            display_name: name.to_string(),
            base_url: url.to_string(),
            model_name: None,
            temperature: 0.2,
            max_tokens: 256,
            api_key_env: None,
            force_json_response: false,
        }
    }

    fn test_config() -> OracleConfig {
        let mut models = HashMap::new();
        // Port 9 (discard) on loopback: connection refused immediately.
        models.insert("model-a".to_string(), model("Model A", "http://127.0.0.1:9/v1"));
        models.insert("model-b".to_string(), model("Model B", "http://127.0.0.1:9/v2"));
        OracleConfig {
            active_model: "model-a".to_string(),
            models,
            fallback_chain: vec!["model-a".to_string(), "model-b".to_string()],
            timeout_secs: 2,
        }
    }

    #[test]
    fn test_from_config_selects_active_model() {
        let client = InferenceClient::from_config(test_config()).unwrap();
        assert_eq!(client.current_model_name(), "Model A");
        assert_eq!(client.timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_call_budget_covers_fallback_chain() {
        let client = InferenceClient::from_config(test_config()).unwrap();
        assert_eq!(client.call_budget(), Duration::from_secs(4));

        let mut single = test_config();
        single.fallback_chain.clear();
        let client = InferenceClient::from_config(single).unwrap();
        assert_eq!(client.call_budget(), client.timeout());
    }

    #[test]
    fn test_from_config_rejects_empty_registry() {
        let config = OracleConfig {
            active_model: "none".into(),
            models: HashMap::new(),
            fallback_chain: vec![],
            timeout_secs: 2,
        };
        assert!(InferenceClient::from_config(config).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_chain_reports_all_attempted() {
        let client = InferenceClient::from_config(test_config()).unwrap();
        let err = client.complete("prompt").await.unwrap_err();
        match err {
            InferenceError::AllModelsUnavailable { attempted } => {
                assert_eq!(attempted, vec!["model-a".to_string(), "model-b".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_is_retriable() {
        assert!(InferenceClient::is_retriable(&InferenceError::ConnectionFailed {
            endpoint: "".into(),
            reason: "".into()
        }));
        assert!(InferenceClient::is_retriable(&InferenceError::Timeout { duration_secs: 5 }));
        assert!(InferenceClient::is_retriable(&InferenceError::HttpError {
            status: 503,
            body: "".into()
        }));
        assert!(!InferenceClient::is_retriable(&InferenceError::HttpError {
            status: 401,
            body: "".into()
        }));
        assert!(!InferenceClient::is_retriable(&InferenceError::EmptyCompletion {
            model: "x".into()
        }));
    }
}
