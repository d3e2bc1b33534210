//! Oracle model configuration.
//!
//! The `oracle:` section of `config/assistant.yaml` lists the model endpoints
//! the assistant may use, which one is active, and the fallback chain walked
//! when the active endpoint is unreachable.

use std::collections::HashMap;

use serde::Deserialize;

use super::errors::InferenceError;

// ─── Public Types ────────────────────────────────────────────────────────────

/// A single model endpoint's runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub display_name: String,
    /// OpenAI-compatible base URL, e.g. `https://api.groq.com/openai/v1`.
    pub base_url: String,
    /// Model identifier sent in the request body. Defaults to the config key.
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Name of the environment variable holding the bearer token, if any.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// When `true`, sends `response_format: {"type":"json_object"}` so the
    /// runtime constrains output to a JSON object.
    #[serde(default)]
    pub force_json_response: bool,
}

fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    512
}
fn default_timeout_secs() -> u64 {
    20
}

/// Oracle registry (mirrors the `oracle:` section of the config file).
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    pub active_model: String,
    pub models: HashMap<String, ModelConfig>,
    #[serde(default)]
    pub fallback_chain: Vec<String>,
    /// Hard ceiling on a single oracle call, transport included.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// The ordered list of `(key, model)` candidates for one oracle call: the
/// active model first, then every fallback entry not already listed.
///
/// Keys that don't resolve to a configured model are skipped.
pub fn candidate_models(config: &OracleConfig) -> Vec<(String, ModelConfig)> {
    let mut keys: Vec<&String> = vec![&config.active_model];
    for key in &config.fallback_chain {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    keys.into_iter()
        .filter_map(|key| {
            config
                .models
                .get(key)
                .map(|model| (key.clone(), model.clone()))
        })
        .collect()
}

/// Resolve the active model configuration, respecting the fallback chain.
///
/// Returns `(model_key, ModelConfig)` for the first configured model.
/// Reachability is checked at call time by the client.
pub fn resolve_active_model(config: &OracleConfig) -> Result<(String, ModelConfig), InferenceError> {
    candidate_models(config)
        .into_iter()
        .next()
        .ok_or_else(|| InferenceError::ConfigError {
            reason: format!(
                "active model '{}' not found in config and no fallback available",
                config.active_model
            ),
        })
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
pub(crate) fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr));
        } else {
            result.push(ch);
        }
    }

    result
}

/// Resolve a variable expression like `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str) -> String {
    if let Some(idx) = expr.find(":-") {
        let var_name = &expr[..idx];
        let default = &expr[idx + 2..];
        std::env::var(var_name).unwrap_or_else(|_| expand_tilde(default))
    } else {
        std::env::var(expr).unwrap_or_default()
    }
}

/// Expand a leading `~` to the user's home directory.
pub(crate) fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn model(url: &str) -> ModelConfig {
        ModelConfig {
            display_name: url.to_string(),
            base_url: url.to_string(),
            model_name: None,
            temperature: 0.2,
            max_tokens: 256,
            api_key_env: None,
            force_json_response: false,
        }
    }

    #[test]
    fn test_interpolate_env_vars_with_default() {
        std::env::remove_var("__SCHEME_TEST_NONEXISTENT__");
        let result = interpolate_env_vars("${__SCHEME_TEST_NONEXISTENT__:-http://localhost:11434/v1}");
        assert_eq!(result, "http://localhost:11434/v1");
    }

    #[test]
    fn test_interpolate_env_vars_with_value() {
        std::env::set_var("__SCHEME_TEST_ORACLE_URL__", "http://oracle:8080/v1");
        let result = interpolate_env_vars("base_url: ${__SCHEME_TEST_ORACLE_URL__:-http://x}");
        assert_eq!(result, "base_url: http://oracle:8080/v1");
        std::env::remove_var("__SCHEME_TEST_ORACLE_URL__");
    }

    #[test]
    fn test_interpolate_no_vars() {
        let input = "plain text with no variables";
        assert_eq!(interpolate_env_vars(input), input);
    }

    #[test]
    fn test_candidate_models_orders_active_first_without_duplicates() {
        let mut models = HashMap::new();
        models.insert("groq".to_string(), model("http://groq"));
        models.insert("ollama".to_string(), model("http://ollama"));
        let config = OracleConfig {
            active_model: "groq".into(),
            models,
            fallback_chain: vec!["groq".into(), "missing".into(), "ollama".into()],
            timeout_secs: 5,
        };

        let keys: Vec<String> = candidate_models(&config).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["groq".to_string(), "ollama".to_string()]);
    }

    #[test]
    fn test_resolve_active_model_falls_back() {
        let mut models = HashMap::new();
        models.insert("ollama".to_string(), model("http://ollama"));
        let config = OracleConfig {
            active_model: "gone".into(),
            models,
            fallback_chain: vec!["ollama".into()],
            timeout_secs: 5,
        };
        let (key, _) = resolve_active_model(&config).unwrap();
        assert_eq!(key, "ollama");
    }

    #[test]
    fn test_resolve_active_model_not_found() {
        let config = OracleConfig {
            active_model: "nonexistent".into(),
            models: HashMap::new(),
            fallback_chain: vec![],
            timeout_secs: 5,
        };
        assert!(resolve_active_model(&config).is_err());
    }

    #[test]
    fn test_defaults_apply_when_fields_absent() {
        let yaml = r#"
            active_model: local
            models:
              local:
                display_name: "Local"
                base_url: "http://localhost:11434/v1"
        "#;
        let config: OracleConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.timeout_secs, 20);
        let m = config.models.get("local").unwrap();
        assert!(!m.force_json_response);
        assert_eq!(m.max_tokens, 512);
    }
}
