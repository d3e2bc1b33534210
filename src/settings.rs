//! Assistant configuration — `config/assistant.yaml`.
//!
//! ```yaml
//! oracle:
//!   active_model: local
//!   timeout_secs: 20
//!   models:
//!     local:
//!       display_name: "Local model"
//!       base_url: "${ORACLE_URL:-http://localhost:11434/v1}"
//! agent:
//!   confidence_threshold: 0.6
//! schemes_path: data/schemes.json
//! ```
//!
//! Every section is optional. Without an `oracle` section the assistant runs
//! with the offline oracle.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::agent_core::AgentError;
use crate::inference::config::{expand_tilde, interpolate_env_vars};
use crate::inference::OracleConfig;

/// Config file location relative to the project root.
pub const CONFIG_RELATIVE_PATH: &str = "config/assistant.yaml";

/// Env var naming the project root.
pub const ROOT_ENV_VAR: &str = "SCHEME_ASSISTANT_ROOT";

// ─── Types ──────────────────────────────────────────────────────────────────

/// Tunables of the turn pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Oracle extraction below this confidence is discarded for regex.
    pub confidence_threshold: f64,
    /// Hard ceiling on pipeline steps per turn.
    pub max_steps: u32,
    /// Utterances shorter than this (in characters) are rejected.
    pub min_utterance_chars: usize,
    /// Schemes enumerated in one response.
    pub max_listed_schemes: usize,
    pub estimated_processing_days: u32,
    /// Words that alone do not make a meaningful utterance.
    pub filler_words: Vec<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            max_steps: 50,
            min_utterance_chars: 6,
            max_listed_schemes: 5,
            estimated_processing_days: 15,
            filler_words: ["हां", "हाँ", "हुँ", "हूँ", "अच्छा", "नमस्ते", "ठीक", "ok", "hmm"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub oracle: Option<OracleConfig>,
    pub agent: AgentSettings,
    pub schemes_path: Option<String>,
    pub database_path: Option<String>,
}

impl AssistantConfig {
    /// Scheme dataset path, relative paths resolved against `base`.
    pub fn schemes_path(&self, base: &Path) -> PathBuf {
        resolve(base, self.schemes_path.as_deref().unwrap_or("data/schemes.json"))
    }

    /// Database path, if configured. Relative paths resolve against `base`.
    pub fn database_path(&self, base: &Path) -> Option<PathBuf> {
        self.database_path.as_deref().map(|p| resolve(base, p))
    }
}

fn resolve(base: &Path, path: &str) -> PathBuf {
    let expanded = PathBuf::from(expand_tilde(path));
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

// ─── Loading ────────────────────────────────────────────────────────────────

/// Find `config/assistant.yaml` by walking upward from `start`.
///
/// Checks the `SCHEME_ASSISTANT_ROOT` env var first.
pub fn find_config_path(start: &Path) -> Option<PathBuf> {
    if let Ok(root) = std::env::var(ROOT_ENV_VAR) {
        let candidate = PathBuf::from(&root).join(CONFIG_RELATIVE_PATH);
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_RELATIVE_PATH);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Load and parse the configuration file, interpolating `${VAR}` references.
pub fn load_config(path: &Path) -> Result<AssistantConfig, AgentError> {
    let raw = std::fs::read_to_string(path).map_err(|e| AgentError::ConfigError {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;

    let interpolated = interpolate_env_vars(&raw);

    let config: AssistantConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| AgentError::ConfigError {
            reason: format!("failed to parse {}: {e}", path.display()),
        })?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &AssistantConfig) -> Result<(), AgentError> {
    let agent = &config.agent;
    if !(0.0..=1.0).contains(&agent.confidence_threshold) {
        return Err(AgentError::ConfigError {
            reason: format!(
                "agent.confidence_threshold must be within [0, 1], got {}",
                agent.confidence_threshold
            ),
        });
    }
    if agent.max_steps < 4 {
        return Err(AgentError::ConfigError {
            reason: format!("agent.max_steps must allow a full turn (>= 4), got {}", agent.max_steps),
        });
    }
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("{}\n");
        let config = load_config(file.path()).unwrap();
        assert!(config.oracle.is_none());
        assert_eq!(config.agent, AgentSettings::default());
        assert_eq!(
            config.schemes_path(Path::new("/srv")),
            PathBuf::from("/srv/data/schemes.json")
        );
        assert!(config.database_path(Path::new("/srv")).is_none());
    }

    #[test]
    fn test_full_config_with_interpolation() {
        let file = write_config(
            r#"
oracle:
  active_model: local
  timeout_secs: 5
  models:
    local:
      display_name: "Local"
      base_url: "${SCHEME_ASSISTANT_TEST_UNSET_URL:-http://localhost:8080/v1}"
agent:
  confidence_threshold: 0.7
  max_listed_schemes: 3
schemes_path: /opt/schemes.json
database_path: state/assistant.db
"#,
        );
        let config = load_config(file.path()).unwrap();
        let oracle = config.oracle.as_ref().unwrap();
        assert_eq!(oracle.timeout_secs, 5);
        assert_eq!(oracle.models["local"].base_url, "http://localhost:8080/v1");
        assert_eq!(config.agent.confidence_threshold, 0.7);
        assert_eq!(config.agent.max_listed_schemes, 3);
        assert_eq!(config.agent.max_steps, 50);
        assert_eq!(
            config.schemes_path(Path::new("/srv")),
            PathBuf::from("/opt/schemes.json")
        );
        assert_eq!(
            config.database_path(Path::new("/srv")),
            Some(PathBuf::from("/srv/state/assistant.db"))
        );
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let file = write_config("agent:\n  confidence_threshold: 1.5\n");
        assert!(matches!(
            load_config(file.path()),
            Err(AgentError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_find_config_walks_upward() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("config")).unwrap();
        std::fs::write(root.path().join(CONFIG_RELATIVE_PATH), "{}").unwrap();
        let nested = root.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(
            find_config_path(&nested),
            Some(root.path().join(CONFIG_RELATIVE_PATH))
        );
    }
}
