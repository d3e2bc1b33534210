//! Inference — the language-oracle side of the assistant.
//!
//! This module handles all communication with the text-completion oracle:
//! - OpenAI-compatible non-streaming chat completions with a fallback chain
//! - Prompt templates for intent classification and field extraction
//! - Balanced-JSON payload extraction and validation
//! - A hard per-call timeout via `OracleAdapter`
//!
//! The oracle is untrusted: every reply is validated before any field it
//! reports reaches the conversation state.

pub mod client;
pub mod config;
pub mod errors;
pub mod json_payload;
pub mod oracle;
pub mod prompts;
pub mod types;

// Re-exports for convenience
pub use client::InferenceClient;
pub use config::{ModelConfig, OracleConfig};
pub use errors::InferenceError;
pub use oracle::{LanguageOracle, OfflineOracle, OracleAdapter};
pub use prompts::PromptKind;
pub use types::{ChatMessage, Role};
