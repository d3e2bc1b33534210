//! Planner node — intent classification.
//!
//! The oracle picks one intent from a closed set. A reply that cannot be
//! decoded, or names an intent outside the set, defaults to `find_schemes`.
//! When the oracle cannot be reached at all, a keyword heuristic stands in
//! so an offline deployment can still reach the application flow.

use serde::Deserialize;

use super::extractor::extract_fields;
use super::normalize::canonicalize;
use super::services::AgentServices;
use super::state::{ConversationState, Intent, Step};
use super::text::{truncate_utf8, words};
use crate::inference::{OracleAdapter, PromptKind};

/// Confidence assigned to the default intent after a rejected reply.
const DEFAULT_INTENT_CONFIDENCE: f64 = 0.0;

/// Confidence assigned to keyword-derived intents and to oracle replies that
/// omit a confidence.
const HEURISTIC_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Deserialize)]
struct IntentPayload {
    intent: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    alternatives: Vec<String>,
}

/// Where an intent decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentSource {
    Oracle,
    /// Reply was unparseable or out of the enumeration.
    Default,
    /// Oracle unavailable.
    Keywords,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentDecision {
    pub intent: Intent,
    pub confidence: f64,
    pub source: IntentSource,
}

/// Classify `utterance`.
pub async fn classify_intent(oracle: &OracleAdapter, utterance: &str) -> IntentDecision {
    match oracle
        .request::<IntentPayload>(PromptKind::IntentClassification, utterance)
        .await
    {
        Ok(payload) => match Intent::parse(&payload.intent) {
            Some(intent) => {
                tracing::debug!(
                    intent = intent.as_str(),
                    reasoning = payload.reasoning.as_deref().unwrap_or(""),
                    alternatives = ?payload.alternatives,
                    "oracle intent accepted"
                );
                IntentDecision {
                    intent,
                    confidence: payload
                        .confidence
                        .filter(|c| c.is_finite())
                        .map_or(HEURISTIC_CONFIDENCE, |c| c.clamp(0.0, 1.0)),
                    source: IntentSource::Oracle,
                }
            }
            None => {
                tracing::warn!(
                    intent = %truncate_utf8(&payload.intent, 40),
                    "intent outside enumeration, defaulting to find_schemes"
                );
                default_decision()
            }
        },
        Err(e) if e.is_unavailable() => {
            let intent = keyword_intent(utterance);
            tracing::warn!(
                error = %e,
                intent = intent.as_str(),
                "oracle unavailable, intent from keywords"
            );
            IntentDecision {
                intent,
                confidence: HEURISTIC_CONFIDENCE,
                source: IntentSource::Keywords,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "intent reply rejected, defaulting to find_schemes");
            default_decision()
        }
    }
}

fn default_decision() -> IntentDecision {
    IntentDecision {
        intent: Intent::FindSchemes,
        confidence: DEFAULT_INTENT_CONFIDENCE,
        source: IntentSource::Default,
    }
}

const APPLY_WORDS: &[&str] = &["आवेदन", "अप्लाई", "apply", "पंजीकरण", "रजिस्टर", "register"];
const GREETING_WORDS: &[&str] = &["नमस्ते", "नमस्कार", "प्रणाम", "हेलो", "hello", "hi", "namaste"];
const DETAIL_WORDS: &[&str] = &["विवरण", "details", "detail", "बारे"];

/// Deterministic intent from keywords and extractable fields.
pub fn keyword_intent(utterance: &str) -> Intent {
    let text = canonicalize(utterance).to_lowercase();
    let tokens = words(&text);
    let has = |vocab: &[&str]| tokens.iter().any(|t| vocab.contains(t));
    let has_fields = !extract_fields(utterance).is_empty();

    if has(APPLY_WORDS) {
        Intent::ApplyScheme
    } else if has(GREETING_WORDS) && !has_fields {
        Intent::Greeting
    } else if has(DETAIL_WORDS) {
        Intent::GetDetails
    } else if has_fields {
        Intent::ProvideInfo
    } else {
        Intent::FindSchemes
    }
}

/// Planner node: set `current_intent` and pick the next step.
///
/// Only `greeting` skips straight to the responder; everything else goes
/// through the executor so extraction always runs.
pub async fn run(state: &mut ConversationState, services: &AgentServices) -> Step {
    let decision = classify_intent(&services.oracle, &state.user_input).await;
    state.current_intent = Some(decision.intent);
    state.confidence = decision.confidence;

    tracing::info!(
        intent = decision.intent.as_str(),
        confidence = decision.confidence,
        source = ?decision.source,
        "planner: intent classified"
    );

    match decision.intent {
        Intent::Greeting => Step::Responder,
        _ => Step::Executor,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::oracle::testing::ScriptedOracle;
    use std::sync::Arc;
    use std::time::Duration;

    fn adapter(oracle: ScriptedOracle) -> OracleAdapter {
        OracleAdapter::new(Arc::new(oracle), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_valid_intent_accepted() {
        let oracle = adapter(ScriptedOracle::new().intent(
            r#"{"intent": "apply_scheme", "confidence": 0.9, "reasoning": "x", "alternatives": []}"#,
        ));
        let decision = classify_intent(&oracle, "मुझे आवेदन करना है").await;
        assert_eq!(decision.intent, Intent::ApplyScheme);
        assert_eq!(decision.source, IntentSource::Oracle);
        assert!((decision.confidence - 0.9).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_out_of_enum_defaults_to_find_schemes() {
        let oracle = adapter(ScriptedOracle::new().intent(r#"{"intent": "book_flight"}"#));
        let decision = classify_intent(&oracle, "मुझे आवेदन करना है").await;
        assert_eq!(decision.intent, Intent::FindSchemes);
        assert_eq!(decision.source, IntentSource::Default);
    }

    #[tokio::test]
    async fn test_garbage_reply_defaults_even_with_apply_keywords() {
        let oracle = adapter(ScriptedOracle::new().intent("I think they want to apply"));
        let decision = classify_intent(&oracle, "मुझे आवेदन करना है").await;
        assert_eq!(decision.intent, Intent::FindSchemes);
        assert_eq!(decision.source, IntentSource::Default);
    }

    #[tokio::test]
    async fn test_unavailable_oracle_uses_keywords() {
        let decision = classify_intent(&OracleAdapter::offline(), "मैं आवेदन करना चाहता हूँ").await;
        assert_eq!(decision.intent, Intent::ApplyScheme);
        assert_eq!(decision.source, IntentSource::Keywords);
    }

    #[test]
    fn test_keyword_intents() {
        assert_eq!(keyword_intent("नमस्ते जी"), Intent::Greeting);
        assert_eq!(keyword_intent("नमस्ते, मेरी उम्र 25 साल है"), Intent::ProvideInfo);
        assert_eq!(keyword_intent("पीएम-किसान के बारे में बताइए"), Intent::GetDetails);
        assert_eq!(keyword_intent("मैं पुरुष हूँ"), Intent::ProvideInfo);
        assert_eq!(keyword_intent("मुझे योजनाएं दिखाइए"), Intent::FindSchemes);
    }

    #[tokio::test]
    async fn test_greeting_routes_to_responder() {
        let services = AgentServices::offline();
        let mut state = ConversationState::default();
        state.begin_turn("नमस्ते जी");
        assert_eq!(run(&mut state, &services).await, Step::Responder);
        assert_eq!(state.current_intent, Some(Intent::Greeting));

        state.begin_turn("मेरी उम्र 25 साल है");
        assert_eq!(run(&mut state, &services).await, Step::Executor);
        assert_eq!(state.current_intent, Some(Intent::ProvideInfo));
    }
}
