//! Executor node — input gate, field extraction, profile update, tools.
//!
//! Order within one pass:
//! 1. Quality gate: too short, single word, or only filler → clarification
//! 2. Extraction: oracle payload if it parses and clears the confidence
//!    threshold, otherwise the regex extractor alone
//! 3. Profile update through the contradiction-aware setter
//! 4. Tool dispatch by intent (eligibility / application)
//!
//! Tool failures are written to `state.error`; the executor always hands
//! over to the evaluator.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::errors::AgentError;
use super::extractor::extract_fields;
use super::normalize::normalize_field;
use super::services::AgentServices;
use super::state::{set_field, ConversationState, FieldValue, Intent, Step, TurnError};
use super::text::{truncate_utf8, words};
use crate::inference::PromptKind;
use crate::schemes::{check_eligibility, SubmitOutcome};
use crate::settings::AgentSettings;

// ─── Quality Gate ───────────────────────────────────────────────────────────

/// Why an utterance was not worth extracting from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRejection {
    TooShort,
    SingleWord,
    FillerOnly,
}

/// Check an utterance against the input-quality rules.
pub fn assess_input(utterance: &str, settings: &AgentSettings) -> Result<(), InputRejection> {
    let trimmed = utterance.trim();
    if trimmed.chars().count() < settings.min_utterance_chars {
        return Err(InputRejection::TooShort);
    }

    let tokens = words(trimmed);
    if tokens.len() <= 1 {
        return Err(InputRejection::SingleWord);
    }

    let is_filler = |w: &&str| {
        settings
            .filler_words
            .iter()
            .any(|f| f.eq_ignore_ascii_case(w))
    };
    if tokens.len() <= 3 && tokens.iter().all(is_filler) {
        return Err(InputRejection::FillerOnly);
    }

    Ok(())
}

// ─── Extraction ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ExtractionPayload {
    #[serde(default)]
    confidence: f64,
    /// Keys the oracle claims the user actually stated.
    #[serde(default)]
    extracted_fields: Vec<String>,
    #[serde(flatten)]
    values: Map<String, Value>,
}

/// Which extractor produced a turn's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    Oracle,
    Regex,
}

/// Extract fields from `utterance`, preferring a confident oracle payload.
///
/// Only keys listed in the payload's `extracted_fields` are read, so values
/// the oracle filled in without being told are ignored.
pub async fn extract(services: &AgentServices, utterance: &str) -> (Vec<FieldValue>, ExtractionSource) {
    let threshold = services.settings.confidence_threshold;

    let payload = match services
        .oracle
        .request::<ExtractionPayload>(PromptKind::InformationExtraction, utterance)
        .await
    {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "oracle extraction failed, using regex extractor");
            return (extract_fields(utterance), ExtractionSource::Regex);
        }
    };

    // NaN fails this comparison too
    if !(payload.confidence >= threshold) {
        tracing::warn!(
            confidence = payload.confidence,
            threshold,
            "oracle extraction below threshold, using regex extractor"
        );
        return (extract_fields(utterance), ExtractionSource::Regex);
    }

    let mut fields: Vec<FieldValue> = Vec::new();
    for key in &payload.extracted_fields {
        let Some(raw) = payload.values.get(key) else {
            continue;
        };
        match normalize_field(key, raw) {
            Some(value) if !fields.iter().any(|f| f.field() == value.field()) => fields.push(value),
            Some(_) => {}
            None => tracing::debug!(key = %key, value = %raw, "oracle field discarded by normalization"),
        }
    }

    (fields, ExtractionSource::Oracle)
}

// ─── Node ───────────────────────────────────────────────────────────────────

/// Executor node.
pub async fn run(state: &mut ConversationState, services: &AgentServices) -> Step {
    if let Err(rejection) = assess_input(&state.user_input, &services.settings) {
        tracing::info!(
            ?rejection,
            utterance = %truncate_utf8(&state.user_input, 60),
            "executor: low-quality input, asking for clarification"
        );
        state.needs_clarification = true;
        return Step::Evaluator;
    }

    let (fields, source) = extract(services, &state.user_input).await;
    let mut contradictions = 0;
    for value in fields {
        if set_field(state, value) {
            contradictions += 1;
        }
    }

    tracing::info!(
        source = ?source,
        fields = state.extracted_info.len(),
        contradictions,
        "executor: profile updated"
    );

    if let Err(e) = dispatch_tools(state, services) {
        tracing::error!(error = %e, "executor: tool failed");
        state.error = Some(TurnError::ToolFailure {
            reason: e.to_string(),
        });
    }

    Step::Evaluator
}

fn dispatch_tools(state: &mut ConversationState, services: &AgentServices) -> Result<(), AgentError> {
    match state.current_intent {
        Some(Intent::FindSchemes | Intent::ProvideInfo) if state.profile.is_complete() => {
            refresh_eligibility(state, services);
            Ok(())
        }
        Some(Intent::ApplyScheme) => apply_for_scheme(state, services),
        _ => Ok(()),
    }
}

fn refresh_eligibility(state: &mut ConversationState, services: &AgentServices) {
    let report = check_eligibility(&state.profile, &services.dataset);
    state.eligible_schemes = report.eligible;
}

// ─── Application Flow ───────────────────────────────────────────────────────

/// Resolve the target scheme, guard against duplicates, and submit.
fn apply_for_scheme(state: &mut ConversationState, services: &AgentServices) -> Result<(), AgentError> {
    // The listing may predate a profile change made in this same turn.
    if state.selected_scheme_id.is_none() && state.profile.is_complete() {
        refresh_eligibility(state, services);
    }

    let Some(scheme_id) = resolve_scheme(state, services) else {
        tracing::info!("application: no scheme could be selected");
        state.error = Some(TurnError::NoSchemeSelected);
        return Ok(());
    };

    if state.has_applied(&scheme_id) {
        let existing = services
            .registrar
            .list_applications()?
            .into_iter()
            .find(|r| r.scheme_id == scheme_id)
            .map(|r| r.application_id);
        tracing::info!(scheme_id = %scheme_id, "application: thread already applied");
        state.error = Some(TurnError::AlreadyApplied {
            scheme_id,
            application_id: existing,
        });
        return Ok(());
    }

    match services.registrar.submit(&scheme_id, &state.profile)? {
        SubmitOutcome::Submitted(record) => {
            state.mark_applied(&scheme_id);
            state.application_result = Some(record);
        }
        SubmitOutcome::AlreadyApplied { application_id } => {
            state.mark_applied(&scheme_id);
            state.error = Some(TurnError::AlreadyApplied {
                scheme_id,
                application_id: Some(application_id),
            });
        }
    }
    Ok(())
}

/// Locked scheme first; else an eligible scheme named in the utterance;
/// else the first eligible scheme. A newly chosen scheme is locked.
fn resolve_scheme(state: &mut ConversationState, services: &AgentServices) -> Option<String> {
    if let Some(locked) = &state.selected_scheme_id {
        return Some(locked.clone());
    }

    let named = state.eligible_schemes.iter().find(|m| {
        services
            .dataset
            .get(&m.scheme_id)
            .is_some_and(|s| s.is_named_in(&state.user_input))
    });
    let chosen = named.or(state.eligible_schemes.first())?.scheme_id.clone();

    tracing::info!(scheme_id = %chosen, "application: scheme locked");
    state.selected_scheme_id = Some(chosen.clone());
    Some(chosen)
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_core::state::Gender;
    use crate::inference::oracle::testing::{ScriptedOracle, StalledOracle};
    use crate::inference::OracleAdapter;
    use crate::schemes::{ApplicationRegistrar, SchemeDataset};
    use std::sync::Arc;
    use std::time::Duration;

    fn services_with(oracle: ScriptedOracle) -> AgentServices {
        AgentServices::new(
            OracleAdapter::new(Arc::new(oracle), Duration::from_secs(1)),
            SchemeDataset::built_in(),
            Arc::new(ApplicationRegistrar::default()),
            AgentSettings::default(),
        )
    }

    fn farmer_state(intent: Intent, utterance: &str) -> ConversationState {
        let mut state = ConversationState::default();
        state.begin_turn(utterance);
        state.current_intent = Some(intent);
        for value in [
            FieldValue::Age(30),
            FieldValue::Income(100_000.0),
            FieldValue::Gender(Gender::Male),
            FieldValue::Occupation("farmer".to_string()),
        ] {
            set_field(&mut state, value);
        }
        state.extracted_info.clear();
        state
    }

    #[test]
    fn test_quality_gate() {
        let settings = AgentSettings::default();
        assert_eq!(assess_input("हां", &settings), Err(InputRejection::TooShort));
        assert_eq!(assess_input("योजनाएँबताइए", &settings), Err(InputRejection::SingleWord));
        assert_eq!(assess_input("अच्छा ठीक", &settings), Err(InputRejection::FillerOnly));
        assert_eq!(assess_input("हां मेरी उम्र 25 है", &settings), Ok(()));
        assert_eq!(assess_input("मैं पुरुष हूँ", &settings), Ok(()));
        assert_eq!(assess_input("पुरुष हूँ", &settings), Ok(()));
    }

    #[tokio::test]
    async fn test_low_quality_input_skips_extraction() {
        let services = services_with(ScriptedOracle::new());
        let mut state = ConversationState::default();
        state.begin_turn("  25 ");
        state.current_intent = Some(Intent::ProvideInfo);

        assert_eq!(run(&mut state, &services).await, Step::Evaluator);
        assert!(state.needs_clarification);
        assert!(state.profile.age.is_none());
    }

    #[tokio::test]
    async fn test_confident_oracle_takes_only_declared_fields() {
        let oracle = ScriptedOracle::new().extraction(
            r#"{"confidence": 0.9, "extracted_fields": ["age", "annual_income"],
                "age": 25, "annual_income": "1.5 लाख", "gender": "female"}"#,
        );
        let services = services_with(oracle);
        let (fields, source) = extract(&services, "मेरी उम्र 25 और आय डेढ़ लाख").await;

        assert_eq!(source, ExtractionSource::Oracle);
        assert_eq!(fields, vec![FieldValue::Age(25), FieldValue::Income(150_000.0)]);
    }

    #[tokio::test]
    async fn test_low_confidence_equals_regex_output() {
        let utterance = "मेरी उम्र 25 साल है और मैं पुरुष हूँ";
        let oracle = ScriptedOracle::new().extraction(
            r#"{"confidence": 0.3, "extracted_fields": ["age", "category", "occupation"],
                "age": 99, "category": "SC", "occupation": "teacher"}"#,
        );
        let services = services_with(oracle);
        let (fields, source) = extract(&services, utterance).await;

        assert_eq!(source, ExtractionSource::Regex);
        assert_eq!(fields, extract_fields(utterance));
    }

    #[tokio::test]
    async fn test_unparseable_payload_falls_back_to_regex() {
        let services = services_with(
            ScriptedOracle::new().extraction(r#"{"confidence": 0.9} {"age": 40}"#),
        );
        let (fields, source) = extract(&services, "मेरी उम्र 25 साल है").await;
        assert_eq!(source, ExtractionSource::Regex);
        assert_eq!(fields, vec![FieldValue::Age(25)]);
    }

    #[tokio::test]
    async fn test_stalled_oracle_degrades_to_regex() {
        let utterance = "मेरी उम्र 25 साल है और मैं पुरुष हूँ";
        let services = AgentServices::new(
            OracleAdapter::new(Arc::new(StalledOracle), Duration::from_millis(20)),
            SchemeDataset::built_in(),
            Arc::new(ApplicationRegistrar::default()),
            AgentSettings::default(),
        );
        let (fields, source) = extract(&services, utterance).await;

        assert_eq!(source, ExtractionSource::Regex);
        assert_eq!(fields, extract_fields(utterance));
    }

    #[tokio::test]
    async fn test_complete_profile_runs_eligibility() {
        let services = services_with(ScriptedOracle::new());
        let mut state = farmer_state(Intent::ProvideInfo, "मैं खेती करता हूँ");
        run(&mut state, &services).await;
        assert_eq!(state.eligible_schemes.len(), 1);
        assert_eq!(state.eligible_schemes[0].scheme_id, "PM_KISAN");
    }

    #[tokio::test]
    async fn test_apply_locks_first_eligible_and_blocks_repeat() {
        let services = services_with(ScriptedOracle::new());
        let mut state = farmer_state(Intent::ApplyScheme, "मैं आवेदन करना चाहता हूँ");

        run(&mut state, &services).await;
        let record = state.application_result.clone().unwrap();
        assert_eq!(record.scheme_id, "PM_KISAN");
        assert_eq!(record.status, "submitted");
        assert_eq!(state.selected_scheme_id.as_deref(), Some("PM_KISAN"));
        assert_eq!(state.applied_schemes, vec!["PM_KISAN".to_string()]);

        state.begin_turn("मैं आवेदन करना चाहता हूँ");
        state.current_intent = Some(Intent::ApplyScheme);
        run(&mut state, &services).await;
        assert!(state.application_result.is_none());
        assert_eq!(
            state.error,
            Some(TurnError::AlreadyApplied {
                scheme_id: "PM_KISAN".to_string(),
                application_id: Some(record.application_id),
            })
        );
        assert_eq!(services.registrar.list_applications().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_apply_rechecks_eligibility_after_profile_change() {
        let services = services_with(ScriptedOracle::new());
        let mut state = farmer_state(Intent::ProvideInfo, "मैं खेती करता हूँ");
        run(&mut state, &services).await;
        assert_eq!(state.eligible_schemes.len(), 1);

        state.begin_turn("मेरी आय 50 लाख है, मैं आवेदन करना चाहता हूँ");
        state.current_intent = Some(Intent::ApplyScheme);
        run(&mut state, &services).await;

        assert_eq!(state.profile.income, Some(5_000_000.0));
        assert!(state.eligible_schemes.is_empty());
        assert_eq!(state.error, Some(TurnError::NoSchemeSelected));
        assert!(state.application_result.is_none());
        assert!(services.registrar.list_applications().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_registry_blocks_other_threads() {
        let services = services_with(ScriptedOracle::new());
        let mut first = farmer_state(Intent::ApplyScheme, "मैं आवेदन करना चाहता हूँ");
        let mut second = farmer_state(Intent::ApplyScheme, "मैं आवेदन करना चाहता हूँ");

        run(&mut first, &services).await;
        run(&mut second, &services).await;

        assert!(first.application_result.is_some());
        assert!(matches!(second.error, Some(TurnError::AlreadyApplied { .. })));
        assert_eq!(second.applied_schemes, vec!["PM_KISAN".to_string()]);
    }

    #[tokio::test]
    async fn test_apply_without_eligible_scheme() {
        let services = services_with(ScriptedOracle::new());
        let mut state = ConversationState::default();
        state.begin_turn("मैं आवेदन करना चाहता हूँ");
        state.current_intent = Some(Intent::ApplyScheme);

        run(&mut state, &services).await;
        assert_eq!(state.error, Some(TurnError::NoSchemeSelected));
        assert!(state.selected_scheme_id.is_none());
    }

    #[tokio::test]
    async fn test_named_scheme_preferred_over_first_eligible() {
        let dataset = SchemeDataset::new(
            serde_json::from_str(
                r#"[{"id": "FIRST", "name_hindi": "पहली योजना"},
                    {"id": "SECOND", "name_hindi": "दूसरी योजना"}]"#,
            )
            .unwrap(),
        );
        let mut services = services_with(ScriptedOracle::new());
        services.dataset = dataset;

        let mut state = farmer_state(Intent::ApplyScheme, "दूसरी योजना में आवेदन करना है");
        run(&mut state, &services).await;
        assert_eq!(state.selected_scheme_id.as_deref(), Some("SECOND"));
        assert_eq!(state.application_result.unwrap().scheme_id, "SECOND");
    }
}
