//! Responder node — deterministic, template-driven reply.
//!
//! Nothing here is generated: every sentence comes from a fixed template
//! filled with values already in the state, so the assistant never claims
//! anything the state does not hold.
//!
//! Priority (first match wins):
//! 1. already applied
//! 2. no scheme selected
//! 3. tool failure
//! 4. application submitted
//! 5. clarification request
//! 6. greeting
//! 7. eligible scheme listing
//! 8. missing profile fields
//! 9. generic request for information

use super::services::AgentServices;
use super::state::{ConversationState, Intent, Message, Step, TurnError};
use super::text::truncate_utf8;
use crate::inference::Role;

pub const APOLOGY_MESSAGE: &str = "क्षमा करें, कोई त्रुटि हुई। कृपया पुनः प्रयास करें।";

const FALLBACK_MESSAGE: &str = "कृपया अपनी जानकारी साझा करें ताकि मैं आपकी सहायता कर सकूँ।";

const WELCOME_MESSAGE: &str = "नमस्ते! मैं आपकी सरकारी योजनाओं में मदद के लिए यहाँ हूँ। \
कृपया अपनी उम्र, आय और लिंग बताइए ताकि मैं आपके लिए योजनाएँ खोज सकूँ।";

const CLARIFICATION_MESSAGE: &str = "मुझे साफ़ समझ नहीं आया। कृपया पूरा वाक्य बोलें।\n\n\
उदाहरण: 'मेरी उम्र 25 साल है'";

const NO_SCHEME_MESSAGE: &str = "कृपया बताइए कि आप किस योजना के लिए आवेदन करना चाहते हैं। \
पात्र योजनाएँ जानने के लिए पहले अपनी उम्र, आय और लिंग बताइए।";

const TOOL_FAILURE_MESSAGE: &str = "क्षमा करें, आपका अनुरोध अभी पूरा नहीं हो सका। \
कृपया थोड़ी देर बाद पुनः प्रयास करें।";

const APPLY_PROMPT: &str = "क्या आप किसी योजना के लिए आवेदन करना चाहते हैं?";

/// Build the reply for the current state.
pub fn compose_response(state: &ConversationState, services: &AgentServices) -> String {
    match &state.error {
        Some(TurnError::AlreadyApplied {
            scheme_id,
            application_id,
        }) => {
            let mut text = format!(
                "आपने {} के लिए पहले ही आवेदन कर दिया है।",
                scheme_name(services, scheme_id)
            );
            if let Some(id) = application_id {
                text.push_str(&format!(" आवेदन संख्या: {id}"));
            }
            return text;
        }
        Some(TurnError::NoSchemeSelected) => return NO_SCHEME_MESSAGE.to_string(),
        Some(TurnError::ToolFailure { .. }) => return TOOL_FAILURE_MESSAGE.to_string(),
        None => {}
    }

    if let Some(record) = &state.application_result {
        return format!(
            "आपका आवेदन सफलतापूर्वक जमा हो गया है।\n\
             योजना: {}\n\
             आवेदन संख्या: {}\n\
             स्थिति: {}\n\
             अनुमानित प्रक्रिया समय: {} दिन",
            scheme_name(services, &record.scheme_id),
            record.application_id,
            record.status,
            record.estimated_processing_days
        );
    }

    if state.needs_clarification {
        return CLARIFICATION_MESSAGE.to_string();
    }

    // Listings persist across turns; a greeting is answered on its own.
    if state.current_intent == Some(Intent::Greeting) {
        return WELCOME_MESSAGE.to_string();
    }

    if !state.eligible_schemes.is_empty() {
        return list_schemes(state, services.settings.max_listed_schemes);
    }

    if !state.missing_information.is_empty() {
        let labels: Vec<&str> = state
            .missing_information
            .iter()
            .map(|f| f.display_name())
            .collect();
        return format!("कृपया निम्न जानकारी प्रदान करें: {}", labels.join(", "));
    }

    FALLBACK_MESSAGE.to_string()
}

fn list_schemes(state: &ConversationState, limit: usize) -> String {
    let mut text = format!(
        "आप निम्नलिखित {} सरकारी योजना के लिए पात्र हैं:\n\n",
        state.eligible_schemes.len()
    );
    for (i, scheme) in state.eligible_schemes.iter().take(limit).enumerate() {
        text.push_str(&format!(
            "{}. {}\n   विवरण: {}\n   लाभ: {}\n\n",
            i + 1,
            scheme.name,
            scheme.description,
            scheme.benefits.as_deref().unwrap_or("उपलब्ध")
        ));
    }
    text.push_str(APPLY_PROMPT);
    text
}

fn scheme_name<'a>(services: &'a AgentServices, scheme_id: &'a str) -> &'a str {
    services
        .dataset
        .get(scheme_id)
        .map_or(scheme_id, |s| s.display_name())
}

/// Responder node: append the reply and close the turn.
pub fn run(state: &mut ConversationState, services: &AgentServices) -> Step {
    let response = compose_response(state, services);
    state.messages.push(Message {
        role: Role::Assistant,
        content: response.clone(),
    });
    state.turn_count += 1;
    state.should_continue = false;

    tracing::info!(
        turn_count = state.turn_count,
        response = %truncate_utf8(&response, 120),
        "responder: reply ready"
    );
    Step::Terminated
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_core::state::{Profile, ProfileField};
    use crate::schemes::{ApplicationRecord, SchemeMatch};

    fn scheme_match(i: usize) -> SchemeMatch {
        SchemeMatch {
            scheme_id: format!("S{i}"),
            name: format!("योजना {i}"),
            description: format!("विवरण {i}"),
            benefits: None,
            eligible: true,
            reasons: vec![],
        }
    }

    fn record() -> ApplicationRecord {
        ApplicationRecord {
            application_id: "APP_20250101120000_abcd1234".to_string(),
            scheme_id: "PM_KISAN".to_string(),
            profile: Profile::default(),
            status: "submitted".to_string(),
            timestamp: "2025-01-01T12:00:00Z".to_string(),
            estimated_processing_days: 15,
        }
    }

    #[test]
    fn test_missing_fields_requested_by_display_name() {
        let state = ConversationState {
            missing_information: vec![ProfileField::Income, ProfileField::Gender],
            ..Default::default()
        };
        assert_eq!(
            compose_response(&state, &AgentServices::offline()),
            "कृपया निम्न जानकारी प्रदान करें: आय, लिंग"
        );
    }

    #[test]
    fn test_listing_caps_at_limit_and_prompts_to_apply() {
        let state = ConversationState {
            eligible_schemes: (1..=7).map(scheme_match).collect(),
            missing_information: vec![ProfileField::Age],
            ..Default::default()
        };
        let text = compose_response(&state, &AgentServices::offline());
        assert!(text.starts_with("आप निम्नलिखित 7 सरकारी योजना के लिए पात्र हैं"));
        assert!(text.contains("5. योजना 5"));
        assert!(!text.contains("6. योजना 6"));
        assert!(text.contains("लाभ: उपलब्ध"));
        assert!(text.ends_with(APPLY_PROMPT));
    }

    #[test]
    fn test_priority_error_over_result_over_listing() {
        let services = AgentServices::offline();
        let mut state = ConversationState {
            eligible_schemes: vec![scheme_match(1)],
            application_result: Some(record()),
            ..Default::default()
        };

        let success = compose_response(&state, &services);
        assert!(success.contains("APP_20250101120000_abcd1234"));
        assert!(success.contains("submitted"));
        assert!(success.contains("15 दिन"));
        assert!(success.contains("पीएम-किसान"));

        state.error = Some(TurnError::AlreadyApplied {
            scheme_id: "PM_KISAN".to_string(),
            application_id: Some("APP_1".to_string()),
        });
        let duplicate = compose_response(&state, &services);
        assert!(duplicate.contains("पहले ही आवेदन"));
        assert!(duplicate.contains("APP_1"));
    }

    #[test]
    fn test_clarification_beats_listing() {
        let state = ConversationState {
            needs_clarification: true,
            eligible_schemes: vec![scheme_match(1)],
            ..Default::default()
        };
        assert_eq!(
            compose_response(&state, &AgentServices::offline()),
            CLARIFICATION_MESSAGE
        );
    }

    #[test]
    fn test_greeting_and_fallback() {
        let services = AgentServices::offline();
        let mut state = ConversationState::default();
        assert_eq!(compose_response(&state, &services), FALLBACK_MESSAGE);
        state.current_intent = Some(Intent::Greeting);
        assert_eq!(compose_response(&state, &services), WELCOME_MESSAGE);
    }

    #[test]
    fn test_greeting_not_answered_with_earlier_listing() {
        let state = ConversationState {
            current_intent: Some(Intent::Greeting),
            eligible_schemes: vec![scheme_match(1)],
            ..Default::default()
        };
        assert_eq!(
            compose_response(&state, &AgentServices::offline()),
            WELCOME_MESSAGE
        );
    }

    #[test]
    fn test_run_closes_turn() {
        let mut state = ConversationState::default();
        state.begin_turn("कुछ भी बताइए");
        assert_eq!(run(&mut state, &AgentServices::offline()), Step::Terminated);
        assert_eq!(state.turn_count, 1);
        assert!(!state.should_continue);
        assert_eq!(state.messages.last().unwrap().role, Role::Assistant);
    }
}
