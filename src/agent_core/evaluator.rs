//! Evaluator node — completeness check.
//!
//! Always hands over to the responder; there is no edge back to the planner.

use super::state::{ConversationState, Step};

pub fn run(state: &mut ConversationState) -> Step {
    // A terminal tool outcome is answered as-is.
    if state.application_result.is_some() || state.error.is_some() {
        tracing::info!(
            error = state.error.as_ref().map(|e| e.code()),
            applied = state.application_result.is_some(),
            "evaluator: terminal outcome, skipping completeness check"
        );
        return Step::Responder;
    }

    state.missing_information = state.profile.missing_required();
    tracing::info!(missing = ?state.missing_information, "evaluator: profile checked");
    Step::Responder
}

// ─── Tests ──────────────────────────────────────────────────────────────────
