//! ConversationStore — per-thread state snapshots on top of `AgentDatabase`.
//!
//! Responsibilities:
//! - Load a thread's snapshot merged over a fresh default state, so fields
//!   introduced after the snapshot was written start from their defaults
//! - Persist the whole state at the end of a turn (last writer wins)
//! - Reset a thread back to defaults

use serde_json::Value;

use super::database::AgentDatabase;
use super::errors::AgentError;
use super::state::ConversationState;

// ─── ConversationStore ──────────────────────────────────────────────────────

pub struct ConversationStore {
    db: AgentDatabase,
}

impl ConversationStore {
    pub fn new(db: AgentDatabase) -> Self {
        Self { db }
    }

    /// Load the state for `thread_id`, or defaults for an unknown thread.
    ///
    /// A snapshot that cannot be decoded is logged and replaced by defaults
    /// rather than failing the turn.
    pub fn load(&self, thread_id: &str) -> Result<ConversationState, AgentError> {
        let Some(snapshot) = self.db.load_snapshot(thread_id)? else {
            return Ok(ConversationState::default());
        };

        match decode_snapshot(&snapshot.state) {
            Ok(state) => Ok(state),
            Err(e) => {
                tracing::warn!(
                    thread_id,
                    error = %e,
                    "snapshot could not be decoded, starting from defaults"
                );
                Ok(ConversationState::default())
            }
        }
    }

    /// Whether a snapshot exists for `thread_id`.
    pub fn exists(&self, thread_id: &str) -> Result<bool, AgentError> {
        Ok(self.db.load_snapshot(thread_id)?.is_some())
    }

    /// Persist the full state for `thread_id`.
    pub fn save(&self, thread_id: &str, state: &ConversationState) -> Result<(), AgentError> {
        let json = serde_json::to_string(state)?;
        self.db.save_snapshot(thread_id, &json, state.turn_count)?;
        tracing::debug!(thread_id, turn_count = state.turn_count, "snapshot saved");
        Ok(())
    }

    /// Drop the snapshot; the next load yields defaults.
    pub fn reset(&self, thread_id: &str) -> Result<(), AgentError> {
        let existed = self.db.delete_snapshot(thread_id)?;
        tracing::info!(thread_id, existed, "thread reset");
        Ok(())
    }

    pub fn list_threads(&self) -> Result<Vec<String>, AgentError> {
        self.db.list_threads()
    }
}

/// Overlay a stored snapshot on the default state at the JSON-object level.
/// `null` entries keep the default.
fn decode_snapshot(raw: &str) -> Result<ConversationState, AgentError> {
    let stored: Value = serde_json::from_str(raw)?;
    let Value::Object(stored) = stored else {
        return Err(AgentError::SerializationError {
            reason: "snapshot is not a JSON object".to_string(),
        });
    };

    let mut merged = serde_json::to_value(ConversationState::default())?;
    if let Value::Object(ref mut base) = merged {
        for (key, value) in stored {
            if !value.is_null() {
                base.insert(key, value);
            }
        }
    }
    Ok(serde_json::from_value(merged)?)
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_core::state::{set_field, FieldValue};

    fn store() -> ConversationStore {
        ConversationStore::new(AgentDatabase::open(":memory:").unwrap())
    }

    #[test]
    fn test_unknown_thread_yields_defaults() {
        let store = store();
        assert_eq!(store.load("new").unwrap(), ConversationState::default());
        assert!(!store.exists("new").unwrap());
    }

    #[test]
    fn test_save_load_roundtrip_preserves_state() {
        let store = store();
        let mut state = ConversationState::default();
        state.begin_turn("मेरी उम्र 25 साल है");
        set_field(&mut state, FieldValue::Age(25));
        state.turn_count = 1;

        store.save("t1", &state).unwrap();
        assert_eq!(store.load("t1").unwrap(), state);
    }

    #[test]
    fn test_old_snapshot_merges_over_defaults() {
        let db = AgentDatabase::open(":memory:").unwrap();
        db.save_snapshot(
            "legacy",
            r#"{"profile": {"age": 40}, "turn_count": 7, "confidence": null, "unknown_field": 1}"#,
            7,
        )
        .unwrap();
        let store = ConversationStore::new(db);

        let state = store.load("legacy").unwrap();
        assert_eq!(state.profile.age, Some(40));
        assert_eq!(state.turn_count, 7);
        assert_eq!(state.confidence, 1.0);
        assert!(state.applied_schemes.is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_falls_back_to_defaults() {
        let db = AgentDatabase::open(":memory:").unwrap();
        db.save_snapshot("bad", "[1, 2, 3]", 0).unwrap();
        db.save_snapshot("worse", "{not json", 0).unwrap();
        let store = ConversationStore::new(db);

        assert_eq!(store.load("bad").unwrap(), ConversationState::default());
        assert_eq!(store.load("worse").unwrap(), ConversationState::default());
    }

    #[test]
    fn test_reset_returns_thread_to_defaults() {
        let store = store();
        let state = ConversationState {
            turn_count: 4,
            ..Default::default()
        };
        store.save("t1", &state).unwrap();
        store.reset("t1").unwrap();
        assert_eq!(store.load("t1").unwrap().turn_count, 0);
        assert!(store.list_threads().unwrap().is_empty());
    }
}
