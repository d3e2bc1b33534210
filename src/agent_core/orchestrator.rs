//! Workflow orchestrator — one turn of the dialogue pipeline per call.
//!
//! Pipeline (explicit step enum, matched exhaustively):
//! 1. **Planner** — intent classification; greeting skips to the responder
//! 2. **Executor** — quality gate, extraction, profile update, tools
//! 3. **Evaluator** — completeness check
//! 4. **Responder** — deterministic reply, closes the turn
//!
//! A turn loads the thread's snapshot, runs the pipeline under a hard step
//! ceiling, and persists the whole state. Anything that goes wrong inside the
//! pipeline, a panic included, becomes a fixed apology; the thread keeps its
//! last persisted snapshot.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex as TokioMutex;

use super::conversation::ConversationStore;
use super::database::AgentDatabase;
use super::errors::AgentError;
use super::responder::APOLOGY_MESSAGE;
use super::services::AgentServices;
use super::state::{ConversationState, Intent, Profile, Step};
use super::text::truncate_utf8;
use super::{evaluator, executor, planner, responder};

// ─── Types ──────────────────────────────────────────────────────────────────

/// Per-turn summary returned alongside the reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnMetadata {
    pub intent: Option<Intent>,
    pub eligible_count: usize,
    pub turn_count: u64,
    pub confidence: f64,
    /// Fields set during this turn.
    pub extracted_fields: Map<String, Value>,
    pub contradiction_count: usize,
    /// `already_applied`, `no_scheme_selected`, `tool_failure`, or the
    /// message of a fatal error.
    pub error: Option<String>,
}

/// Result of `process_turn`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutput {
    pub response_text: String,
    pub metadata: TurnMetadata,
    pub profile: Profile,
    /// Full state after the turn; after a fatal error, the last persisted
    /// state if it could be read.
    pub state: Option<ConversationState>,
}

impl TurnOutput {
    fn from_state(state: ConversationState) -> Self {
        let response_text = state
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Self {
            response_text,
            metadata: TurnMetadata {
                intent: state.current_intent,
                eligible_count: state.eligible_schemes.len(),
                turn_count: state.turn_count,
                confidence: state.confidence,
                extracted_fields: state.extracted_info.clone(),
                contradiction_count: state.contradictions.len(),
                error: state.error.as_ref().map(|e| e.code().to_string()),
            },
            profile: state.profile.clone(),
            state: Some(state),
        }
    }

    fn apology(error: &AgentError, persisted: Option<ConversationState>) -> Self {
        let fallback = persisted.clone().unwrap_or_default();
        Self {
            response_text: APOLOGY_MESSAGE.to_string(),
            metadata: TurnMetadata {
                intent: None,
                eligible_count: fallback.eligible_schemes.len(),
                turn_count: fallback.turn_count,
                confidence: 0.0,
                extracted_fields: Map::new(),
                contradiction_count: fallback.contradictions.len(),
                error: Some(error.to_string()),
            },
            profile: fallback.profile,
            state: persisted,
        }
    }
}

// ─── Orchestrator ───────────────────────────────────────────────────────────

pub struct WorkflowOrchestrator {
    services: AgentServices,
    store: Mutex<ConversationStore>,
    /// One async lock per thread id: turns on the same thread run one at a
    /// time, distinct threads run independently.
    thread_locks: Mutex<HashMap<String, Arc<TokioMutex<()>>>>,
}

impl WorkflowOrchestrator {
    pub fn new(services: AgentServices, store: ConversationStore) -> Self {
        Self {
            services,
            store: Mutex::new(store),
            thread_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Orchestrator over an in-memory database.
    pub fn in_memory(services: AgentServices) -> Result<Self, AgentError> {
        let db = AgentDatabase::open(":memory:")?;
        Ok(Self::new(services, ConversationStore::new(db)))
    }

    pub fn services(&self) -> &AgentServices {
        &self.services
    }

    /// Run one turn for `thread_id`. Always produces a reply.
    pub async fn process_turn(&self, thread_id: &str, utterance: &str) -> TurnOutput {
        let lock = self.thread_lock(thread_id);
        let output = {
            let _guard = lock.lock().await;
            self.locked_turn(thread_id, utterance).await
        };
        self.release_thread_lock(thread_id, lock);
        output
    }

    async fn locked_turn(&self, thread_id: &str, utterance: &str) -> TurnOutput {
        let started = Instant::now();
        tracing::info!(
            thread_id,
            utterance = %truncate_utf8(utterance, 120),
            "turn started"
        );

        let outcome = AssertUnwindSafe(self.run_turn(thread_id, utterance))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(AgentError::NodePanicked {
                    reason: panic_reason(panic.as_ref()),
                })
            });

        match outcome {
            Ok(state) => {
                tracing::info!(
                    thread_id,
                    turn_count = state.turn_count,
                    intent = state.current_intent.map(|i| i.as_str()),
                    error = state.error.as_ref().map(|e| e.code()),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "turn completed"
                );
                TurnOutput::from_state(state)
            }
            Err(e) => {
                tracing::error!(
                    thread_id,
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "turn failed, replying with apology"
                );
                let persisted = self.get_state(thread_id).ok().flatten();
                TurnOutput::apology(&e, persisted)
            }
        }
    }

    /// Reinitialize a thread to defaults.
    pub async fn reset(&self, thread_id: &str) -> Result<(), AgentError> {
        let lock = self.thread_lock(thread_id);
        let result = {
            let _guard = lock.lock().await;
            self.with_store(|store| store.reset(thread_id))
        };
        self.release_thread_lock(thread_id, lock);
        result
    }

    /// The persisted state of a thread, `None` if it has never completed a
    /// turn.
    pub fn get_state(&self, thread_id: &str) -> Result<Option<ConversationState>, AgentError> {
        self.with_store(|store| {
            if store.exists(thread_id)? {
                store.load(thread_id).map(Some)
            } else {
                Ok(None)
            }
        })
    }

    pub fn list_threads(&self) -> Result<Vec<String>, AgentError> {
        self.with_store(|store| store.list_threads())
    }

    // ─── Internals ──────────────────────────────────────────────────────

    async fn run_turn(&self, thread_id: &str, utterance: &str) -> Result<ConversationState, AgentError> {
        let mut state = self.with_store(|store| store.load(thread_id))?;
        state.begin_turn(utterance);

        self.run_pipeline(&mut state).await?;

        self.with_store(|store| store.save(thread_id, &state))?;
        Ok(state)
    }

    /// Drive the step machine until `Terminated` or the step ceiling.
    async fn run_pipeline(&self, state: &mut ConversationState) -> Result<(), AgentError> {
        let max_steps = self.services.settings.max_steps;

        for _ in 0..max_steps {
            let next = match state.next_step {
                Step::Planner => planner::run(state, &self.services).await,
                Step::Executor => executor::run(state, &self.services).await,
                Step::Evaluator => evaluator::run(state),
                Step::Responder => responder::run(state, &self.services),
                Step::Terminated => return Ok(()),
            };
            state.next_step = next;
        }

        if state.next_step == Step::Terminated {
            return Ok(());
        }
        Err(AgentError::StepLimitExceeded {
            steps: max_steps,
            last_step: format!("{:?}", state.next_step),
        })
    }

    fn thread_lock(&self, thread_id: &str) -> Arc<TokioMutex<()>> {
        let mut locks = self
            .thread_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(
            locks
                .entry(thread_id.to_string())
                .or_insert_with(|| Arc::new(TokioMutex::new(()))),
        )
    }

    /// Drop the map entry once no other turn holds or awaits the lock.
    /// Clones are only taken under the map mutex, so a count of one there
    /// means nobody else can be using it.
    fn release_thread_lock(&self, thread_id: &str, lock: Arc<TokioMutex<()>>) {
        drop(lock);
        let mut locks = self
            .thread_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if locks
            .get(thread_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(thread_id);
        }
    }

    fn with_store<T>(
        &self,
        f: impl FnOnce(&ConversationStore) -> Result<T, AgentError>,
    ) -> Result<T, AgentError> {
        let store = self.store.lock().map_err(|e| AgentError::LockPoisoned {
            reason: e.to_string(),
        })?;
        f(&store)
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
