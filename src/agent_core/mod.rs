//! Agent Core — the turn pipeline of the scheme assistant.
//!
//! Submodules:
//! - `state`: Conversation state, profile vocabulary, contradiction-aware setter
//! - `normalize`: Numeral/unit canonicalization and closed-vocabulary mapping
//! - `extractor`: Regex field extractor (offline fallback)
//! - `planner`: Intent classification node
//! - `executor`: Quality gate, extraction, tool dispatch, application flow
//! - `evaluator`: Completeness check node
//! - `responder`: Deterministic reply templates
//! - `orchestrator`: Step machine, per-thread locking, failure containment
//! - `conversation`: Snapshot load/merge/save per thread
//! - `database`: SQLite persistence for thread snapshots
//! - `voice`: Transcriber/synthesizer gateway around the pipeline
//! - `services`: Collaborators injected into the nodes
//! - `errors`: Agent-level error types

pub mod conversation;
pub mod database;
pub mod errors;
pub mod evaluator;
pub mod executor;
pub mod extractor;
pub mod normalize;
pub mod orchestrator;
pub mod planner;
pub mod responder;
pub mod services;
pub mod state;
pub(crate) mod text;
pub mod voice;

// Re-exports for convenience
pub use conversation::ConversationStore;
pub use database::AgentDatabase;
pub use errors::AgentError;
pub use orchestrator::{TurnMetadata, TurnOutput, WorkflowOrchestrator};
pub use services::AgentServices;
pub use state::{
    set_field, Category, ContradictionRecord, ConversationState, FieldValue, Gender, Intent,
    MaritalStatus, Profile, ProfileField, Step, TurnError,
};
pub use voice::{Synthesizer, Transcriber, VoiceError, VoiceGateway};
