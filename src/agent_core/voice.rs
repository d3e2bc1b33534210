//! Voice gateway — audio in, spoken reply out, around the text pipeline.
//!
//! Transcription and speech synthesis are external collaborators. A blank
//! transcript never becomes a turn, and speech runs on its own task so a
//! slow or failing synthesizer cannot delay or fail the turn.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::orchestrator::{TurnOutput, WorkflowOrchestrator};

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("transcription failed: {reason}")]
    TranscriptionFailed { reason: String },

    #[error("speech synthesis failed: {reason}")]
    SynthesisFailed { reason: String },
}

/// Speech-to-text. `Ok(None)` means nothing intelligible was heard.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<Option<String>, VoiceError>;
}

/// Text-to-speech sink.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), VoiceError>;
}

pub struct VoiceGateway {
    orchestrator: Arc<WorkflowOrchestrator>,
    transcriber: Arc<dyn Transcriber>,
    synthesizer: Arc<dyn Synthesizer>,
}

impl VoiceGateway {
    pub fn new(
        orchestrator: Arc<WorkflowOrchestrator>,
        transcriber: Arc<dyn Transcriber>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        Self {
            orchestrator,
            transcriber,
            synthesizer,
        }
    }

    /// Transcribe `audio` and, if it produced text, run a turn and speak
    /// the reply. Returns `None` when no turn was run.
    pub async fn handle_audio(&self, thread_id: &str, audio: &[u8]) -> Option<TurnOutput> {
        let text = match self.transcriber.transcribe(audio).await {
            Ok(Some(text)) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::info!(thread_id, "voice: empty transcript, no turn");
                return None;
            }
            Err(e) => {
                tracing::warn!(thread_id, error = %e, "voice: transcription failed, no turn");
                return None;
            }
        };

        let output = self.orchestrator.process_turn(thread_id, text.trim()).await;
        self.speak_detached(output.response_text.clone());
        Some(output)
    }

    /// Fire-and-forget speech. Requires a running tokio runtime.
    fn speak_detached(&self, text: String) {
        let synthesizer = Arc::clone(&self.synthesizer);
        tokio::spawn(async move {
            if let Err(e) = synthesizer.speak(&text).await {
                tracing::warn!(error = %e, "voice: speech synthesis failed");
            }
        });
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
