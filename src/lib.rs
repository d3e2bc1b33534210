pub mod agent_core;
pub mod inference;
pub mod schemes;
pub mod settings;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use agent_core::{AgentDatabase, AgentError, AgentServices, ConversationStore, WorkflowOrchestrator};
use inference::{InferenceClient, OracleAdapter};
use schemes::{ApplicationRegistrar, SchemeDataset};
use settings::AssistantConfig;

/// Return the platform-standard data directory for the assistant.
///
/// - macOS: `~/Library/Application Support/com.scheme-assistant/`
/// - Windows: `{FOLDERID_RoamingAppData}\com.scheme-assistant\`
/// - Linux: `$XDG_DATA_HOME/com.scheme-assistant/` (fallback `~/.local/share/...`)
///
/// Falls back to `~/.scheme-assistant/` only if none of the above can be resolved.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("com.scheme-assistant");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".scheme-assistant")
}

// ─── Logging ────────────────────────────────────────────────────────────────

/// Initialize the tracing subscriber — writes structured logs to the data
/// directory and returns the log file path.
///
/// On each startup:
/// 1. Rotates existing logs (assistant.log → .1 → .2 → .3, keeps last 3).
/// 2. Opens a fresh assistant.log with a line-flushing writer.
/// 3. Logs a startup banner with the data directory path.
pub fn init_tracing(json: bool) -> std::io::Result<PathBuf> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = data_dir();
    std::fs::create_dir_all(&log_dir)?;

    let log_path = log_dir.join("assistant.log");
    rotate_log_file(&log_path, 3);

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let flushing_writer = FlushingWriter::new(log_file);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("scheme_assistant=info,warn"));

    let builder = fmt::fmt()
        .with_env_filter(filter)
        .with_writer(flushing_writer)
        .with_ansi(false)
        .with_target(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %log_dir.display(),
        log_file = %log_path.display(),
        pid = std::process::id(),
        "=== scheme assistant starting ==="
    );

    Ok(log_path)
}

/// Rotate log files: `assistant.log` → `assistant.log.1` → `.2` → … → `.{keep}`.
///
/// Oldest file beyond `keep` is deleted. Missing files in the chain are skipped.
fn rotate_log_file(base_path: &Path, keep: u32) {
    let oldest = format!("{}.{keep}", base_path.display());
    let _ = std::fs::remove_file(&oldest);

    for i in (1..keep).rev() {
        let from = format!("{}.{i}", base_path.display());
        let to = format!("{}.{}", base_path.display(), i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    if base_path.exists() {
        let to = format!("{}.1", base_path.display());
        let _ = std::fs::rename(base_path, &to);
    }
}

/// A writer that wraps `std::fs::File` and flushes after every write, so
/// each log line is on disk even if the process dies mid-turn.
#[derive(Clone)]
struct FlushingWriter {
    file: Arc<std::sync::Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: Arc::new(std::sync::Mutex::new(file)),
        }
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        let n = std::io::Write::write(&mut *f, buf)?;
        std::io::Write::flush(&mut *f)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        std::io::Write::flush(&mut *f)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ─── Assembly ───────────────────────────────────────────────────────────────

/// Command-line overrides for `build_orchestrator`.
#[derive(Debug, Clone, Default)]
pub struct AssistantOptions {
    pub config_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub schemes_path: Option<PathBuf>,
}

/// Resolve the default path for the snapshot database, creating the data
/// directory if needed.
fn resolve_db_path() -> PathBuf {
    let dir = data_dir();
    if !dir.exists() {
        let _ = std::fs::create_dir_all(&dir);
    }
    dir.join("assistant.db")
}

/// Load configuration, the dataset, the oracle and the database, and wire
/// them into an orchestrator.
///
/// A missing config file is not an error: defaults apply and the offline
/// oracle is used.
pub async fn build_orchestrator(options: &AssistantOptions) -> Result<WorkflowOrchestrator, AgentError> {
    let cwd = std::env::current_dir().unwrap_or_default();
    let config_path = options
        .config_path
        .clone()
        .or_else(|| settings::find_config_path(&cwd));

    let (config, project_root) = match config_path {
        Some(path) => {
            let config = settings::load_config(&path)?;
            // config/assistant.yaml → project root
            let root = path
                .parent()
                .and_then(Path::parent)
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cwd.clone());
            tracing::info!(path = %path.display(), "configuration loaded");
            (config, root)
        }
        None => {
            tracing::info!("no configuration file found, using defaults");
            (AssistantConfig::default(), cwd.clone())
        }
    };

    let schemes_path = options
        .schemes_path
        .clone()
        .unwrap_or_else(|| config.schemes_path(&project_root));
    let dataset = SchemeDataset::load(&schemes_path);

    let oracle = match config.oracle.clone() {
        Some(oracle_config) => {
            let client = InferenceClient::from_config(oracle_config).map_err(|e| {
                AgentError::ConfigError {
                    reason: format!("oracle configuration: {e}"),
                }
            })?;
            if !client.health_check().await {
                tracing::warn!(
                    model = client.current_model_name(),
                    "oracle endpoint not reachable, turns will use regex extraction until it is"
                );
            }
            // Long enough for the fallback chain to reach its last model.
            let budget = client.call_budget();
            OracleAdapter::new(Arc::new(client), budget)
        }
        None => {
            tracing::info!("no oracle configured, running offline");
            OracleAdapter::offline()
        }
    };

    let db_path = options
        .db_path
        .clone()
        .or_else(|| config.database_path(&project_root))
        .unwrap_or_else(resolve_db_path);
    if let Some(parent) = db_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let db = AgentDatabase::open(&db_path.to_string_lossy())?;

    let registrar = Arc::new(ApplicationRegistrar::new(
        config.agent.estimated_processing_days,
    ));
    let services = AgentServices::new(oracle, dataset, registrar, config.agent.clone());

    tracing::info!(
        oracle = services.oracle.oracle_name(),
        schemes = services.dataset.len(),
        db = %db_path.display(),
        "orchestrator ready"
    );

    Ok(WorkflowOrchestrator::new(services, ConversationStore::new(db)))
}

// ─── REPL ───────────────────────────────────────────────────────────────────

/// Prompt shown before each utterance.
const PROMPT: &str = "आप> ";

/// Read utterances line by line and answer each one on `thread_id`.
///
/// Commands: `/reset` clears the thread, `/state` prints the profile,
/// `/quit` exits. Blank lines are ignored.
pub async fn run_repl<R, W>(
    orchestrator: &WorkflowOrchestrator,
    thread_id: &str,
    input: R,
    mut output: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    output.write_all(PROMPT.as_bytes()).await?;
    output.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let reply = match line {
            "" => None,
            "/quit" => break,
            "/reset" => Some(match orchestrator.reset(thread_id).await {
                Ok(()) => "बातचीत नए सिरे से शुरू की गई।".to_string(),
                Err(e) => format!("reset failed: {e}"),
            }),
            "/state" => Some(match orchestrator.get_state(thread_id) {
                Ok(Some(state)) => serde_json::to_string_pretty(&state.profile)
                    .unwrap_or_else(|e| format!("state unavailable: {e}")),
                Ok(None) => "{}".to_string(),
                Err(e) => format!("state unavailable: {e}"),
            }),
            utterance => {
                let turn = orchestrator.process_turn(thread_id, utterance).await;
                let meta = &turn.metadata;
                Some(format!(
                    "{}\n[intent={} turn={} eligible={} contradictions={} error={}]",
                    turn.response_text,
                    meta.intent.map_or("-", |i| i.as_str()),
                    meta.turn_count,
                    meta.eligible_count,
                    meta.contradiction_count,
                    meta.error.as_deref().unwrap_or("-"),
                ))
            }
        };

        if let Some(reply) = reply {
            output.write_all(reply.as_bytes()).await?;
            output.write_all(b"\n\n").await?;
        }
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;
    }
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────────────
