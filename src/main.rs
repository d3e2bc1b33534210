//! Scheme Assistant — interactive console front end.
//!
//! Reads one utterance per line from stdin and prints the assistant's reply.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use scheme_assistant::{build_orchestrator, init_tracing, run_repl, AssistantOptions};

#[derive(Parser)]
#[command(name = "scheme-assistant")]
#[command(about = "Conversational assistant for government scheme eligibility and applications")]
struct Cli {
    /// Path to assistant.yaml (default: search upward for config/assistant.yaml)
    #[arg(long, env = "SCHEME_ASSISTANT_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database for conversation snapshots
    #[arg(long)]
    db: Option<PathBuf>,

    /// Scheme dataset JSON file
    #[arg(long)]
    schemes: Option<PathBuf>,

    /// Conversation thread to resume (default: a new thread)
    #[arg(long)]
    thread: Option<String>,

    /// Write logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_path = init_tracing(cli.json_logs).context("failed to initialize logging")?;

    let options = AssistantOptions {
        config_path: cli.config,
        db_path: cli.db,
        schemes_path: cli.schemes,
    };
    let orchestrator = build_orchestrator(&options)
        .await
        .context("failed to start the assistant")?;

    let thread_id = cli
        .thread
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    eprintln!("thread: {thread_id}");
    eprintln!("log:    {}", log_path.display());
    eprintln!("commands: /reset  /state  /quit");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    run_repl(&orchestrator, &thread_id, stdin, tokio::io::stdout()).await?;

    tracing::info!(thread_id = %thread_id, "session ended");
    Ok(())
}
