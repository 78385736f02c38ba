//! Juno command-line entry point.
//!
//! Binary name: `juno`
//!
//! Parses CLI arguments, sets up tracing, loads configuration for the
//! workspace, then dispatches to the command handler. Ctrl+C cancels the
//! running conversation or indexing run through a shared token.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use juno_core::prompt::Preset;
use juno_observe::tracing_setup::{LogFormat, init_tracing, shutdown_tracing};

use cli::present::OutputMode;
use cli::{Cli, Commands, EditorArgs};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.log_json { LogFormat::Json } else { LogFormat::Pretty };
    init_tracing(cli.log_filter(), format, cli.otel)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "juno", &mut std::io::stdout());
        return Ok(());
    }

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let result = run(cli, &cancel).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli, cancel: &CancellationToken) -> anyhow::Result<()> {
    let state = AppState::init(cli.workspace.as_deref()).await?;
    let mode = OutputMode::from_json_flag(cli.json);

    match cli.command {
        Commands::Ask { prompt, editor } => {
            cli::chat::run_preset(&state, Preset::OpenPrompt, prompt, editor, mode, cancel).await?;
        }

        Commands::Code { prompt, editor } => {
            cli::chat::run_preset(&state, Preset::CreateCode, prompt, editor, mode, cancel).await?;
        }

        Commands::Improve {
            file,
            language,
            model,
        } => {
            let editor = EditorArgs {
                file: Some(file),
                language,
                model,
                no_follow_up: true,
            };
            cli::chat::run_preset(&state, Preset::SuggestImprovements, None, editor, mode, cancel)
                .await?;
        }

        Commands::Query {
            question,
            model,
            no_follow_up,
        } => {
            cli::query::query_repository(&state, question, model.as_deref(), no_follow_up, mode, cancel)
                .await?;
        }

        Commands::Index => {
            cli::index::index_workspace(&state, mode, cancel).await?;
        }

        Commands::IndexFile { path } => {
            cli::index::index_single_file(&state, &path, mode, cancel).await?;
        }

        Commands::DeleteIndex { force } => {
            cli::index::delete_index(&state, force, mode).await?;
        }

        Commands::Models { select } => {
            cli::models::models(&state, select, mode).await?;
        }

        Commands::Watch => {
            cli::watch::watch(&state, mode, cancel).await?;
        }

        Commands::Status => {
            cli::status::status(&state, mode).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Cancel `token` on the first Ctrl+C.
async fn cancel_on_ctrl_c(token: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            debug!("interrupt received, cancelling");
            token.cancel();
        }
        Err(err) => debug!(error = %err, "Ctrl+C handler unavailable"),
    }
}
