//! `watch`: re-index files as they change.

use anyhow::Result;
use console::style;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use juno_infra::scan::FileFilter;
use juno_infra::watch::{DEFAULT_DEBOUNCE, apply_changes, start_watcher};

use super::present::OutputMode;
use crate::state::AppState;

pub async fn watch(state: &AppState, mode: OutputMode, cancel: &CancellationToken) -> Result<()> {
    if !state.config.indexing.active_indexing {
        anyhow::bail!(
            "Active indexing is disabled. Set `indexing.active_indexing = true` in {}",
            state.config_path().display()
        );
    }

    let indexer = state.indexer().await?;
    let filter = FileFilter::from_config(&state.config.indexing)?;
    let (_handle, mut changes) = start_watcher(&state.workspace, filter, DEFAULT_DEBOUNCE)?;

    if mode == OutputMode::Styled {
        println!(
            "  {} Watching {} for changes",
            style("⚡").bold(),
            style(state.workspace.root().display()).cyan()
        );
        println!("  {}", style("Press Ctrl+C to stop").dim());
    }

    loop {
        let batch = tokio::select! {
            _ = cancel.cancelled() => break,
            batch = changes.recv() => batch,
        };
        let Some(batch) = batch else {
            warn!("file watcher stopped");
            break;
        };

        let report = apply_changes(&indexer, &state.workspace, &batch, cancel).await?;
        match mode {
            OutputMode::Json => println!(
                "{}",
                serde_json::json!({ "changes": batch.len(), "report": report })
            ),
            OutputMode::Styled => {
                for change in &batch {
                    println!("  {} {:?} {}", style("~").cyan(), change.kind, change.path);
                }
                for failed in &report.failed {
                    eprintln!("  {} {}: {}", style("✗").red(), failed.path, failed.error);
                }
            }
        }
    }

    if mode == OutputMode::Styled {
        println!("\n  Stopped watching.");
    }
    Ok(())
}
