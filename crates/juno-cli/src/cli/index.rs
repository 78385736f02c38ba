//! Index commands: `index`, `index-file` and `delete-index`.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use juno_infra::scan::{FileFilter, list_files, read_source_file};
use juno_types::index::{IndexProgress, IndexReport, SourceFile};

use super::present::OutputMode;
use crate::state::AppState;

const INDEXED_MESSAGE: &str =
    "Successfully indexed repository. You can now query the repository using semantic search";
const PARTIAL_INDEX_MESSAGE: &str =
    "Repository did not finish indexing and you will experience degraded query capabilities.";

/// Index every file of the workspace.
pub async fn index_workspace(
    state: &AppState,
    mode: OutputMode,
    cancel: &CancellationToken,
) -> Result<IndexReport> {
    let indexer = state.indexer().await?;
    let filter = FileFilter::from_config(&state.config.indexing)?;
    let paths = list_files(&state.workspace, &filter)?;
    info!(files = paths.len(), "indexing workspace");

    let files = read_files(state, &paths).await;

    let bar = progress_bar(files.len() as u64, mode);
    let on_progress = {
        let bar = bar.clone();
        move |progress: &IndexProgress| {
            bar.set_position(progress.files_done as u64);
            bar.set_message(progress.path.clone());
        }
    };
    let report = indexer.index_files(files, &on_progress, cancel).await?;
    bar.finish_and_clear();

    report_outcome(state, &report, mode).await?;
    Ok(report)
}

/// Index one file with the single-file chunk window.
pub async fn index_single_file(
    state: &AppState,
    path: &Path,
    mode: OutputMode,
    cancel: &CancellationToken,
) -> Result<()> {
    let path = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    let file = read_source_file(&state.workspace, &path)
        .await?
        .with_context(|| format!("{} is not a text file", path.display()))?;

    let indexer = state.indexer().await?;
    let report = indexer.index_file(file, cancel).await?;

    match mode {
        OutputMode::Json => println!("{}", serde_json::to_string(&report)?),
        OutputMode::Styled => {
            if report.files_unchanged > 0 {
                println!("  {} Unchanged, nothing to do.", style("✓").green());
            } else if report.files_indexed > 0 {
                println!(
                    "  {} Indexed {} ({} chunks)",
                    style("✓").green().bold(),
                    path.display(),
                    report.chunks_inserted
                );
            }
            print_problems(&report);
        }
    }
    Ok(())
}

/// Delete the workspace index, asking first unless `force` is set.
pub async fn delete_index(state: &AppState, force: bool, mode: OutputMode) -> Result<()> {
    if !force && mode == OutputMode::Styled {
        let confirmed = Confirm::new()
            .with_prompt("Delete the semantic index of this workspace?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let index = state.vector_index().await?;
    index.delete_index().await?;

    match mode {
        OutputMode::Json => println!("{}", serde_json::json!({ "deleted": true })),
        OutputMode::Styled => println!("  {} Index deleted.", style("✓").green().bold()),
    }
    Ok(())
}

/// Read every listed file, skipping binaries and logging unreadable ones.
async fn read_files(state: &AppState, paths: &[String]) -> Vec<SourceFile> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match read_source_file(&state.workspace, Path::new(path)).await {
            Ok(Some(file)) => files.push(file),
            Ok(None) => {}
            Err(err) => warn!(path = %path, error = %err, "cannot read file, skipping"),
        }
    }
    files
}

fn progress_bar(total: u64, mode: OutputMode) -> ProgressBar {
    if mode == OutputMode::Json || !console::user_attended_stderr() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

async fn report_outcome(state: &AppState, report: &IndexReport, mode: OutputMode) -> Result<()> {
    if mode == OutputMode::Json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }

    if report.cancelled {
        eprintln!("  {} {PARTIAL_INDEX_MESSAGE}", style("!").yellow().bold());
        if console::user_attended() {
            let delete = Confirm::new()
                .with_prompt("Delete partial index?")
                .default(false)
                .interact()?;
            if delete {
                state.vector_index().await?.delete_index().await?;
                println!("  {} Partial index deleted.", style("✓").green());
            }
        }
        return Ok(());
    }

    println!("  {} {INDEXED_MESSAGE}", style("✓").green().bold());
    println!(
        "  {}",
        style(format!(
            "{} indexed, {} unchanged, {} chunks",
            report.files_indexed, report.files_unchanged, report.chunks_inserted
        ))
        .dim()
    );
    print_problems(report);
    Ok(())
}

fn print_problems(report: &IndexReport) {
    for skipped in &report.skipped {
        eprintln!(
            "  {} skipped {} ({} characters, limit {})",
            style("-").dim(),
            skipped.path,
            skipped.chars,
            skipped.limit
        );
    }
    for failed in &report.failed {
        eprintln!("  {} {}: {}", style("✗").red(), failed.path, failed.error);
    }
}
