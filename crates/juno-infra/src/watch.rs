//! Active indexing: watch the workspace and keep the index in step.
//!
//! Provides:
//! - `start_watcher()` -- a debounced recursive watcher over the workspace
//! - `WatcherHandle` -- RAII handle that keeps the watcher alive
//! - `changes_from_events()` -- turns raw events into indexable file changes
//! - `apply_changes()` -- re-indexes changed files and evicts removed ones

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// notify types re-exported through notify-debouncer-mini so both agree on the notify version.
use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, DebouncedEvent, Debouncer, new_debouncer};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use juno_core::index::RepositoryIndexer;
use juno_types::index::{FailedFile, IndexError, IndexReport};

use crate::scan::{FileFilter, read_source_file};
use crate::workspace::Workspace;

/// Default quiet period before a burst of events is delivered.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("watcher creation failed: {0}")]
    WatcherCreation(String),

    #[error("failed to watch path '{path}': {reason}")]
    WatchPath { path: String, reason: String },
}

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Created or modified; re-index it.
    Changed,
    /// No longer on disk; evict it.
    Removed,
}

/// A change to one indexable file, by workspace-relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub kind: ChangeKind,
}

/// Keeps the filesystem watcher alive until dropped.
pub struct WatcherHandle {
    _debouncer: Debouncer<RecommendedWatcher>,
    root: PathBuf,
}

impl WatcherHandle {
    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        debug!(root = %self.root.display(), "file watcher dropped");
    }
}

/// Indexable file changes in a batch of debounced events.
///
/// Directories, paths outside the workspace and paths rejected by `filter`
/// are dropped; each file appears once.
pub fn changes_from_events(
    workspace: &Workspace,
    filter: &FileFilter,
    events: &[DebouncedEvent],
) -> Vec<FileChange> {
    let mut changes = BTreeMap::new();
    for event in events {
        if event.path.is_dir() {
            continue;
        }
        let Some(relative) = workspace.relative_path(&event.path) else {
            continue;
        };
        if !filter.accepts(&relative) {
            continue;
        }
        let kind = if event.path.exists() {
            ChangeKind::Changed
        } else {
            ChangeKind::Removed
        };
        changes.insert(relative, kind);
    }
    changes
        .into_iter()
        .map(|(path, kind)| FileChange { path, kind })
        .collect()
}

/// Start a debounced watcher over the whole workspace.
///
/// Returns the handle (keep it alive to keep watching) and a channel of
/// change batches.
pub fn start_watcher(
    workspace: &Workspace,
    filter: FileFilter,
    debounce: Duration,
) -> Result<(WatcherHandle, mpsc::Receiver<Vec<FileChange>>), WatchError> {
    let (tx, rx) = mpsc::channel::<Vec<FileChange>>(64);
    let watched = workspace.clone();

    let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| match result {
        Ok(events) => {
            let changes = changes_from_events(&watched, &filter, &events);
            if changes.is_empty() {
                return;
            }
            debug!(count = changes.len(), "file changes detected");
            // A full channel drops the batch; the next save of a file re-queues it.
            if tx.try_send(changes).is_err() {
                warn!("change queue full, dropping a batch of file events");
            }
        }
        Err(err) => warn!(error = %err, "file watcher error"),
    })
    .map_err(|e| WatchError::WatcherCreation(e.to_string()))?;

    let root = workspace.root().to_path_buf();
    debouncer
        .watcher()
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| WatchError::WatchPath {
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;
    info!(root = %root.display(), "file watcher started");

    Ok((
        WatcherHandle {
            _debouncer: debouncer,
            root,
        },
        rx,
    ))
}

/// Bring the index in line with a batch of changes.
///
/// Unreadable files are reported as failed and do not stop the batch.
pub async fn apply_changes(
    indexer: &RepositoryIndexer,
    workspace: &Workspace,
    changes: &[FileChange],
    cancel: &CancellationToken,
) -> Result<IndexReport, IndexError> {
    let mut report = IndexReport::default();
    let mut files = Vec::new();
    for change in changes {
        if cancel.is_cancelled() {
            report.cancelled = true;
            return Ok(report);
        }
        match change.kind {
            ChangeKind::Removed => {
                indexer.remove_file(&change.path).await?;
            }
            ChangeKind::Changed => match read_source_file(workspace, Path::new(&change.path)).await {
                Ok(Some(file)) => files.push(file),
                Ok(None) => {}
                Err(err) => {
                    warn!(path = %change.path, error = %err, "cannot re-index file");
                    report.failed.push(FailedFile {
                        path: change.path.clone(),
                        error: err.to_string(),
                    });
                }
            },
        }
    }

    if !files.is_empty() {
        // Same chunk window as `juno index`, so watched files match the rest of the index.
        let batch = indexer.index_files(files, &|_| {}, cancel).await?;
        merge(&mut report, batch);
    }
    Ok(report)
}

fn merge(into: &mut IndexReport, from: IndexReport) {
    into.files_indexed += from.files_indexed;
    into.files_unchanged += from.files_unchanged;
    into.chunks_inserted += from.chunks_inserted;
    into.skipped.extend(from.skipped);
    into.failed.extend(from.failed);
    into.cancelled |= from.cancelled;
}
