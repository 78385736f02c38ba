//! Repository indexing pipeline.
//!
//! `RepositoryIndexer` turns [`SourceFile`]s into stored vectors: oversized
//! files are skipped, unchanged files (same content hash as the stored
//! chunks) are left alone, and changed files are re-chunked and embedded,
//! then swapped in by evicting the old chunks of that path. Chunk
//! embeddings are requested with bounded concurrency while inserts stay
//! sequential in chunk order.

use futures_util::{StreamExt, TryStreamExt};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use juno_types::config::{EmbeddingConfig, IndexingConfig};
use juno_types::index::{
    ChunkMetadata, FailedFile, FILE_CHUNK_OVERLAP, FILE_CHUNK_SIZE, IndexError, IndexProgress,
    IndexReport, IndexedItem, MAX_FILE_CHARS, REPOSITORY_CHUNK_OVERLAP, REPOSITORY_CHUNK_SIZE,
    SkippedFile, SourceFile,
};

use super::box_embedder::BoxEmbedder;
use super::box_vector::BoxVectorIndex;
use super::chunker;

/// Chunk size and overlap, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkWindow {
    pub size: usize,
    pub overlap: usize,
}

/// Settings for a [`RepositoryIndexer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerOptions {
    /// Window used by [`RepositoryIndexer::index_files`].
    pub repository_window: ChunkWindow,
    /// Window used by [`RepositoryIndexer::index_file`].
    pub file_window: ChunkWindow,
    pub max_file_chars: usize,
    /// Embedding requests in flight at once.
    pub embedding_concurrency: usize,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self {
            repository_window: ChunkWindow {
                size: REPOSITORY_CHUNK_SIZE,
                overlap: REPOSITORY_CHUNK_OVERLAP,
            },
            file_window: ChunkWindow {
                size: FILE_CHUNK_SIZE,
                overlap: FILE_CHUNK_OVERLAP,
            },
            max_file_chars: MAX_FILE_CHARS,
            embedding_concurrency: 4,
        }
    }
}

impl IndexerOptions {
    pub fn from_config(indexing: &IndexingConfig, embedding: &EmbeddingConfig) -> Self {
        Self {
            repository_window: ChunkWindow {
                size: indexing.chunk_size,
                overlap: indexing.chunk_overlap,
            },
            max_file_chars: indexing.max_file_chars,
            embedding_concurrency: embedding.concurrency.max(1),
            ..Self::default()
        }
    }
}

/// How indexing one file ended.
enum FileOutcome {
    Indexed { chunks: usize },
    Unchanged,
    Skipped(SkippedFile),
    Failed(FailedFile),
    Cancelled,
}

/// Batch and single-file indexing over an embedder and a vector index.
pub struct RepositoryIndexer {
    embedder: BoxEmbedder,
    index: BoxVectorIndex,
    options: IndexerOptions,
    // Held across evict + insert so concurrent runs never interleave writes.
    write_lock: Mutex<()>,
}

impl RepositoryIndexer {
    pub fn new(embedder: BoxEmbedder, index: BoxVectorIndex, options: IndexerOptions) -> Self {
        Self {
            embedder,
            index,
            options,
            write_lock: Mutex::new(()),
        }
    }

    pub fn options(&self) -> &IndexerOptions {
        &self.options
    }

    /// Index a batch of files with the repository chunk window.
    ///
    /// A failed embedding abandons that file only and leaves its previously
    /// stored chunks in place. Cancelling stops before the file in progress
    /// is written; files finished before that stay indexed and the report is
    /// marked `cancelled`. Storage errors abort the run.
    pub async fn index_files(
        &self,
        files: Vec<SourceFile>,
        on_progress: &(dyn Fn(&IndexProgress) + Send + Sync),
        cancel: &CancellationToken,
    ) -> Result<IndexReport, IndexError> {
        self.ensure_dimension()?;
        self.index.ensure_created().await?;

        let files_total = files.len();
        let mut report = IndexReport::default();
        info!(files = files_total, "indexing repository");

        for (done, file) in files.into_iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let path = file.path.clone();
            let outcome = self
                .index_one(file, self.options.repository_window, cancel)
                .await?;
            if !record(&mut report, outcome) {
                break;
            }

            on_progress(&IndexProgress {
                files_done: done + 1,
                files_total,
                path,
            });
        }

        info!(
            indexed = report.files_indexed,
            unchanged = report.files_unchanged,
            chunks = report.chunks_inserted,
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "indexing finished"
        );
        Ok(report)
    }

    /// Index (or re-index) one file with the single-file chunk window.
    pub async fn index_file(
        &self,
        file: SourceFile,
        cancel: &CancellationToken,
    ) -> Result<IndexReport, IndexError> {
        self.ensure_dimension()?;
        self.index.ensure_created().await?;

        let mut report = IndexReport::default();
        let outcome = self.index_one(file, self.options.file_window, cancel).await?;
        record(&mut report, outcome);
        Ok(report)
    }

    /// Drop every chunk of `path`, e.g. after the file was deleted.
    pub async fn remove_file(&self, path: &str) -> Result<usize, IndexError> {
        let _guard = self.write_lock.lock().await;
        let removed = self.index.delete_file(path).await?;
        debug!(path, removed, "removed file from index");
        Ok(removed)
    }

    fn ensure_dimension(&self) -> Result<(), IndexError> {
        if self.embedder.dimension() != self.index.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: self.index.dimension(),
                actual: self.embedder.dimension(),
            });
        }
        Ok(())
    }

    async fn index_one(
        &self,
        file: SourceFile,
        window: ChunkWindow,
        cancel: &CancellationToken,
    ) -> Result<FileOutcome, IndexError> {
        let chars = file.content.chars().count();
        if chars > self.options.max_file_chars {
            warn!("skipping {} due to excessive size", file.path);
            return Ok(FileOutcome::Skipped(SkippedFile {
                path: file.path,
                chars,
                limit: self.options.max_file_chars,
            }));
        }

        let content_hash = content_hash(&file.content);
        if self.index.file_hash(&file.path).await?.as_deref() == Some(content_hash.as_str()) {
            debug!(path = %file.path, "content unchanged, skipping");
            return Ok(FileOutcome::Unchanged);
        }

        let chunks = chunker::split(&file.content, window.size, window.overlap)?;
        let line_count = file.content.lines().count() as u32;
        let span = info_span!("index.file", path = %file.path, chunks = chunks.len());

        async {
            // Embed the whole file before touching the index so a failed or
            // cancelled file keeps its previous chunks.
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            let embedded = futures_util::stream::iter(texts)
                .map(|text| async move { self.embedder.embed_one(&text).await })
                .buffered(self.options.embedding_concurrency.max(1))
                .try_collect::<Vec<_>>();

            let vectors = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(FileOutcome::Cancelled),
                result = embedded => result,
            };
            let vectors = match vectors {
                Ok(vectors) => vectors,
                Err(err) => {
                    warn!(error = %err, "embedding failed, keeping previous chunks");
                    return Ok(FileOutcome::Failed(FailedFile {
                        path: file.path.clone(),
                        error: err.to_string(),
                    }));
                }
            };

            let _guard = self.write_lock.lock().await;
            let evicted = self.index.delete_file(&file.path).await?;
            if evicted > 0 {
                debug!(evicted, "evicted previous chunks");
            }

            let mut inserted = 0;
            for (chunk, vector) in chunks.iter().zip(vectors) {
                let item = IndexedItem {
                    vector,
                    metadata: ChunkMetadata {
                        text: chunk.text.clone(),
                        file_path: file.path.clone(),
                        language_id: file.language_id.clone(),
                        chunk_index: chunk.index as u32,
                        line_count,
                        content_hash: content_hash.clone(),
                    },
                };
                self.index.insert(&item).await?;
                inserted += 1;
            }

            Ok::<_, IndexError>(FileOutcome::Indexed { chunks: inserted })
        }
        .instrument(span)
        .await
    }
}

/// Fold one file outcome into the report. Returns false once the run was cancelled.
fn record(report: &mut IndexReport, outcome: FileOutcome) -> bool {
    match outcome {
        FileOutcome::Indexed { chunks } => {
            report.files_indexed += 1;
            report.chunks_inserted += chunks;
        }
        FileOutcome::Unchanged => report.files_unchanged += 1,
        FileOutcome::Skipped(skipped) => report.skipped.push(skipped),
        FileOutcome::Failed(failed) => report.failed.push(failed),
        FileOutcome::Cancelled => {
            report.cancelled = true;
            return false;
        }
    }
    true
}

/// Hex SHA-256 of file content.
pub fn content_hash(content: &str) -> String {
    Sha256::digest(content.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::testing::{FakeEmbedder, MemoryVectorIndex};

    fn file(path: &str, content: &str) -> SourceFile {
        SourceFile {
            path: path.to_string(),
            language_id: "rust".to_string(),
            content: content.to_string(),
        }
    }

    fn small_options() -> IndexerOptions {
        IndexerOptions {
            repository_window: ChunkWindow { size: 4, overlap: 1 },
            file_window: ChunkWindow { size: 5, overlap: 0 },
            max_file_chars: 20,
            embedding_concurrency: 2,
        }
    }

    fn indexer(embedder: FakeEmbedder, index: &MemoryVectorIndex) -> RepositoryIndexer {
        RepositoryIndexer::new(
            BoxEmbedder::new(embedder),
            BoxVectorIndex::new(index.clone()),
            small_options(),
        )
    }

    #[tokio::test]
    async fn test_indexes_chunks_in_order_with_metadata() {
        let index = MemoryVectorIndex::new(FakeEmbedder::DIMENSION);
        let indexer = indexer(FakeEmbedder::new(), &index);
        let progress = StdMutex::new(Vec::new());

        let report = indexer
            .index_files(
                vec![file("a.rs", "abcdefghij"), file("b.rs", "xy")],
                &|p| progress.lock().unwrap().push((p.files_done, p.files_total)),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(report.files_indexed, 2);
        assert_eq!(report.chunks_inserted, 4);
        assert!(report.is_complete());
        assert_eq!(*progress.lock().unwrap(), vec![(1, 2), (2, 2)]);

        let items = index.items();
        let texts: Vec<&str> = items.iter().map(|i| i.metadata.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "defg", "ghij", "xy"]);
        assert_eq!(items[1].metadata.chunk_index, 1);
        assert_eq!(items[0].metadata.content_hash, content_hash("abcdefghij"));
    }

    #[tokio::test]
    async fn test_oversized_file_is_skipped() {
        let index = MemoryVectorIndex::new(FakeEmbedder::DIMENSION);
        let indexer = indexer(FakeEmbedder::new(), &index);

        let report = indexer
            .index_files(
                vec![file("big.rs", &"x".repeat(21)), file("ok.rs", "fine")],
                &|_| {},
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path, "big.rs");
        assert_eq!(report.skipped[0].chars, 21);
        assert_eq!(report.files_indexed, 1);
        assert!(index.items().iter().all(|i| i.metadata.file_path == "ok.rs"));
    }

    #[tokio::test]
    async fn test_reindex_skips_unchanged_and_replaces_changed() {
        let index = MemoryVectorIndex::new(FakeEmbedder::DIMENSION);
        let indexer = indexer(FakeEmbedder::new(), &index);
        let cancel = CancellationToken::new();

        indexer
            .index_files(vec![file("a.rs", "abcdefghij")], &|_| {}, &cancel)
            .await
            .unwrap();
        let report = indexer
            .index_files(vec![file("a.rs", "abcdefghij")], &|_| {}, &cancel)
            .await
            .unwrap();
        assert_eq!(report.files_unchanged, 1);
        assert_eq!(index.items().len(), 3);

        let report = indexer
            .index_files(vec![file("a.rs", "abc")], &|_| {}, &cancel)
            .await
            .unwrap();
        assert_eq!(report.files_indexed, 1);
        let items = index.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].metadata.text, "abc");
    }

    #[tokio::test]
    async fn test_embedding_failure_abandons_only_that_file() {
        let index = MemoryVectorIndex::new(FakeEmbedder::DIMENSION);
        let indexer = indexer(FakeEmbedder::failing_on("defg"), &index);

        let report = indexer
            .index_files(
                vec![file("a.rs", "abcdefghij"), file("b.rs", "xy")],
                &|_| {},
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, "a.rs");
        assert_eq!(report.files_indexed, 1);
        let paths: Vec<String> = index.items().into_iter().map(|i| i.metadata.file_path).collect();
        assert_eq!(paths, vec!["b.rs"]);
    }

    #[tokio::test]
    async fn test_failed_reindex_keeps_previous_chunks() {
        let index = MemoryVectorIndex::new(FakeEmbedder::DIMENSION);
        let cancel = CancellationToken::new();
        indexer(FakeEmbedder::new(), &index)
            .index_files(vec![file("a.rs", "abcdefghij")], &|_| {}, &cancel)
            .await
            .unwrap();

        let report = indexer(FakeEmbedder::failing_on("xbcd"), &index)
            .index_files(vec![file("a.rs", "xbcdefghij")], &|_| {}, &cancel)
            .await
            .unwrap();

        assert_eq!(report.failed.len(), 1);
        let texts: Vec<String> = index.items().into_iter().map(|i| i.metadata.text).collect();
        assert_eq!(texts, vec!["abcd", "defg", "ghij"]);
        assert!(index
            .items()
            .iter()
            .all(|i| i.metadata.content_hash == content_hash("abcdefghij")));
    }

    #[tokio::test]
    async fn test_cancelled_run_keeps_finished_files() {
        let index = MemoryVectorIndex::new(FakeEmbedder::DIMENSION);
        let indexer = indexer(FakeEmbedder::new(), &index);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let report = indexer
            .index_files(
                vec![file("a.rs", "abc"), file("b.rs", "def")],
                &move |p| {
                    if p.files_done == 1 {
                        trigger.cancel();
                    }
                },
                &cancel,
            )
            .await
            .unwrap();

        assert!(report.cancelled);
        assert!(!report.is_complete());
        assert_eq!(report.files_indexed, 1);
        let paths: Vec<String> = index.items().into_iter().map(|i| i.metadata.file_path).collect();
        assert_eq!(paths, vec!["a.rs"]);
    }

    #[tokio::test]
    async fn test_single_file_uses_file_window() {
        let index = MemoryVectorIndex::new(FakeEmbedder::DIMENSION);
        let indexer = indexer(FakeEmbedder::new(), &index);

        let report = indexer
            .index_file(file("a.rs", "abcdefghij"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.chunks_inserted, 2);
        let texts: Vec<String> = index.items().into_iter().map(|i| i.metadata.text).collect();
        assert_eq!(texts, vec!["abcde", "fghij"]);
    }

    #[tokio::test]
    async fn test_embedder_dimension_must_match_index() {
        let index = MemoryVectorIndex::new(FakeEmbedder::DIMENSION + 1);
        let indexer = indexer(FakeEmbedder::new(), &index);

        let err = indexer
            .index_files(vec![file("a.rs", "abc")], &|_| {}, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
        assert!(index.items().is_empty());
    }

    #[test]
    fn test_content_hash_is_hex_sha256() {
        assert_eq!(
            content_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_options_from_config() {
        let indexing = IndexingConfig {
            chunk_size: 800,
            chunk_overlap: 100,
            ..IndexingConfig::default()
        };
        let options = IndexerOptions::from_config(&indexing, &EmbeddingConfig::default());
        assert_eq!(options.repository_window, ChunkWindow { size: 800, overlap: 100 });
        assert_eq!(options.file_window.size, FILE_CHUNK_SIZE);
        assert_eq!(options.embedding_concurrency, 4);
    }

    #[tokio::test]
    async fn test_remove_file_evicts_only_that_file() {
        let index = MemoryVectorIndex::new(FakeEmbedder::DIMENSION);
        let indexer = indexer(FakeEmbedder::new(), &index);
        indexer
            .index_files(
                vec![file("a.rs", "abcdefghij"), file("b.rs", "xy")],
                &|_| {},
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(indexer.remove_file("a.rs").await.unwrap(), 3);
        assert_eq!(indexer.remove_file("a.rs").await.unwrap(), 0);
        let paths: Vec<String> = index.items().into_iter().map(|i| i.metadata.file_path).collect();
        assert_eq!(paths, vec!["b.rs".to_string()]);
    }
}
