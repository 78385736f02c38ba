//! Repository index types.
//!
//! Text is split into overlapping [`Chunk`]s, each chunk is embedded and
//! stored as an [`IndexedItem`], and nearest-neighbour queries return
//! [`RankedResult`]s ordered by ascending distance.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chunk window used when indexing a whole repository.
pub const REPOSITORY_CHUNK_SIZE: usize = 2_000;
pub const REPOSITORY_CHUNK_OVERLAP: usize = 300;

/// Chunk window used when indexing a single file on demand.
pub const FILE_CHUNK_SIZE: usize = 1_000;
pub const FILE_CHUNK_OVERLAP: usize = 200;

/// Files longer than this many characters are skipped by the indexer.
pub const MAX_FILE_CHARS: usize = 30_000;

/// Number of results the `getContext` tool retrieves per query.
pub const CONTEXT_TOP_K: usize = 3;

/// A window of text produced by the chunker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Start position in the source text, counted in characters.
    pub offset: usize,
    /// Zero-based position of the chunk in the split sequence.
    pub index: usize,
}

/// Payload stored alongside each vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub text: String,
    pub file_path: String,
    pub language_id: String,
    pub chunk_index: u32,
    /// Line count of the whole source file.
    pub line_count: u32,
    /// Hex SHA-256 of the whole source file content.
    pub content_hash: String,
}

/// A vector plus its metadata, as inserted into the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedItem {
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A query hit. Lower distance means more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub metadata: ChunkMetadata,
    pub distance: f32,
}

/// A file handed to the indexer by the enumeration layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Workspace-relative path, used as the file identity in the index.
    pub path: String,
    pub language_id: String,
    pub content: String,
}

/// A file the indexer did not attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub chars: usize,
    pub limit: usize,
}

/// A file whose indexing stopped part-way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub path: String,
    pub error: String,
}

/// Progress notification emitted after each file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexProgress {
    pub files_done: usize,
    pub files_total: usize,
    pub path: String,
}

/// Summary of an indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub files_indexed: usize,
    /// Files whose stored content hash matched, so nothing was re-embedded.
    pub files_unchanged: usize,
    pub chunks_inserted: usize,
    pub skipped: Vec<SkippedFile>,
    pub failed: Vec<FailedFile>,
    /// The run was cancelled; whatever was inserted before that stays.
    pub cancelled: bool,
}

impl IndexReport {
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failed.is_empty()
    }
}

/// Invalid chunker parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("chunk size must be at least 1")]
    ZeroChunkSize,

    #[error("overlap {overlap} must be smaller than chunk size {chunk_size}")]
    OverlapTooLarge { chunk_size: usize, overlap: usize },
}

/// Errors from embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("embedding response invalid: {0}")]
    InvalidResponse(String),

    #[error("embedding authentication failed")]
    AuthenticationFailed,

    #[error("embedding rate limited")]
    RateLimited,
}

/// Errors from vector index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index not found: build it first with `juno index`")]
    NotFound,

    #[error("vector dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("embedding provider error: {0}")]
    EmbeddingProvider(#[from] EmbeddingError),

    #[error("invalid chunking configuration: {0}")]
    Chunking(#[from] ChunkError),

    #[error("storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_error_display() {
        let err = IndexError::DimensionMismatch {
            expected: 1536,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "vector dimension mismatch: index expects 1536, got 3"
        );
    }

    #[test]
    fn test_embedding_error_converts() {
        let err: IndexError = EmbeddingError::RateLimited.into();
        assert!(matches!(err, IndexError::EmbeddingProvider(_)));
    }

    #[test]
    fn test_report_completeness() {
        let mut report = IndexReport::default();
        assert!(report.is_complete());
        report.cancelled = true;
        assert!(!report.is_complete());
    }
}
