//! Embedder trait for text-to-vector conversion.
//!
//! Implementations (the OpenAI embeddings endpoint) live in juno-infra.

use juno_types::index::EmbeddingError;

/// Trait for converting text into embedding vectors.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait Embedder: Send + Sync {
    /// Embed one or more texts. Returns one vector per input, in input order.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, EmbeddingError>> + Send;

    /// Model name recorded next to every stored vector.
    fn model_name(&self) -> &str;

    /// Length of every vector this embedder returns.
    fn dimension(&self) -> usize;
}
