pub mod box_embedder;
pub mod box_vector;
pub mod chunker;
pub mod embedder;
pub mod format;
pub mod pipeline;
pub mod retrieval;
pub mod vector;

pub use box_embedder::BoxEmbedder;
pub use box_vector::BoxVectorIndex;
pub use embedder::Embedder;
pub use pipeline::{ChunkWindow, IndexerOptions, RepositoryIndexer};
pub use retrieval::{GetContextTool, Retriever};
pub use vector::VectorIndex;
