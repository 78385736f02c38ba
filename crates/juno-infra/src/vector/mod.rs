//! Persistent vector storage.

pub mod lance;
pub mod schema;

pub use lance::LanceVectorIndex;
