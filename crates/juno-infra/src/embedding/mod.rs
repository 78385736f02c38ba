//! Embedding providers.

pub mod openai;

pub use openai::OpenAiEmbedder;
