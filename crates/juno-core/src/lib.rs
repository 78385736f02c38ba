//! Conversation orchestration and retrieval logic for Juno.
//!
//! This crate defines the "ports" (provider, embedder and vector index
//! traits) that the infrastructure layer implements, and the logic built on
//! them: the streaming conversation engine, tool dispatch, the function-call
//! loop, chunking, indexing and retrieval. It depends only on `juno-types`
//! -- never on `juno-infra` or any HTTP/database crate.

pub mod conversation;
pub mod event;
pub mod index;
pub mod llm;
pub mod prompt;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;
