//! Infrastructure for Juno: the OpenAI-compatible chat and embedding
//! clients, the LanceDB vector index, configuration loading, workspace
//! storage paths, file enumeration and the active-indexing watcher.
//!
//! Everything here implements a port defined in `juno-core` or feeds the
//! CLI; nothing in `juno-core` depends on this crate.

pub mod config;
pub mod embedding;
pub mod llm;
pub mod scan;
pub mod vector;
pub mod watch;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_server;
