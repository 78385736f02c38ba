//! Shared domain types for Juno.
//!
//! This crate contains the data shapes used across the workspace: chat
//! messages and stream events, tool descriptors, repository index records,
//! configuration, and UI shell events, together with their error types.
//!
//! Zero infrastructure dependencies -- only serde, secrecy, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod index;
pub mod llm;
pub mod tool;
