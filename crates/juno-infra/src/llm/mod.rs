//! Chat-completion providers.

pub mod openai;
