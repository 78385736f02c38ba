//! Configuration types for Juno.
//!
//! `JunoConfig` represents `config.toml` in the Juno data directory. Every
//! field has a default so a missing or partial file is valid; the API key is
//! the only setting without a usable default.

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use crate::index::{MAX_FILE_CHARS, REPOSITORY_CHUNK_OVERLAP, REPOSITORY_CHUNK_SIZE};
use crate::llm::DEFAULT_MODEL;

/// Settings key of the API key, as shown in error messages.
pub const API_KEY_SETTING: &str = "juno.apiKey";

/// Top-level configuration.
///
/// Does not implement `Serialize`: the API key must never be written back
/// out or logged.
#[derive(Debug, Deserialize)]
pub struct JunoConfig {
    /// Provider API key. Usually supplied through `JUNO_API_KEY` / `OPENAI_API_KEY`.
    #[serde(default)]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub temperature: Option<f64>,

    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,

    #[serde(default)]
    pub user_name: Option<String>,

    /// Upper bound on completion requests in one function-call loop.
    #[serde(default = "default_max_round_trips")]
    pub max_round_trips: usize,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_assistant_name() -> String {
    "Juno".to_string()
}

fn default_max_round_trips() -> usize {
    5
}

impl Default for JunoConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            temperature: None,
            assistant_name: default_assistant_name(),
            user_name: None,
            max_round_trips: default_max_round_trips(),
            embedding: EmbeddingConfig::default(),
            indexing: IndexingConfig::default(),
        }
    }
}

impl JunoConfig {
    /// The API key, or the missing-setting error the shell reports to the user.
    pub fn require_api_key(&self) -> Result<&SecretString, ConfigError> {
        self.api_key.as_ref().ok_or_else(|| ConfigError::Missing {
            key: API_KEY_SETTING.to_string(),
            friendly_name: "OpenAI API Key".to_string(),
        })
    }

    /// Check every setting a provider connection needs, reporting all gaps at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.api_key.is_none() {
            missing.push("OpenAI API Key".to_string());
        }
        if self.model.trim().is_empty() {
            missing.push("Model".to_string());
        }
        if self.base_url.trim().is_empty() {
            missing.push("Base URL".to_string());
        }

        if missing.len() == 1 && self.api_key.is_none() {
            self.require_api_key()?;
        } else if !missing.is_empty() {
            return Err(ConfigError::MissingMany {
                friendly_names: missing,
            });
        }

        if self.indexing.chunk_overlap >= self.indexing.chunk_size {
            return Err(ConfigError::Invalid {
                key: "indexing.chunk_overlap".to_string(),
                reason: format!(
                    "must be smaller than indexing.chunk_size ({})",
                    self.indexing.chunk_size
                ),
            });
        }
        if self.embedding.concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "embedding.concurrency".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Embedding endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector dimension the model produces; fixed for the lifetime of an index.
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Maximum embedding requests in flight while indexing.
    #[serde(default = "default_embedding_concurrency")]
    pub concurrency: usize,
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_embedding_dimension() -> usize {
    1536
}

fn default_embedding_concurrency() -> usize {
    4
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            concurrency: default_embedding_concurrency(),
        }
    }
}

/// Repository indexing settings.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexingConfig {
    /// Re-index changed files while `juno watch` runs.
    #[serde(default)]
    pub active_indexing: bool,

    /// Glob patterns a file must match to be indexed. Empty means all files.
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns that exclude files, applied after `include`.
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default = "default_max_file_chars")]
    pub max_file_chars: usize,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_max_file_chars() -> usize {
    MAX_FILE_CHARS
}

fn default_chunk_size() -> usize {
    REPOSITORY_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    REPOSITORY_CHUNK_OVERLAP
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            active_indexing: false,
            include: Vec::new(),
            exclude: Vec::new(),
            max_file_chars: default_max_file_chars(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Configuration problems surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing setting: {friendly_name}")]
    Missing { key: String, friendly_name: String },

    #[error("Missing settings: {}", friendly_names.join(", "))]
    MissingMany { friendly_names: Vec<String> },

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = JunoConfig::default();
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.assistant_name, "Juno");
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert_eq!(config.embedding.dimension, 1536);
        assert_eq!(config.indexing.chunk_size, 2_000);
        assert_eq!(config.indexing.chunk_overlap, 300);
        assert_eq!(config.indexing.max_file_chars, 30_000);
        assert!(!config.indexing.active_indexing);
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: JunoConfig = toml::from_str("").unwrap();
        assert_eq!(config.max_round_trips, 5);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: JunoConfig = toml::from_str(
            r#"
api_key = "sk-test"
model = "gpt-4"
user_name = "Ada"

[indexing]
active_indexing = true
exclude = ["*.lock"]
"#,
        )
        .unwrap();
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.user_name.as_deref(), Some("Ada"));
        assert!(config.indexing.active_indexing);
        assert_eq!(config.indexing.exclude, vec!["*.lock".to_string()]);
        assert_eq!(config.indexing.chunk_size, 2_000);
        assert!(config.require_api_key().is_ok());
    }

    #[test]
    fn test_missing_api_key_message() {
        let err = JunoConfig::default().require_api_key().unwrap_err();
        assert_eq!(err.to_string(), "Missing setting: OpenAI API Key");
        assert!(matches!(err, ConfigError::Missing { ref key, .. } if key == "juno.apiKey"));
    }

    #[test]
    fn test_validate_aggregates_missing_settings() {
        let config = JunoConfig {
            model: String::new(),
            ..JunoConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Missing settings: OpenAI API Key, Model");
    }

    #[test]
    fn test_validate_rejects_overlap_not_below_chunk_size() {
        let mut config = JunoConfig {
            api_key: Some(SecretString::from("sk-test")),
            ..JunoConfig::default()
        };
        config.indexing.chunk_overlap = config.indexing.chunk_size;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }
}
