//! Application state wiring configuration, workspace and services together.
//!
//! `AppState` holds the loaded configuration and the resolved workspace;
//! providers, embedders and the vector index are built on demand so that
//! commands which never talk to the network (e.g. `status`, `models`) work
//! without an API key.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use juno_core::index::{BoxEmbedder, BoxVectorIndex, IndexerOptions, RepositoryIndexer, Retriever};
use juno_core::llm::box_provider::BoxLlmProvider;
use juno_core::prompt::UserProfile;
use juno_infra::config::load_effective_config;
use juno_infra::embedding::OpenAiEmbedder;
use juno_infra::llm::openai::OpenAiProvider;
use juno_infra::vector::LanceVectorIndex;
use juno_infra::workspace::{Workspace, data_dir};
use juno_types::config::JunoConfig;

/// Shared state for every command.
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: JunoConfig,
    pub workspace: Workspace,
}

impl AppState {
    /// Load configuration and resolve the workspace rooted at `root`
    /// (the current directory when `None`).
    pub async fn init(root: Option<&Path>) -> Result<Self> {
        let data_dir = data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let config = load_effective_config(&data_dir).await;

        let root = match root {
            Some(root) => root.to_path_buf(),
            None => std::env::current_dir().context("Failed to read the current directory")?,
        };
        let workspace = Workspace::resolve(&root, &data_dir)
            .with_context(|| format!("Failed to open workspace {}", root.display()))?;

        Ok(Self {
            data_dir,
            config,
            workspace,
        })
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            user_name: self.config.user_name.clone(),
            assistant_name: self.config.assistant_name.clone(),
        }
    }

    /// Model for a run: the explicit override, then the workspace choice,
    /// then the configured default.
    pub async fn model(&self, requested: Option<&str>) -> String {
        let state = self.workspace.load_state().await;
        resolve_model(requested, state.selected_model.as_deref(), &self.config.model)
    }

    /// Chat provider for the configured endpoint. Fails with the missing
    /// settings when the configuration is incomplete.
    pub fn provider(&self) -> Result<BoxLlmProvider> {
        self.config.validate()?;
        let api_key = self.config.require_api_key()?.clone();
        let provider = OpenAiProvider::new(api_key, self.config.base_url.clone())
            .context("Failed to create LLM provider")?;
        Ok(BoxLlmProvider::new(provider))
    }

    pub fn embedder(&self) -> Result<BoxEmbedder> {
        self.config.validate()?;
        let api_key = self.config.require_api_key()?.clone();
        let embedder = OpenAiEmbedder::new(api_key, &self.config.base_url, &self.config.embedding)
            .context("Failed to create embedding client")?;
        Ok(BoxEmbedder::new(embedder))
    }

    /// The workspace's vector index. Opening does not create the table.
    pub async fn vector_index(&self) -> Result<BoxVectorIndex> {
        let index = LanceVectorIndex::open(
            self.workspace.vectors_dir(),
            self.config.embedding.dimension,
            self.config.embedding.model.clone(),
        )
        .await
        .context("Failed to open the vector index")?;
        Ok(BoxVectorIndex::new(index))
    }

    pub async fn indexer(&self) -> Result<RepositoryIndexer> {
        let options = IndexerOptions::from_config(&self.config.indexing, &self.config.embedding);
        Ok(RepositoryIndexer::new(
            self.embedder()?,
            self.vector_index().await?,
            options,
        ))
    }

    pub async fn retriever(&self) -> Result<Retriever> {
        Ok(Retriever::new(self.embedder()?, self.vector_index().await?))
    }
}

fn resolve_model(requested: Option<&str>, selected: Option<&str>, configured: &str) -> String {
    requested
        .or(selected)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(configured)
        .to_string()
}
