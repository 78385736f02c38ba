//! Retrieval over the repository index, and the `getContext` tool.

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::debug;

use juno_types::index::{CONTEXT_TOP_K, EmbeddingError, IndexError, RankedResult};
use juno_types::tool::ToolDescriptor;

use super::box_embedder::BoxEmbedder;
use super::box_vector::BoxVectorIndex;
use super::format::format_results;
use crate::tools::{Tool, ToolFailure};

/// Embeds query text and looks it up in the index.
#[derive(Debug, Clone)]
pub struct Retriever {
    embedder: BoxEmbedder,
    index: BoxVectorIndex,
}

impl Retriever {
    pub fn new(embedder: BoxEmbedder, index: BoxVectorIndex) -> Self {
        Self { embedder, index }
    }

    /// The `top_k` chunks closest to `query`, nearest first.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RankedResult>, IndexError> {
        if top_k == 0 {
            return Err(IndexError::InvalidArgument("top_k must be at least 1".to_string()));
        }
        if !self.index.exists().await? {
            return Err(IndexError::NotFound);
        }

        let vector = self.embedder.embed_one(query).await?;
        let results = self.index.query(&vector, top_k).await?;
        debug!(query, results = results.len(), "retrieved context");
        Ok(results)
    }

    /// [`search`](Self::search), rendered as one context block.
    pub async fn context(&self, query: &str, top_k: usize) -> Result<String, IndexError> {
        Ok(format_results(&self.search(query, top_k).await?))
    }
}

/// Arguments of the `getContext` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetContextArgs {
    /// keyword to search for
    pub query: String,
}

/// Lets the model search the repository index.
pub struct GetContextTool {
    retriever: Retriever,
    top_k: usize,
}

impl GetContextTool {
    pub const NAME: &'static str = "getContext";

    pub fn new(retriever: Retriever) -> Self {
        Self {
            retriever,
            top_k: CONTEXT_TOP_K,
        }
    }

    fn parameters() -> serde_json::Value {
        let schema = schemars::schema_for!(GetContextArgs);
        let mut value = serde_json::to_value(schema)
            .unwrap_or_else(|_| serde_json::json!({ "type": "object" }));
        if let Some(object) = value.as_object_mut() {
            object.remove("$schema");
            object.remove("title");
        }
        value
    }
}

impl Tool for GetContextTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: Self::NAME.to_string(),
            description: "Search the repository for additional context".to_string(),
            parameters: Self::parameters(),
        }
    }

    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolFailure> {
        let args: GetContextArgs =
            serde_json::from_value(args).map_err(|e| ToolFailure::fatal(anyhow::Error::new(e)))?;

        match self.retriever.context(&args.query, self.top_k).await {
            Ok(context) => Ok(serde_json::Value::String(context)),
            // Transient provider trouble; the model may rephrase or retry.
            Err(IndexError::EmbeddingProvider(
                err @ (EmbeddingError::Request(_) | EmbeddingError::RateLimited),
            )) => Err(ToolFailure::retryable(anyhow::Error::new(err))),
            Err(err) => Err(ToolFailure::fatal(anyhow::Error::new(err))),
        }
    }

    fn describe_invocation(&self, args: &serde_json::Value) -> Option<String> {
        let query = args.get("query").and_then(|q| q.as_str())?;
        Some(format!("gathering data: {query}"))
    }
}
