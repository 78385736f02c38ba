//! In-process fakes shared by the unit tests of this crate.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use juno_types::index::{EmbeddingError, IndexError, IndexedItem, RankedResult};
use juno_types::llm::{CompletionRequest, LlmError, StreamEvent};
use juno_types::tool::ToolDescriptor;

use crate::conversation::ConversationObserver;
use crate::index::vector::{check_dimension, cosine_distance};
use crate::index::{Embedder, VectorIndex};
use crate::llm::provider::{EventStream, LlmProvider};
use crate::tools::{Tool, ToolFailure};

pub fn delta(text: &str) -> StreamEvent {
    StreamEvent::Delta {
        text: text.to_string(),
    }
}

pub fn done() -> StreamEvent {
    StreamEvent::Done
}

/// Events of a completion that requests one function call.
pub fn function_call(name: &str, arguments: &str) -> Vec<Result<StreamEvent, LlmError>> {
    vec![
        Ok(StreamEvent::FunctionCallDelta {
            index: 0,
            name: Some(name.to_string()),
            arguments: arguments.to_string(),
        }),
        Ok(StreamEvent::Finish {
            reason: juno_types::llm::FinishReason::FunctionCall,
        }),
    ]
}

type Script = Vec<Result<StreamEvent, LlmError>>;

enum Scripts {
    Queue(VecDeque<Script>),
    Repeat(Box<dyn Fn() -> Script + Send + Sync>),
    Hang(Option<Vec<StreamEvent>>),
}

/// Provider that replays canned event streams, one per request.
pub struct ScriptedProvider {
    scripts: Mutex<Scripts>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedProvider {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self::with(Scripts::Queue(scripts.into()))
    }

    /// Every request gets a fresh copy of `script()`.
    pub fn repeating(script: impl Fn() -> Script + Send + Sync + 'static) -> Self {
        Self::with(Scripts::Repeat(Box::new(script)))
    }

    /// The first request yields `events` and then never finishes.
    pub fn hanging_after(events: Vec<StreamEvent>) -> Self {
        Self::with(Scripts::Hang(Some(events)))
    }

    fn with(scripts: Scripts) -> Self {
        Self {
            scripts: Mutex::new(scripts),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        self.requests.clone()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        self.requests.lock().unwrap().push(request);
        let mut scripts = self.scripts.lock().unwrap();
        match &mut *scripts {
            Scripts::Queue(queue) => {
                let script = queue.pop_front().unwrap_or_else(|| {
                    vec![Err(LlmError::Provider {
                        message: "no scripted response left".to_string(),
                    })]
                });
                Box::pin(futures_util::stream::iter(script))
            }
            Scripts::Repeat(script) => Box::pin(futures_util::stream::iter(script())),
            Scripts::Hang(events) => {
                let events = events.take().unwrap_or_default();
                Box::pin(async_stream::stream! {
                    for event in events {
                        yield Ok::<StreamEvent, LlmError>(event);
                    }
                    futures_util::future::pending::<()>().await;
                })
            }
        }
    }
}

/// Observer that records every callback as a short string.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ConversationObserver for RecordingObserver {
    fn on_start(&self) {
        self.push("start".to_string());
    }

    fn on_chunk(&self, delta: &str) {
        self.push(format!("chunk:{delta}"));
    }

    fn on_update(&self, text: &str) {
        self.push(format!("update:{text}"));
    }

    fn on_end(&self, text: &str) {
        self.push(format!("end:{text}"));
    }

    fn on_error(&self, error: &LlmError) {
        self.push(format!("error:{error}"));
    }

    fn on_function_call(&self, description: &str) {
        self.push(format!("function:{description}"));
    }
}

/// Returns its arguments unchanged.
pub struct EchoTool;

impl Tool for EchoTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "echo".to_string(),
            description: "Echo the arguments".to_string(),
            parameters: serde_json::json!({ "type": "object" }),
        }
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolFailure> {
        Ok(args)
    }

    fn describe_invocation(&self, args: &Value) -> Option<String> {
        Some(format!("echoing {args}"))
    }
}

/// Always fails with a non-retryable error.
pub struct FailingTool;

impl Tool for FailingTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "fail".to_string(),
            description: "Always fails".to_string(),
            parameters: serde_json::json!({ "type": "object" }),
        }
    }

    async fn execute(&self, _args: Value) -> Result<Value, ToolFailure> {
        Err(ToolFailure::fatal(anyhow::anyhow!("disk on fire")))
    }
}

/// Never finishes.
pub struct StuckTool;

impl Tool for StuckTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "stuck".to_string(),
            description: "Waits forever".to_string(),
            parameters: serde_json::json!({ "type": "object" }),
        }
    }

    async fn execute(&self, _args: Value) -> Result<Value, ToolFailure> {
        futures_util::future::pending::<()>().await;
        Ok(Value::Null)
    }
}

/// Deterministic bag-of-bytes embedder.
#[derive(Clone, Default)]
pub struct FakeEmbedder {
    fail_on: Option<String>,
}

impl FakeEmbedder {
    pub const DIMENSION: usize = 8;

    pub fn new() -> Self {
        Self::default()
    }

    /// Fails any request that contains `text`.
    pub fn failing_on(text: &str) -> Self {
        Self {
            fail_on: Some(text.to_string()),
        }
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; Self::DIMENSION];
        for byte in text.bytes() {
            vector[byte as usize % Self::DIMENSION] += 1.0;
        }
        vector[Self::DIMENSION - 1] += 0.5;
        vector
    }
}

impl Embedder for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if let Some(bad) = &self.fail_on {
            if texts.iter().any(|t| t == bad) {
                return Err(EmbeddingError::Request(format!("refusing to embed '{bad}'")));
            }
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn model_name(&self) -> &str {
        "fake-embedding"
    }

    fn dimension(&self) -> usize {
        Self::DIMENSION
    }
}

#[derive(Default)]
struct MemoryState {
    created: bool,
    next_seq: u64,
    items: Vec<(u64, IndexedItem)>,
}

/// Brute-force in-memory vector index with the same contract as the LanceDB one.
#[derive(Clone)]
pub struct MemoryVectorIndex {
    dimension: usize,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryVectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    /// Stored items in insertion order.
    pub fn items(&self) -> Vec<IndexedItem> {
        let state = self.state.lock().unwrap();
        state.items.iter().map(|(_, item)| item.clone()).collect()
    }
}

impl VectorIndex for MemoryVectorIndex {
    async fn ensure_created(&self) -> Result<(), IndexError> {
        self.state.lock().unwrap().created = true;
        Ok(())
    }

    async fn exists(&self) -> Result<bool, IndexError> {
        Ok(self.state.lock().unwrap().created)
    }

    async fn insert(&self, item: &IndexedItem) -> Result<(), IndexError> {
        check_dimension(self.dimension, &item.vector)?;
        let mut state = self.state.lock().unwrap();
        state.created = true;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.items.push((seq, item.clone()));
        Ok(())
    }

    async fn delete_file(&self, file_path: &str) -> Result<usize, IndexError> {
        let mut state = self.state.lock().unwrap();
        let before = state.items.len();
        state.items.retain(|(_, item)| item.metadata.file_path != file_path);
        Ok(before - state.items.len())
    }

    async fn file_hash(&self, file_path: &str) -> Result<Option<String>, IndexError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .items
            .iter()
            .find(|(_, item)| item.metadata.file_path == file_path)
            .map(|(_, item)| item.metadata.content_hash.clone()))
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RankedResult>, IndexError> {
        if top_k == 0 {
            return Err(IndexError::InvalidArgument("top_k must be at least 1".to_string()));
        }
        let state = self.state.lock().unwrap();
        if !state.created {
            return Err(IndexError::NotFound);
        }
        check_dimension(self.dimension, vector)?;

        let mut ranked: Vec<(f32, u64, &IndexedItem)> = state
            .items
            .iter()
            .map(|(seq, item)| (cosine_distance(vector, &item.vector), *seq, item))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        Ok(ranked
            .into_iter()
            .take(top_k)
            .map(|(distance, _, item)| RankedResult {
                metadata: item.metadata.clone(),
                distance,
            })
            .collect())
    }

    async fn delete_index(&self) -> Result<(), IndexError> {
        let mut state = self.state.lock().unwrap();
        state.items.clear();
        state.created = false;
        Ok(())
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.state.lock().unwrap().items.len())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
