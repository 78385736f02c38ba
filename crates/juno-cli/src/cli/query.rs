//! `query`: repository questions answered through the `getContext` function.

use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;
use dialoguer::Confirm;
use tokio_util::sync::CancellationToken;
use tracing::info;

use juno_core::conversation::{ConversationEngine, FunctionCallLoop, LoopOptions};
use juno_core::index::GetContextTool;
use juno_core::prompt::{QUERY_REPOSITORY_SYSTEM, query_repository_prompt};
use juno_core::tools::ToolRegistry;
use juno_types::llm::{
    FUNCTION_CALLING_MODEL, FUNCTION_CALLING_TEMPERATURE, KNOWN_MODELS, Message,
};

use super::chat::ask_user;
use super::index::index_workspace;
use super::present::{OutputMode, Presenter, print_turn_separator};
use crate::state::AppState;

const MISSING_INDEX_MESSAGE: &str = "Vector database needs to be indexed first";

pub async fn query_repository(
    state: &AppState,
    question: Option<String>,
    model: Option<&str>,
    no_follow_up: bool,
    mode: OutputMode,
    cancel: &CancellationToken,
) -> Result<()> {
    if !ensure_index(state, mode, cancel).await? {
        return Ok(());
    }

    let question = match question {
        Some(question) => question,
        None => ask_user("Question", mode)?.context("A question is required")?,
    };

    let model = function_calling_model(&state.model(model).await);
    let registry = ToolRegistry::new().with(GetContextTool::new(state.retriever().await?))?;
    let function_loop = FunctionCallLoop::new(
        ConversationEngine::new(state.provider()?),
        Arc::new(registry),
        LoopOptions {
            model,
            temperature: Some(FUNCTION_CALLING_TEMPERATURE),
            max_round_trips: state.config.max_round_trips,
        },
    );

    let mut history = vec![
        Message::system(QUERY_REPOSITORY_SYSTEM),
        Message::user(query_repository_prompt(&question)),
    ];

    loop {
        let (observer, presenter) = Presenter::start(mode);
        let result = function_loop.run(history, &observer, cancel).await;
        drop(observer);
        presenter.finish().await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) if err.is_cancelled() => {
                eprintln!("  {}", style("Cancelled.").dim());
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        info!(round_trips = outcome.round_trips, "repository question answered");
        history = outcome.history;

        if no_follow_up || cancel.is_cancelled() {
            return Ok(());
        }
        print_turn_separator(mode);
        match ask_user("Follow up (empty to finish)", mode)? {
            Some(next) => history.push(Message::user(query_repository_prompt(&next))),
            None => return Ok(()),
        }
    }
}

/// Make sure the index exists, offering to build it. Returns whether the
/// query can go ahead.
async fn ensure_index(state: &AppState, mode: OutputMode, cancel: &CancellationToken) -> Result<bool> {
    if state.vector_index().await?.exists().await? {
        return Ok(true);
    }

    eprintln!("  {} {MISSING_INDEX_MESSAGE}", style("!").yellow().bold());
    if mode == OutputMode::Json || !console::user_attended() {
        anyhow::bail!("{MISSING_INDEX_MESSAGE}; run `juno index`");
    }
    let create = Confirm::new()
        .with_prompt("Create Index?")
        .default(true)
        .interact()?;
    if !create {
        return Ok(false);
    }
    let report = index_workspace(state, mode, cancel).await?;
    Ok(!report.cancelled)
}

/// `model` if it is known to support function calling, or unknown to us;
/// otherwise the default function-calling model.
fn function_calling_model(model: &str) -> String {
    match KNOWN_MODELS.iter().find(|known| known.id == model) {
        Some(known) if !known.function_calling => {
            info!(model, fallback = FUNCTION_CALLING_MODEL, "model lacks function calling");
            FUNCTION_CALLING_MODEL.to_string()
        }
        _ => model.to_string(),
    }
}
