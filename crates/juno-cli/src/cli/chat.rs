//! Preset conversations: `ask`, `code` and `improve`.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use tokio_util::sync::CancellationToken;
use tracing::info;

use juno_core::conversation::{ConversationEngine, ConversationOptions};
use juno_core::prompt::{EditorContext, Preset};
use juno_infra::workspace::language_id;
use juno_types::error::ConversationError;
use juno_types::llm::Message;

use super::EditorArgs;
use super::present::{OutputMode, Presenter, print_turn_separator};
use crate::state::AppState;

/// Run a preset conversation, offering follow-up questions where the preset
/// allows them.
pub async fn run_preset(
    state: &AppState,
    preset: Preset,
    prompt: Option<String>,
    editor: EditorArgs,
    mode: OutputMode,
    cancel: &CancellationToken,
) -> Result<()> {
    let provider = state.provider()?;
    let model = state.model(editor.model.as_deref()).await;
    let context = editor_context(editor.file.as_deref(), editor.language.as_deref()).await?;

    let first = match (preset.seed_message(), prompt) {
        (Some(seed), _) => seed.to_string(),
        (None, Some(prompt)) => prompt,
        (None, None) => ask_user("You", mode)?.context("A prompt is required")?,
    };

    let engine = ConversationEngine::new(provider);
    let options = ConversationOptions {
        model,
        temperature: state.config.temperature,
        functions: Vec::new(),
    };
    info!(preset = ?preset, model = %options.model, "starting conversation");

    let mut history = vec![
        preset.system_message(&state.profile(), &context),
        Message::user(first),
    ];
    let follow_ups = preset.has_follow_ups() && !editor.no_follow_up;

    loop {
        let (observer, presenter) = Presenter::start(mode);
        let result = engine.run(&history, &options, &observer, cancel).await;
        drop(observer);
        presenter.finish().await;

        match result {
            Ok(completion) => history.push(Message::assistant(completion.text)),
            Err(ConversationError::Cancelled) => {
                eprintln!("  {}", style("Cancelled.").dim());
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }

        if !follow_ups || cancel.is_cancelled() {
            return Ok(());
        }
        print_turn_separator(mode);
        match ask_user("Follow up (empty to finish)", mode)? {
            Some(next) => history.push(Message::user(next)),
            None => return Ok(()),
        }
    }
}

/// Prompt for a line of input. Returns `None` for an empty answer or when
/// the output is not interactive.
pub fn ask_user(prompt: &str, mode: OutputMode) -> Result<Option<String>> {
    if mode == OutputMode::Json || !console::user_attended() {
        return Ok(None);
    }
    let answer: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    let answer = answer.trim();
    Ok((!answer.is_empty()).then(|| answer.to_string()))
}

/// Editor context from an optional scratchpad file and language.
///
/// The language defaults to the scratchpad's language when the file type is
/// recognised.
pub async fn editor_context(file: Option<&Path>, language: Option<&str>) -> Result<EditorContext> {
    let scratchpad = match file {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => None,
    };
    let language = language
        .map(str::to_string)
        .or_else(|| file.map(language_id).filter(|id| *id != "plaintext").map(str::to_string));
    Ok(EditorContext { language, scratchpad })
}
