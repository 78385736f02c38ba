//! `models`: list the chat models and pick one per workspace.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Select;

use juno_types::llm::{KNOWN_MODELS, ModelInfo};

use super::present::OutputMode;
use crate::state::AppState;

pub async fn models(state: &AppState, select: bool, mode: OutputMode) -> Result<()> {
    let current = state.model(None).await;
    if select {
        return select_model(state, &current, mode).await;
    }

    if mode == OutputMode::Json {
        let models: Vec<_> = KNOWN_MODELS
            .iter()
            .map(|m| {
                serde_json::json!({
                    "id": m.id,
                    "context_window": m.context_window,
                    "function_calling": m.function_calling,
                    "selected": m.id == current,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&models)?);
        return Ok(());
    }

    println!();
    println!("{}", models_table(KNOWN_MODELS, &current));
    if !KNOWN_MODELS.iter().any(|m| m.id == current) {
        println!("  Current model: {}", style(&current).cyan());
    }
    println!();
    Ok(())
}

async fn select_model(state: &AppState, current: &str, mode: OutputMode) -> Result<()> {
    if mode == OutputMode::Json || !console::user_attended() {
        anyhow::bail!("`juno models --select` needs an interactive terminal");
    }

    let items: Vec<String> = KNOWN_MODELS
        .iter()
        .map(|m| format!("{} ({} tokens)", m.id, m.context_window))
        .collect();
    let default = KNOWN_MODELS.iter().position(|m| m.id == current).unwrap_or(0);

    let choice = Select::new()
        .with_prompt("Model for this workspace")
        .items(&items)
        .default(default)
        .interact()?;
    let model = KNOWN_MODELS[choice].id;

    let mut workspace_state = state.workspace.load_state().await;
    workspace_state.selected_model = Some(model.to_string());
    state
        .workspace
        .save_state(&workspace_state)
        .await
        .context("Failed to save the workspace model")?;

    println!("  {} Using {} in this workspace.", style("✓").green().bold(), style(model).cyan());
    Ok(())
}

fn models_table(models: &[ModelInfo], current: &str) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("").fg(Color::White),
        Cell::new("Model").fg(Color::White),
        Cell::new("Context").fg(Color::White),
        Cell::new("Functions").fg(Color::White),
    ]);

    for model in models {
        let marker = if model.id == current {
            Cell::new("*").fg(Color::Green)
        } else {
            Cell::new("")
        };
        let functions = if model.function_calling {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            marker,
            Cell::new(model.id).fg(Color::Cyan),
            Cell::new(model.context_window),
            functions,
        ]);
    }
    table
}
