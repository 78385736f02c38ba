//! Workspace status dashboard.

use anyhow::Result;
use console::style;

use super::present::OutputMode;
use crate::state::AppState;

/// Show configuration, workspace and index state.
pub async fn status(state: &AppState, mode: OutputMode) -> Result<()> {
    let model = state.model(None).await;
    let index = state.vector_index().await?;
    let indexed = index.exists().await?;
    let chunks = if indexed { index.count().await? } else { 0 };
    let api_key_set = state.config.api_key.is_some();

    if mode == OutputMode::Json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspace": state.workspace.root().display().to_string(),
            "storage_dir": state.workspace.storage_dir().display().to_string(),
            "config_file": state.config_path().display().to_string(),
            "model": model,
            "api_key_set": api_key_set,
            "index": {
                "exists": indexed,
                "chunks": chunks,
                "embedding_model": state.config.embedding.model,
                "dimension": state.config.embedding.dimension,
            },
            "active_indexing": state.config.indexing.active_indexing,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let check_mark = |ok: bool| {
        if ok {
            format!("{}", style("✓").green())
        } else {
            format!("{}", style("✗").red())
        }
    };

    println!();
    println!("  {} Juno v{}", style("⚡").bold(), env!("CARGO_PKG_VERSION"));
    println!();

    println!("  {}", style("── Workspace ──").dim());
    println!("  Root:    {}", style(state.workspace.root().display()).cyan());
    println!("  Storage: {}", style(state.workspace.storage_dir().display()).dim());
    println!();

    println!("  {}", style("── Model ──").dim());
    println!("  Chat:    {}", style(&model).bold());
    println!("  {} API key configured", check_mark(api_key_set));
    println!();

    println!("  {}", style("── Index ──").dim());
    println!("  {} Indexed", check_mark(indexed));
    if indexed {
        println!("  Chunks:     {}", style(chunks).bold());
    }
    println!(
        "  Embeddings: {} ({} dims)",
        state.config.embedding.model, state.config.embedding.dimension
    );
    println!(
        "  {} Active indexing",
        check_mark(state.config.indexing.active_indexing)
    );
    println!();

    println!("  {}", style("── System ──").dim());
    println!("  Config: {}", style(state.config_path().display()).dim());
    println!();

    Ok(())
}
