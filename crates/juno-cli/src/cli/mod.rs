//! CLI command definitions for the `juno` binary.
//!
//! Uses clap derive macros. Commands are verbs acting on the current
//! workspace (e.g. `juno ask`, `juno index`, `juno query`).

pub mod chat;
pub mod index;
pub mod models;
pub mod present;
pub mod query;
pub mod status;
pub mod watch;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// A coding assistant for your terminal, with semantic search over your repository.
#[derive(Parser)]
#[command(name = "juno", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Print stream events and results as JSON lines instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all log output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed logs (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write log lines as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true, env = "JUNO_OTEL")]
    pub otel: bool,

    /// Workspace root (defaults to the current directory).
    #[arg(long, short = 'C', global = true, env = "JUNO_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Editor context shared by the conversation commands.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct EditorArgs {
    /// File to show the model as the scratchpad.
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    /// Language of the code being worked on (defaults to the scratchpad's).
    #[arg(long, short)]
    pub language: Option<String>,

    /// Model override for this run.
    #[arg(long, short)]
    pub model: Option<String>,

    /// Answer once and exit without offering follow-up questions.
    #[arg(long)]
    pub no_follow_up: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a free-form question.
    Ask {
        /// The question (prompted for when omitted).
        prompt: Option<String>,

        #[command(flatten)]
        editor: EditorArgs,
    },

    /// Write code from instructions.
    Code {
        /// What to write (prompted for when omitted).
        prompt: Option<String>,

        #[command(flatten)]
        editor: EditorArgs,
    },

    /// Suggest improvements to a file.
    Improve {
        /// File to review.
        file: PathBuf,

        /// Language of the file (detected from its extension when omitted).
        #[arg(long, short)]
        language: Option<String>,

        /// Model override for this run.
        #[arg(long, short)]
        model: Option<String>,
    },

    /// Answer a question about the repository using the semantic index.
    Query {
        /// The question (prompted for when omitted).
        question: Option<String>,

        /// Model override for this run.
        #[arg(long, short)]
        model: Option<String>,

        /// Answer once and exit without offering follow-up questions.
        #[arg(long)]
        no_follow_up: bool,
    },

    /// Build or refresh the semantic index of the workspace.
    Index,

    /// Index (or re-index) a single file.
    #[command(name = "index-file")]
    IndexFile {
        /// File to index.
        path: PathBuf,
    },

    /// Delete the workspace's semantic index.
    #[command(name = "delete-index")]
    DeleteIndex {
        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// List known models, or pick the one this workspace uses.
    Models {
        /// Choose the workspace model interactively.
        #[arg(long)]
        select: bool,
    },

    /// Keep the index up to date while files change (needs `indexing.active_indexing`).
    Watch,

    /// Show configuration and index status for the workspace.
    Status,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

impl Cli {
    /// Default log filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,juno=debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_filters() {
        let cli = Cli::parse_from(["juno", "status"]);
        assert_eq!(cli.log_filter(), "warn");
        let cli = Cli::parse_from(["juno", "--quiet", "status"]);
        assert_eq!(cli.log_filter(), "error");
        let cli = Cli::parse_from(["juno", "-v", "status"]);
        assert_eq!(cli.log_filter(), "info,juno=debug");
        let cli = Cli::parse_from(["juno", "-vv", "status"]);
        assert_eq!(cli.log_filter(), "trace");
    }

    #[test]
    fn test_ask_with_editor_context() {
        let cli = Cli::parse_from(["juno", "ask", "why?", "--file", "src/lib.rs", "-m", "gpt-4", "--json"]);
        assert!(cli.json);
        let Commands::Ask { prompt, editor } = cli.command else {
            panic!("expected ask");
        };
        assert_eq!(prompt.as_deref(), Some("why?"));
        assert_eq!(editor.file, Some(PathBuf::from("src/lib.rs")));
        assert_eq!(editor.model.as_deref(), Some("gpt-4"));
        assert!(!editor.no_follow_up);
    }

    #[test]
    fn test_command_structure_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
