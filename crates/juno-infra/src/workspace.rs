//! Per-workspace storage.
//!
//! Everything Juno persists for a workspace lives under
//! `<data dir>/juno/workspaces/<key>/`, where the key is derived from the
//! canonical workspace path:
//!
//! ```text
//! workspaces/<key>/
//!   vectors/      LanceDB database with the `chunks` table
//!   state.json    selected model and other workspace state
//! ```

use std::io;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Root of all Juno data: `dirs::data_dir()/juno`, or `./.juno` when the
/// platform has no data directory.
pub fn data_dir() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join("juno"),
        None => PathBuf::from(".juno"),
    }
}

/// Storage locations of one workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    storage: PathBuf,
}

impl Workspace {
    /// Resolve the storage directory of the workspace at `root`.
    pub fn resolve(root: &Path, data_dir: &Path) -> io::Result<Self> {
        let root = root.canonicalize()?;
        let storage = data_dir.join("workspaces").join(workspace_key(&root));
        Ok(Self { root, storage })
    }

    /// Canonical workspace directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage
    }

    pub fn vectors_dir(&self) -> PathBuf {
        self.storage.join("vectors")
    }

    pub fn state_file(&self) -> PathBuf {
        self.storage.join("state.json")
    }

    /// Workspace-relative, `/`-separated form of `path`.
    ///
    /// Returns `None` for paths outside the workspace.
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.root).ok()?.to_path_buf()
        } else {
            path.to_path_buf()
        };
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        (!parts.is_empty()).then(|| parts.join("/"))
    }

    /// Load the persisted workspace state; missing or unreadable state is empty.
    pub async fn load_state(&self) -> WorkspaceState {
        let path = self.state_file();
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                tracing::warn!("Failed to parse {}: {err}, starting fresh", path.display());
                WorkspaceState::default()
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => WorkspaceState::default(),
            Err(err) => {
                tracing::warn!("Failed to read {}: {err}, starting fresh", path.display());
                WorkspaceState::default()
            }
        }
    }

    pub async fn save_state(&self, state: &WorkspaceState) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.storage).await?;
        let json = serde_json::to_string_pretty(state).map_err(io::Error::other)?;
        tokio::fs::write(self.state_file(), json).await
    }
}

/// First 16 hex digits of the SHA-256 of the workspace path.
pub fn workspace_key(root: &Path) -> String {
    let digest = Sha256::digest(root.to_string_lossy().as_bytes());
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

/// Workspace-scoped settings chosen interactively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceState {
    /// Chat model picked with `juno models --select`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_model: Option<String>,
}

/// Editor-style language identifier for a file, from its name.
pub fn language_id(path: &Path) -> &'static str {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match name.as_str() {
        "dockerfile" => return "dockerfile",
        "makefile" => return "makefile",
        "cargo.lock" => return "toml",
        _ => {}
    }

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "rs" => "rust",
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "typescriptreact",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "javascriptreact",
        "py" => "python",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "scala" => "scala",
        "sh" | "bash" | "zsh" => "shellscript",
        "ps1" => "powershell",
        "sql" => "sql",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "less" => "less",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        "md" | "markdown" => "markdown",
        "vue" => "vue",
        "svelte" => "svelte",
        "lua" => "lua",
        "dart" => "dart",
        "ex" | "exs" => "elixir",
        "hs" => "haskell",
        "r" => "r",
        _ => "plaintext",
    }
}
