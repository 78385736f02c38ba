//! Workspace file enumeration.
//!
//! Walks the workspace with `ignore` (so `.gitignore`, `.ignore` and hidden
//! files are honoured), then applies the configured include/exclude globs
//! (compiled with `globset`) on top of a built-in exclude list. Files that are not valid UTF-8 are
//! treated as binary and skipped.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use thiserror::Error;
use tracing::{debug, trace};

use juno_types::config::IndexingConfig;
use juno_types::index::SourceFile;

use crate::workspace::{Workspace, language_id};

/// Always excluded, whatever the configuration says.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/node_modules/**",
    "**/.git/**",
    "**/target/**",
    "**/dist/**",
    "**/out/**",
    "**/build/**",
    "**/__pycache__/**",
    "**/.venv/**",
    "*.lock",
    "package-lock.json",
    "*.min.js",
    "*.map",
    "*.{png,jpg,jpeg,gif,ico,svg,webp,pdf,zip,gz,tar,woff,woff2,ttf,eot,mp3,mp4,wasm,so,dll,exe}",
];

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to walk workspace: {0}")]
    Walk(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is outside the workspace")]
    OutsideWorkspace(PathBuf),

    #[error("invalid glob pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },
}

/// Include/exclude rules for indexable files.
#[derive(Debug, Clone)]
pub struct FileFilter {
    /// `None` admits every file.
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl FileFilter {
    /// Configured patterns plus [`DEFAULT_EXCLUDES`].
    pub fn from_config(config: &IndexingConfig) -> Result<Self, ScanError> {
        let include = if config.include.is_empty() {
            None
        } else {
            Some(glob_set(config.include.iter().map(String::as_str))?)
        };
        let exclude = glob_set(
            DEFAULT_EXCLUDES
                .iter()
                .copied()
                .chain(config.exclude.iter().map(String::as_str)),
        )?;
        Ok(Self { include, exclude })
    }

    /// Whether the workspace-relative `path` should be indexed.
    pub fn accepts(&self, path: &str) -> bool {
        let included = self.include.as_ref().is_none_or(|set| set.is_match(path));
        included && !self.exclude.is_match(path)
    }
}

/// Compile patterns matched against `/`-separated relative paths.
///
/// `*` stays within one path segment and `**` spans any number of them. A
/// pattern without `/` applies at any depth, as in `.gitignore`.
fn glob_set<'a>(patterns: impl Iterator<Item = &'a str>) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let anchored = if pattern.contains('/') {
            pattern.to_string()
        } else {
            format!("**/{pattern}")
        };
        let glob = GlobBuilder::new(&anchored)
            .literal_separator(true)
            .build()
            .map_err(|e| ScanError::Pattern {
                pattern: pattern.to_string(),
                reason: e.kind().to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ScanError::Pattern {
        pattern: e.glob().unwrap_or_default().to_string(),
        reason: e.kind().to_string(),
    })
}

/// Workspace-relative paths of every indexable file, sorted.
pub fn list_files(workspace: &Workspace, filter: &FileFilter) -> Result<Vec<String>, ScanError> {
    let mut files = Vec::new();
    for entry in WalkBuilder::new(workspace.root()).build() {
        let entry = entry.map_err(|e| ScanError::Walk(e.to_string()))?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Some(relative) = workspace.relative_path(entry.path()) else {
            continue;
        };
        if filter.accepts(&relative) {
            files.push(relative);
        } else {
            trace!(path = %relative, "excluded by filter");
        }
    }
    files.sort();
    debug!(files = files.len(), root = %workspace.root().display(), "enumerated workspace");
    Ok(files)
}

/// Read one file for indexing.
///
/// `path` may be absolute or workspace-relative. Returns `Ok(None)` for
/// files that are not UTF-8 text.
pub async fn read_source_file(
    workspace: &Workspace,
    path: &Path,
) -> Result<Option<SourceFile>, ScanError> {
    let relative = workspace
        .relative_path(path)
        .ok_or_else(|| ScanError::OutsideWorkspace(path.to_path_buf()))?;
    let absolute = workspace.root().join(&relative);

    match tokio::fs::read_to_string(&absolute).await {
        Ok(content) => Ok(Some(SourceFile {
            language_id: language_id(&absolute).to_string(),
            path: relative,
            content,
        })),
        Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
            debug!(path = %relative, "skipping binary file");
            Ok(None)
        }
        Err(source) => Err(ScanError::Read {
            path: relative,
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn filter(include: &[&str], exclude: &[&str]) -> FileFilter {
        let config = IndexingConfig {
            include: include.iter().map(|p| p.to_string()).collect(),
            exclude: exclude.iter().map(|p| p.to_string()).collect(),
            ..IndexingConfig::default()
        };
        FileFilter::from_config(&config).unwrap()
    }

    #[test]
    fn test_path_globs() {
        let filter = filter(&["src/*.rs", "docs/**/*.md", "file?.txt", "[a-c]at.sh"], &[]);
        assert!(filter.accepts("src/lib.rs"));
        assert!(!filter.accepts("src/index/mod.rs"));
        assert!(filter.accepts("docs/guide/intro.md"));
        assert!(filter.accepts("docs/intro.md"));
        assert!(filter.accepts("deep/file1.txt"));
        assert!(filter.accepts("bat.sh"));
        assert!(!filter.accepts("rat.sh"));
    }

    #[test]
    fn test_default_excludes() {
        let everything = filter(&[], &[]);
        assert!(!everything.accepts("web/node_modules/react/index.js"));
        assert!(!everything.accepts("node_modules/x.js"));
        assert!(!everything.accepts("deep/dir/Cargo.lock"));
        assert!(!everything.accepts("assets/logo.png"));
        assert!(everything.accepts("src/lockfile.rs"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let config = IndexingConfig {
            exclude: vec!["src/[".to_string()],
            ..IndexingConfig::default()
        };
        assert!(matches!(
            FileFilter::from_config(&config),
            Err(ScanError::Pattern { ref pattern, .. }) if pattern == "src/["
        ));
    }

    #[test]
    fn test_filter() {
        let config = IndexingConfig {
            include: vec!["src/**".to_string(), "*.md".to_string()],
            exclude: vec!["**/generated/**".to_string()],
            ..IndexingConfig::default()
        };
        let filter = FileFilter::from_config(&config).unwrap();
        assert!(filter.accepts("src/main.rs"));
        assert!(filter.accepts("README.md"));
        assert!(!filter.accepts("scripts/run.sh"));
        assert!(!filter.accepts("src/generated/api.rs"));
        assert!(!filter.accepts("src/logo.png"));

        let everything = FileFilter::from_config(&IndexingConfig::default()).unwrap();
        assert!(everything.accepts("scripts/run.sh"));
        assert!(!everything.accepts("target/debug/build.rs"));
    }

    #[tokio::test]
    async fn test_list_and_read_files() {
        let root = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("src")).unwrap();
        std::fs::create_dir_all(root.path().join("node_modules/pkg")).unwrap();
        std::fs::write(root.path().join("src/lib.rs"), "pub fn a() {}\n").unwrap();
        std::fs::write(root.path().join("src/blob.bin"), [0xff, 0xfe, 0x00]).unwrap();
        std::fs::write(root.path().join("node_modules/pkg/index.js"), "x").unwrap();
        std::fs::write(root.path().join("README.md"), "# hi").unwrap();

        let workspace = Workspace::resolve(root.path(), data.path()).unwrap();
        let files = list_files(&workspace, &FileFilter::from_config(&IndexingConfig::default()).unwrap()).unwrap();
        assert_eq!(files, vec!["README.md", "src/blob.bin", "src/lib.rs"]);

        let source = read_source_file(&workspace, Path::new("src/lib.rs"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(source.path, "src/lib.rs");
        assert_eq!(source.language_id, "rust");
        assert_eq!(source.content, "pub fn a() {}\n");

        assert!(read_source_file(&workspace, Path::new("src/blob.bin")).await.unwrap().is_none());
        assert!(matches!(
            read_source_file(&workspace, Path::new("/definitely/elsewhere.rs")).await,
            Err(ScanError::OutsideWorkspace(_))
        ));
    }
}
