//! Notebook discovery under a scan root

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extension of notebooks.
pub const NOTEBOOK_EXTENSION: &str = "ipynb";

/// Jupyter's autosave copies; excluded unless the configuration says otherwise.
pub const DEFAULT_EXCLUDE: &str = "**/.ipynb_checkpoints/**";

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("path does not exist: {0}")]
    NotFound(PathBuf),

    #[error("not a notebook file or a directory: {0}")]
    InvalidInput(PathBuf),

    #[error("invalid exclude pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("notebook discovery failed: {0}")]
    Discovery(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    File,
    Directory,
}

/// A validated scan root.
#[derive(Debug, Clone)]
pub struct ScanRoot {
    /// Canonical path of the file or directory given.
    pub path: PathBuf,
    /// Directory notebook paths are reported relative to.
    pub base: PathBuf,
    pub kind: RootKind,
}

impl ScanRoot {
    /// Accepts an existing notebook file or an existing directory.
    pub fn resolve(path: &Path) -> Result<Self, ScanError> {
        let canonical =
            std::fs::canonicalize(path).map_err(|_| ScanError::NotFound(path.to_path_buf()))?;

        if canonical.is_dir() {
            return Ok(ScanRoot {
                base: canonical.clone(),
                path: canonical,
                kind: RootKind::Directory,
            });
        }

        if canonical.is_file() && is_notebook(&canonical) {
            let base = canonical
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("/"));
            return Ok(ScanRoot {
                path: canonical,
                base,
                kind: RootKind::File,
            });
        }

        Err(ScanError::InvalidInput(path.to_path_buf()))
    }

    /// Path of a discovered notebook relative to the base directory.
    pub fn relative(&self, notebook: &Path) -> PathBuf {
        match notebook.strip_prefix(&self.base) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => notebook.to_path_buf(),
        }
    }
}

pub fn is_notebook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e == NOTEBOOK_EXTENSION)
}

/// Compile exclude patterns, matched against root-relative paths.
pub fn build_excludes(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| ScanError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ScanError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}

/// Every notebook under the root, sorted. A file root yields itself.
///
/// VCS ignore files and hidden-file filtering are off: any
/// notebook on disk counts unless an exclude pattern matches it.
/// A symlink to a notebook file is reported under the link's path.
pub fn discover(root: &ScanRoot, excludes: &GlobSet) -> Vec<PathBuf> {
    if root.kind == RootKind::File {
        return vec![root.path.clone()];
    }

    let mut found = Vec::new();
    let walker = WalkBuilder::new(&root.path)
        .standard_filters(false)
        .follow_links(false)
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Cannot read entry under {}: {}", root.path.display(), e);
                continue;
            }
        };

        let path = entry.path();
        // Follows file links; directory links are never descended into.
        if !is_notebook(path) || !path.is_file() {
            continue;
        }
        if excludes.is_match(root.relative(path)) {
            tracing::debug!("Excluded notebook: {}", path.display());
            continue;
        }
        found.push(path.to_path_buf());
    }

    found.sort();
    found
}
