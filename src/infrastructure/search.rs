//! Glob-based file search
//!
//! Used to locate `version.json` and the `Dockerfile`, and to enumerate the
//! extracted tree before upload.

use crate::pipeline::{PipelineError, PipelineResult};
use std::path::{Component, Path, PathBuf};

const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "bin", "obj"];

fn expand(root: &Path, suffix: &str) -> PipelineResult<Vec<PathBuf>> {
    let pattern = format!(
        "{}/{suffix}",
        glob::Pattern::escape(&root.to_string_lossy()).trim_end_matches('/')
    );

    let entries = glob::glob(&pattern).map_err(|e| {
        PipelineError::Io(format!("invalid search pattern '{pattern}': {e}"))
    })?;

    Ok(entries
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect())
}

fn in_skipped_dir(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| matches!(c, Component::Normal(name) if SKIPPED_DIRS.iter().any(|s| name == *s)))
}

/// First file named `file_name` anywhere under `root`.
///
/// Build output and VCS directories are ignored.
///
/// # Errors
///
/// Returns an IO error if the search pattern cannot be built.
pub fn find_first(root: &Path, file_name: &str) -> PipelineResult<Option<PathBuf>> {
    let escaped = glob::Pattern::escape(file_name);
    let found = expand(root, &format!("**/{escaped}"))?
        .into_iter()
        .find(|p| !in_skipped_dir(root, p));

    match found {
        Some(ref path) => tracing::debug!(file = %path.display(), "Found {file_name}"),
        None => tracing::debug!(root = %root.display(), "No {file_name} found"),
    }

    Ok(found)
}

/// Every regular file under `root`, hidden files included
///
/// # Errors
///
/// Returns an IO error if the search pattern cannot be built.
pub fn list_files(root: &Path) -> PipelineResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let options = glob::MatchOptions {
        require_literal_leading_dot: false,
        ..glob::MatchOptions::new()
    };
    let pattern = format!(
        "{}/**/*",
        glob::Pattern::escape(&root.to_string_lossy()).trim_end_matches('/')
    );
    let entries = glob::glob_with(&pattern, options).map_err(|e| {
        PipelineError::Io(format!("invalid search pattern '{pattern}': {e}"))
    })?;

    for entry in entries {
        let path = entry.map_err(|e| PipelineError::Io(e.to_string()))?;
        if path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
