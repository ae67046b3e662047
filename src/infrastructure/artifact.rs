//! Artifact storage
//!
//! Publishes a directory tree under a name by copying it into a store
//! directory on the runner.

use super::search;
use crate::executor::{ArtifactPublisher, UploadReport};
use crate::pipeline::{PipelineError, PipelineResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Subdirectory of `RUNNER_TEMP` holding published artifacts
const STORE_DIR_NAME: &str = "shipline-artifacts";

/// Publisher that copies artifacts into a local directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArtifactStore {
    store_dir: PathBuf,
}

impl LocalArtifactStore {
    /// Creates a store rooted at `store_dir`
    #[must_use]
    pub fn new(store_dir: impl Into<PathBuf>) -> Self {
        Self {
            store_dir: store_dir.into(),
        }
    }

    /// Store under the runner temp directory, or `./artifacts` off-runner.
    ///
    /// The runner temp directory is emptied when the job ends; a later
    /// upload step must read the tree from the reported location.
    #[must_use]
    pub fn from_env() -> Self {
        match super::github_actions::runner_temp() {
            Some(temp) => Self::new(temp.join(STORE_DIR_NAME)),
            None => Self::new("artifacts"),
        }
    }

    /// Directory an artifact named `name` is written to
    #[must_use]
    pub fn artifact_dir(&self, name: &str) -> PathBuf {
        self.store_dir.join(name)
    }
}

impl ArtifactPublisher for LocalArtifactStore {
    fn publish(&self, name: &str, root: &Path) -> PipelineResult<UploadReport> {
        let files = if root.is_dir() {
            search::list_files(root)?
        } else {
            Vec::new()
        };

        if files.is_empty() {
            return Err(PipelineError::MissingResource {
                what: "artifact files".to_string(),
                detail: format!("nothing to upload under {}", root.display()),
            });
        }

        let destination = self.artifact_dir(name);
        let mut bytes = 0;

        for file in &files {
            let relative = file.strip_prefix(root).unwrap_or(file);
            let target = destination.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            bytes += fs::copy(file, &target)?;
        }

        tracing::info!(
            artifact = %name,
            files = files.len(),
            bytes,
            location = %destination.display(),
            "Artifact uploaded"
        );

        Ok(UploadReport {
            name: name.to_string(),
            files: files.len(),
            bytes,
            location: destination.display().to_string(),
        })
    }
}
