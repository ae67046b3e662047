//! Version and tag resolution
//!
//! Two independent values come out of this module:
//!
//! - a *version label* derived from the ref that triggered the run, used as
//!   the image tag (`v2.3.0`, `feature-login`, `pr-42`, `edge`);
//! - a *package version* computed by Nerdbank.GitVersioning (`nbgv`), used to
//!   name the uploaded artifact and to flag pre-releases.

use super::errors::PipelineError;
use super::types::PipelineResult;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used when the ref matches none of the known shapes
pub const EDGE: &str = "edge";

static PULL_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^refs/pull/(\d+)/").expect("valid pull ref pattern"));

/// The event that triggered the run, reduced to what versioning needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RefEvent {
    /// A tag was pushed
    TagPush {
        /// Tag name without `refs/tags/`
        tag: String,
    },
    /// A branch was pushed
    BranchPush {
        /// Branch name without `refs/heads/`
        branch: String,
    },
    /// A pull request was opened or updated
    PullRequest {
        /// Pull request number
        number: u64,
    },
    /// Anything else (schedule on a detached ref, manual runs without a ref)
    Unknown,
}

impl RefEvent {
    /// Classifies a git ref.
    ///
    /// `payload_number` is the pull request number carried by the event
    /// payload; it takes precedence over the number embedded in a
    /// `refs/pull/<n>/merge` ref.
    #[must_use]
    pub fn from_ref(git_ref: &str, payload_number: Option<u64>) -> Self {
        let git_ref = git_ref.trim();

        if let Some(tag) = git_ref.strip_prefix("refs/tags/") {
            if tag.is_empty() {
                return Self::Unknown;
            }
            return Self::TagPush {
                tag: tag.to_string(),
            };
        }

        if let Some(branch) = git_ref.strip_prefix("refs/heads/") {
            if branch.is_empty() {
                return Self::Unknown;
            }
            return Self::BranchPush {
                branch: branch.to_string(),
            };
        }

        if git_ref.starts_with("refs/pull/") {
            let number = payload_number.or_else(|| {
                PULL_REF
                    .captures(git_ref)
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| m.as_str().parse().ok())
            });
            if let Some(number) = number {
                return Self::PullRequest { number };
            }
        }

        Self::Unknown
    }

    /// Label used as the image tag.
    ///
    /// Branch names only have their first `/` replaced, so
    /// `feature/login` becomes `feature-login`.
    #[must_use]
    pub fn version_label(&self) -> String {
        match self {
            Self::TagPush { tag } => tag.clone(),
            Self::BranchPush { branch } => branch.replacen('/', "-", 1),
            Self::PullRequest { number } => format!("pr-{number}"),
            Self::Unknown => EDGE.to_string(),
        }
    }
}

impl fmt::Display for RefEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagPush { tag } => write!(f, "tag {tag}"),
            Self::BranchPush { branch } => write!(f, "branch {branch}"),
            Self::PullRequest { number } => write!(f, "pull request #{number}"),
            Self::Unknown => write!(f, "unrecognized ref"),
        }
    }
}

/// NuGet package version computed by `nbgv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageVersion(String);

#[derive(Deserialize)]
struct NbgvOutput {
    #[serde(rename = "CloudBuildAllVars")]
    cloud_build_all_vars: CloudBuildAllVars,
}

#[derive(Deserialize)]
struct CloudBuildAllVars {
    #[serde(rename = "NBGV_NuGetPackageVersion")]
    nuget_package_version: Option<String>,
}

impl PackageVersion {
    /// Wraps an already-computed version string
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// Extracts `CloudBuildAllVars.NBGV_NuGetPackageVersion` from the JSON
    /// printed by `nbgv get-version -f json`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ToolOutput`] if the document is not valid
    /// JSON or the field is missing or empty.
    pub fn from_nbgv_json(json: &str) -> PipelineResult<Self> {
        let output: NbgvOutput =
            serde_json::from_str(json).map_err(|e| PipelineError::ToolOutput {
                tool: "nbgv".to_string(),
                reason: e.to_string(),
            })?;

        match output.cloud_build_all_vars.nuget_package_version {
            Some(version) if !version.trim().is_empty() => Ok(Self(version)),
            _ => Err(PipelineError::ToolOutput {
                tool: "nbgv".to_string(),
                reason: "CloudBuildAllVars.NBGV_NuGetPackageVersion is missing".to_string(),
            }),
        }
    }

    /// A version is a pre-release iff it carries a `-` suffix
    #[must_use]
    pub fn is_pre_release(&self) -> bool {
        self.0.contains('-')
    }

    /// Borrow the raw version string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `<registry>/<app name in lowercase>`
#[must_use]
pub fn docker_image(registry: &str, app_name: &str) -> String {
    format!("{registry}/{}", app_name.to_lowercase())
}

/// `<image>:<version label>`
#[must_use]
pub fn image_tag(image: &str, version: &str) -> String {
    format!("{image}:{version}")
}

/// `<app name>-<package version>`
#[must_use]
pub fn artifact_name(app_name: &str, package_version: &PackageVersion) -> String {
    format!("{app_name}-{package_version}")
}
