//! `shipline version` - Print the version label for a ref

use anyhow::{Context, Result};
use serde::Serialize;
use shipline::infrastructure::GitHubContext;
use shipline::pipeline::{RefEvent, image_tag};

/// Resolved version information
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    /// Classified trigger
    pub event: RefEvent,
    /// Version label
    pub version: String,
    /// `<image>:<version>` when an image was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Classifies `git_ref`, or the current workflow event when none is given
pub fn resolve(git_ref: Option<&str>, pr: Option<u64>, image: Option<&str>) -> VersionInfo {
    let event = match git_ref {
        Some(git_ref) => RefEvent::from_ref(git_ref, pr),
        None => GitHubContext::from_env().ref_event(),
    };
    let version = event.version_label();
    let tag = image.map(|image| image_tag(image, &version));

    VersionInfo {
        event,
        version,
        tag,
    }
}

/// Renders the bare label (and tag), or JSON
pub fn render(info: &VersionInfo, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(info).context("Failed to serialize version info");
    }

    Ok(match info.tag {
        Some(ref tag) => format!("{}\n{tag}", info.version),
        None => info.version.clone(),
    })
}
