//! .NET tooling commands
//!
//! Package source management through `dotnet nuget` and version computation
//! through Nerdbank.GitVersioning's `nbgv` global tool.

use crate::executor::Invocation;
use std::path::{Path, PathBuf};

/// Name under which the pre-authenticated feed is registered
pub const MYGET_SOURCE: &str = "myget";

/// A NuGet config file owned by the run.
///
/// Sources are added to this file only, never to the user-level config, so
/// removing them leaves the machine as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSources {
    config_dir: PathBuf,
}

impl PackageSources {
    /// Uses (and creates if needed) `nuget.config` in `config_dir`
    #[must_use]
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Path of the managed config file
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("nuget.config")
    }

    /// Writes a fresh config file from the dotnet template
    #[must_use]
    pub fn new_config(&self) -> Invocation {
        Invocation::new("dotnet")
            .args(["new", "nugetconfig", "-o"])
            .arg(self.config_dir.to_string_lossy())
            .arg("--force")
    }

    /// Registers `url` as the `myget` source. The URL embeds credentials.
    #[must_use]
    pub fn add_source(&self, url: &str) -> Invocation {
        Invocation::new("dotnet")
            .args(["nuget", "add", "source", url, "--name", MYGET_SOURCE])
            .arg("--configfile")
            .arg(self.config_file().to_string_lossy())
            .secret(url)
    }

    /// Unregisters the `myget` source
    #[must_use]
    pub fn remove_source(&self) -> Invocation {
        Invocation::new("dotnet")
            .args(["nuget", "remove", "source", MYGET_SOURCE, "--configfile"])
            .arg(self.config_file().to_string_lossy())
    }
}

/// Nerdbank.GitVersioning CLI
#[derive(Debug, Clone, Copy, Default)]
pub struct Nbgv;

impl Nbgv {
    /// Installs the tool globally. Fails when it is already installed.
    #[must_use]
    pub fn install(self) -> Invocation {
        Invocation::new("dotnet").args(["tool", "install", "--global", "nbgv"])
    }

    /// Prints version information for the project in `project_dir` as JSON
    #[must_use]
    pub fn get_version(self, project_dir: &Path) -> Invocation {
        Invocation::new("nbgv")
            .args(["get-version", "-f", "json", "-p"])
            .arg(project_dir.to_string_lossy())
    }
}
