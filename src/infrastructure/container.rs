//! Container engine commands (Docker/Podman)
//!
//! Builds the invocations for login, image build, push and the
//! create/copy/remove dance used to pull compiled output out of an image.

use crate::executor::Invocation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the throwaway container used for extraction
pub const EXTRACT_CONTAINER: &str = "extract";

/// Build secret id under which the NuGet config is exposed to the build.
///
/// A Dockerfile consumes it with
/// `RUN --mount=type=secret,id=nugetconfig dotnet restore --configfile /run/secrets/nugetconfig`.
pub const NUGET_CONFIG_SECRET: &str = "nugetconfig";

/// Container runtime type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntime {
    /// Docker runtime
    #[default]
    Docker,
    /// Podman runtime
    Podman,
}

impl std::fmt::Display for ContainerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program())
    }
}

impl std::str::FromStr for ContainerRuntime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "podman" => Ok(Self::Podman),
            other => Err(format!("unsupported container engine '{other}'")),
        }
    }
}

impl ContainerRuntime {
    /// Gets the runtime executable name
    #[must_use]
    pub fn program(self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }
}

/// Parameters of an image build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Build definition file
    pub dockerfile: PathBuf,
    /// Build context directory
    pub context: PathBuf,
    /// Full image tag
    pub tag: String,
    /// Value for the `BUILD_CONFIGURATION` build argument
    pub build_configuration: String,
    /// Value for the `PACKAGE_VERSION` build argument
    pub package_version: Option<String>,
    /// NuGet config exposed as a build secret
    pub nuget_config: Option<PathBuf>,
}

/// Produces container engine invocations
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerEngine {
    runtime: ContainerRuntime,
}

impl ContainerEngine {
    /// Creates an engine for the given runtime
    #[must_use]
    pub fn new(runtime: ContainerRuntime) -> Self {
        Self { runtime }
    }

    /// The runtime in use
    #[must_use]
    pub fn runtime(&self) -> ContainerRuntime {
        self.runtime
    }

    fn command(&self) -> Invocation {
        Invocation::new(self.runtime.program())
    }

    /// Creates and selects a BuildKit builder. Podman builds natively and
    /// needs none.
    #[must_use]
    pub fn setup_builder(&self) -> Option<Invocation> {
        match self.runtime {
            ContainerRuntime::Docker => Some(self.command().args(["buildx", "create", "--use"])),
            ContainerRuntime::Podman => None,
        }
    }

    /// Logs in to `registry`, passing the password on stdin
    #[must_use]
    pub fn login(&self, registry: &str, username: &str, password: &str) -> Invocation {
        self.command()
            .args(["login", registry, "--username", username, "--password-stdin"])
            .stdin(password)
            .secret(password)
    }

    /// Builds and tags the image into the local image store
    #[must_use]
    pub fn build(&self, request: &BuildRequest) -> Invocation {
        let mut cmd = match self.runtime {
            ContainerRuntime::Docker => self.command().args(["buildx", "build"]),
            ContainerRuntime::Podman => self.command().arg("build"),
        };

        cmd = cmd
            .arg("--file")
            .arg(request.dockerfile.to_string_lossy())
            .arg("--tag")
            .arg(&request.tag)
            .arg("--build-arg")
            .arg(format!("BUILD_CONFIGURATION={}", request.build_configuration));

        if let Some(ref version) = request.package_version {
            cmd = cmd
                .arg("--build-arg")
                .arg(format!("PACKAGE_VERSION={version}"));
        }

        if let Some(ref config) = request.nuget_config {
            cmd = cmd.arg("--secret").arg(format!(
                "id={NUGET_CONFIG_SECRET},src={}",
                config.display()
            ));
        }

        if self.runtime == ContainerRuntime::Docker {
            cmd = cmd.arg("--load");
        }

        cmd.arg(request.context.to_string_lossy())
    }

    /// Pushes a tag to its registry
    #[must_use]
    pub fn push(&self, tag: &str) -> Invocation {
        self.command().args(["push", tag])
    }

    /// Creates (without starting) a named container from `image`
    #[must_use]
    pub fn create(&self, name: &str, image: &str) -> Invocation {
        self.command().args(["create", "--name", name, image])
    }

    /// Copies the contents of `source` inside the container into `destination`
    #[must_use]
    pub fn copy_out(&self, container: &str, source: &str, destination: &Path) -> Invocation {
        let source = format!("{container}:{}/.", source.trim_end_matches('/'));
        self.command()
            .arg("cp")
            .arg(source)
            .arg(destination.to_string_lossy())
    }

    /// Removes a container
    #[must_use]
    pub fn remove(&self, name: &str) -> Invocation {
        self.command().args(["rm", name])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request() -> BuildRequest {
        BuildRequest {
            dockerfile: PathBuf::from("src/Api/Dockerfile"),
            context: PathBuf::from("."),
            tag: "registry.example.com/api:v1.0.0".to_string(),
            build_configuration: "release".to_string(),
            package_version: Some("1.0.0".to_string()),
            nuget_config: Some(PathBuf::from("/tmp/nuget.config")),
        }
    }

    #[test]
    fn test_runtime_parsing() {
        assert_eq!("docker".parse(), Ok(ContainerRuntime::Docker));
        assert_eq!(" Podman ".parse(), Ok(ContainerRuntime::Podman));
        assert!("containerd".parse::<ContainerRuntime>().is_err());
        assert_eq!(ContainerRuntime::Podman.to_string(), "podman");
    }

    #[test]
    fn test_docker_build_command() {
        let cmd = ContainerEngine::new(ContainerRuntime::Docker).build(&request());
        assert_eq!(cmd.program, "docker");
        assert_eq!(
            cmd.args,
            vec![
                "buildx",
                "build",
                "--file",
                "src/Api/Dockerfile",
                "--tag",
                "registry.example.com/api:v1.0.0",
                "--build-arg",
                "BUILD_CONFIGURATION=release",
                "--build-arg",
                "PACKAGE_VERSION=1.0.0",
                "--secret",
                "id=nugetconfig,src=/tmp/nuget.config",
                "--load",
                ".",
            ]
        );
    }

    #[test]
    fn test_podman_build_has_no_buildx() {
        let engine = ContainerEngine::new(ContainerRuntime::Podman);
        let cmd = engine.build(&BuildRequest {
            package_version: None,
            nuget_config: None,
            ..request()
        });
        assert_eq!(cmd.program, "podman");
        assert_eq!(cmd.args[0], "build");
        assert!(!cmd.args.contains(&"--load".to_string()));
        assert!(engine.setup_builder().is_none());
    }

    #[test]
    fn test_login_uses_stdin() {
        let cmd = ContainerEngine::default().login("ghcr.io", "bot", "hunter2");
        assert_eq!(cmd.stdin.as_deref(), Some("hunter2"));
        assert!(!cmd.args.iter().any(|a| a == "hunter2"));
        assert!(cmd.args.contains(&"--password-stdin".to_string()));
    }

    #[test]
    fn test_extraction_commands() {
        let engine = ContainerEngine::default();
        assert_eq!(
            engine.create(EXTRACT_CONTAINER, "img:tag").args,
            vec!["create", "--name", "extract", "img:tag"]
        );
        assert_eq!(
            engine
                .copy_out(EXTRACT_CONTAINER, "/app/", Path::new("out"))
                .args,
            vec!["cp", "extract:/app/.", "out"]
        );
        assert_eq!(engine.remove(EXTRACT_CONTAINER).display(), "docker rm extract");
        assert_eq!(engine.push("img:tag").args, vec!["push", "img:tag"]);
    }
}
