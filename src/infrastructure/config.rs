//! Action configuration
//!
//! Inputs are looked up by their declared name (`app-name`,
//! `docker-registry-url`, ...) through an [`InputSource`]. On a runner the
//! source is the `INPUT_*` environment; tests and the CLI use maps.

use super::container::ContainerRuntime;
use crate::pipeline::{ConfigError, version};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Declared input names
pub mod inputs {
    /// Registry user
    pub const DOCKER_USERNAME: &str = "docker-username";
    /// Registry password or token
    pub const DOCKER_PASSWORD: &str = "docker-password";
    /// Application name
    pub const APP_NAME: &str = "app-name";
    /// Pre-authenticated package feed URL
    pub const MYGET_PRE_AUTH_URL: &str = "myget-pre-auth-url";
    /// Build mode passed to the image build
    pub const BUILD_CONFIGURATION: &str = "build-configuration";
    /// Registry host
    pub const DOCKER_REGISTRY_URL: &str = "docker-registry-url";
    /// Whether to push the built image
    pub const PUSH_TO_DOCKER_REGISTRY: &str = "push-to-docker-registry";
    /// Explicit build file
    pub const DOCKERFILE: &str = "dockerfile";
    /// Search root and build context
    pub const WORKING_DIRECTORY: &str = "working-directory";
    /// Path inside the image to extract
    pub const EXTRACT_PATH: &str = "extract-path";
    /// Host directory receiving extracted files
    pub const ARTIFACT_PATH: &str = "artifact-path";
    /// `docker` or `podman`
    pub const CONTAINER_ENGINE: &str = "container-engine";
}

/// Where input values come from
pub trait InputSource {
    /// Raw value of an input, if set
    fn get(&self, name: &str) -> Option<String>;
}

impl InputSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// Stacks sources; the first layer holding a value wins
#[derive(Default)]
pub struct LayeredInputs<'a> {
    layers: Vec<&'a dyn InputSource>,
}

impl<'a> LayeredInputs<'a> {
    /// Creates an empty stack
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer below the existing ones
    #[must_use]
    pub fn with(mut self, layer: &'a dyn InputSource) -> Self {
        self.layers.push(layer);
        self
    }
}

impl InputSource for LayeredInputs<'_> {
    fn get(&self, name: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get(name))
    }
}

/// Trimmed value, with blank treated as unset
fn optional(source: &dyn InputSource, name: &str) -> Option<String> {
    source
        .get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(source: &dyn InputSource, name: &str) -> Result<String, ConfigError> {
    optional(source, name).ok_or_else(|| ConfigError::MissingInput {
        name: name.to_string(),
    })
}

/// Parses a YAML 1.2 core schema boolean
fn boolean(source: &dyn InputSource, name: &str, default: bool) -> Result<bool, ConfigError> {
    match optional(source, name).as_deref() {
        None => Ok(default),
        Some("true" | "True" | "TRUE") => Ok(true),
        Some("false" | "False" | "FALSE") => Ok(false),
        Some(other) => Err(ConfigError::InvalidBoolean {
            name: name.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Strips the scheme and trailing slashes from a registry URL
fn registry_host(raw: &str) -> String {
    let host = raw
        .strip_prefix("https://")
        .or_else(|| raw.strip_prefix("http://"))
        .unwrap_or(raw);
    host.trim_end_matches('/').to_string()
}

/// Resolved action inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionConfig {
    /// Application name as given
    pub app_name: String,
    /// Registry host without scheme
    pub registry: String,
    /// Registry user
    pub docker_username: Option<String>,
    /// Registry password
    #[serde(skip)]
    pub docker_password: Option<String>,
    /// Pre-authenticated package feed
    #[serde(skip)]
    pub myget_pre_auth_url: Option<String>,
    /// Build mode
    pub build_configuration: String,
    /// Push gate
    pub push: bool,
    /// Explicit build file, relative to the working directory
    pub dockerfile: Option<PathBuf>,
    /// Search root and build context
    pub working_directory: PathBuf,
    /// Path inside the image to extract
    pub extract_path: String,
    /// Host directory receiving extracted files
    pub artifact_path: PathBuf,
    /// Container engine
    pub container_engine: ContainerRuntime,
}

impl ActionConfig {
    /// Reads and validates every input.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required input is missing, a boolean is
    /// malformed, the feed URL does not parse or the engine is unknown.
    pub fn from_inputs(source: &dyn InputSource) -> Result<Self, ConfigError> {
        let app_name = required(source, inputs::APP_NAME)?;
        let registry = registry_host(&required(source, inputs::DOCKER_REGISTRY_URL)?);
        if registry.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: inputs::DOCKER_REGISTRY_URL.to_string(),
                reason: "no host left after removing the scheme".to_string(),
            });
        }

        let push = boolean(source, inputs::PUSH_TO_DOCKER_REGISTRY, true)?;
        let credential = |name: &str| -> Result<Option<String>, ConfigError> {
            if push {
                required(source, name).map(Some)
            } else {
                Ok(optional(source, name))
            }
        };
        let docker_username = credential(inputs::DOCKER_USERNAME)?;
        let docker_password = credential(inputs::DOCKER_PASSWORD)?;

        let myget_pre_auth_url = optional(source, inputs::MYGET_PRE_AUTH_URL);
        if let Some(ref url) = myget_pre_auth_url {
            url::Url::parse(url).map_err(|e| ConfigError::InvalidValue {
                name: inputs::MYGET_PRE_AUTH_URL.to_string(),
                reason: e.to_string(),
            })?;
        }

        let container_engine = match optional(source, inputs::CONTAINER_ENGINE) {
            Some(engine) => engine
                .parse()
                .map_err(|reason| ConfigError::InvalidValue {
                    name: inputs::CONTAINER_ENGINE.to_string(),
                    reason,
                })?,
            None => ContainerRuntime::default(),
        };

        Ok(Self {
            app_name,
            registry,
            docker_username,
            docker_password,
            myget_pre_auth_url,
            build_configuration: optional(source, inputs::BUILD_CONFIGURATION)
                .unwrap_or_else(|| "debug".to_string()),
            push,
            dockerfile: optional(source, inputs::DOCKERFILE).map(PathBuf::from),
            working_directory: optional(source, inputs::WORKING_DIRECTORY)
                .map_or_else(|| PathBuf::from("."), PathBuf::from),
            extract_path: optional(source, inputs::EXTRACT_PATH)
                .unwrap_or_else(|| "/app".to_string()),
            artifact_path: optional(source, inputs::ARTIFACT_PATH)
                .map_or_else(|| PathBuf::from("extracted"), PathBuf::from),
            container_engine,
        })
    }

    /// `<registry>/<lowercased app name>`
    #[must_use]
    pub fn docker_image(&self) -> String {
        version::docker_image(&self.registry, &self.app_name)
    }

    /// Username and password, when both were supplied
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.docker_username, &self.docker_password) {
            (Some(user), Some(password)) => Some((user, password)),
            _ => None,
        }
    }

    /// Values that must be masked in logs
    #[must_use]
    pub fn secrets(&self) -> Vec<&str> {
        [&self.docker_password, &self.myget_pre_auth_url]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .collect()
    }
}
