//! Build orchestrator
//!
//! Composes the tool invocations of one build into the fixed step sequence:
//!
//! ```text
//! ConfigurePackageSources
//! InstallVersioningTool        (best effort)
//! ResolveVersion
//! SetUpBuildEngine
//! AuthenticateRegistry
//! BuildAndPush
//!   always: RemovePackageSources
//!           CreateExtractionContainer
//!           CopyArtifacts
//!           RemoveExtractionContainer
//! UploadArtifacts
//! ```

use super::runner::{PipelineRunner, RunOutcome};
use super::traits::{ArtifactPublisher, CommandRunner, StatusReporter};
use crate::infrastructure::{
    ActionConfig, BuildRequest, ContainerEngine, EXTRACT_CONTAINER, Nbgv, PackageSources,
    runner_temp, search,
};
use crate::pipeline::{
    BuildContext, PackageVersion, Phase, PipelineError, PipelineResult, PipelineStep, RefEvent,
    artifact_name,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Step names, as they appear in logs, groups and failure messages
pub mod steps {
    /// Writes the run's NuGet config and registers the private feed
    pub const CONFIGURE_PACKAGE_SOURCES: &str = "ConfigurePackageSources";
    /// Installs `nbgv`
    pub const INSTALL_VERSIONING_TOOL: &str = "InstallVersioningTool";
    /// Computes the version label, tag and package version
    pub const RESOLVE_VERSION: &str = "ResolveVersion";
    /// Prepares the image builder
    pub const SET_UP_BUILD_ENGINE: &str = "SetUpBuildEngine";
    /// Logs in to the registry
    pub const AUTHENTICATE_REGISTRY: &str = "AuthenticateRegistry";
    /// Builds, tags and optionally pushes the image
    pub const BUILD_AND_PUSH: &str = "BuildAndPush";
    /// Unregisters the private feed
    pub const REMOVE_PACKAGE_SOURCES: &str = "RemovePackageSources";
    /// Creates the extraction container
    pub const CREATE_EXTRACTION_CONTAINER: &str = "CreateExtractionContainer";
    /// Copies compiled output out of the container
    pub const COPY_ARTIFACTS: &str = "CopyArtifacts";
    /// Removes the extraction container
    pub const REMOVE_EXTRACTION_CONTAINER: &str = "RemoveExtractionContainer";
    /// Publishes the extracted tree
    pub const UPLOAD_ARTIFACTS: &str = "UploadArtifacts";

    /// Every step in execution order
    pub const ALL: [&str; 11] = [
        CONFIGURE_PACKAGE_SOURCES,
        INSTALL_VERSIONING_TOOL,
        RESOLVE_VERSION,
        SET_UP_BUILD_ENGINE,
        AUTHENTICATE_REGISTRY,
        BUILD_AND_PUSH,
        REMOVE_PACKAGE_SOURCES,
        CREATE_EXTRACTION_CONTAINER,
        COPY_ARTIFACTS,
        REMOVE_EXTRACTION_CONTAINER,
        UPLOAD_ARTIFACTS,
    ];
}

/// Output names
pub mod outputs {
    /// Version label derived from the ref
    pub const VERSION: &str = "version";
    /// `true` when the package version has a pre-release suffix
    pub const IS_PRE_RELEASE: &str = "is-pre-release";
    /// Name of the uploaded artifact
    pub const ARTIFACT_NAME: &str = "artifact-name";
    /// Where the uploaded artifact was stored
    pub const ARTIFACT_LOCATION: &str = "artifact-location";
}

const VERSION_MANIFEST: &str = "version.json";
const BUILD_FILE: &str = "Dockerfile";

/// External systems a build talks to
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Runs `dotnet`, `nbgv` and the container engine
    pub runner: &'a dyn CommandRunner,
    /// Receives outputs and annotations
    pub reporter: &'a dyn StatusReporter,
    /// Stores the extracted artifact
    pub publisher: &'a dyn ArtifactPublisher,
}

/// Drives one build from package sources to artifact upload
pub struct BuildOrchestrator<'a> {
    config: ActionConfig,
    event: RefEvent,
    tools: Collaborators<'a>,
    engine: ContainerEngine,
    scratch_root: PathBuf,
    sources_dir: Option<TempDir>,
    sources: Option<PackageSources>,
    nuget_config: Option<PathBuf>,
    ctx: BuildContext,
}

impl<'a> BuildOrchestrator<'a> {
    /// Prepares a run for `event`. Nothing is executed until [`Self::run`].
    #[must_use]
    pub fn new(config: ActionConfig, event: RefEvent, tools: Collaborators<'a>) -> Self {
        let ctx = BuildContext::new(config.docker_image(), config.build_configuration.clone());
        Self {
            engine: ContainerEngine::new(config.container_engine),
            scratch_root: runner_temp().unwrap_or_else(std::env::temp_dir),
            sources_dir: None,
            sources: None,
            nuget_config: None,
            config,
            event,
            tools,
            ctx,
        }
    }

    /// Creates the run's NuGet config directory under `dir` instead of the
    /// temp directory. The config directory is deleted when the run ends.
    #[must_use]
    pub fn with_package_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = dir.into();
        self
    }

    /// Build state so far
    #[must_use]
    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    /// Runs every step and reports the outcome
    pub fn run(&mut self) -> RunOutcome {
        let reporter = self.tools.reporter;
        for secret in self.config.secrets() {
            reporter.mask(secret);
        }

        tracing::info!(
            run_id = %self.ctx.run_id,
            image = %self.ctx.docker_image,
            event = %self.event,
            engine = %self.engine.runtime(),
            push = self.config.push,
            "Starting build"
        );

        let outcome = PipelineRunner::new(reporter).run(Self::phases(), self);
        self.delete_package_config();
        outcome
    }

    /// Deletes the NuGet config directory, which holds the feed credential
    fn delete_package_config(&mut self) {
        self.sources = None;
        self.nuget_config = None;
        if let Some(dir) = self.sources_dir.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => tracing::debug!(path = %path.display(), "Deleted package config"),
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to delete package config"
                ),
            }
        }
    }

    fn phases() -> Vec<Phase<'a, Self>> {
        vec![
            Phase::step(PipelineStep::new(
                steps::CONFIGURE_PACKAGE_SOURCES,
                Self::configure_package_sources,
            )),
            Phase::step(PipelineStep::best_effort(
                steps::INSTALL_VERSIONING_TOOL,
                Self::install_versioning_tool,
            )),
            Phase::step(PipelineStep::new(steps::RESOLVE_VERSION, Self::resolve_version)),
            Phase::step(PipelineStep::new(
                steps::SET_UP_BUILD_ENGINE,
                Self::set_up_build_engine,
            )),
            Phase::step(PipelineStep::new(
                steps::AUTHENTICATE_REGISTRY,
                Self::authenticate_registry,
            )),
            Phase::with_post(
                PipelineStep::new(steps::BUILD_AND_PUSH, Self::build_and_push),
                vec![
                    PipelineStep::new(steps::REMOVE_PACKAGE_SOURCES, Self::remove_package_sources),
                    PipelineStep::new(
                        steps::CREATE_EXTRACTION_CONTAINER,
                        Self::create_extraction_container,
                    ),
                    PipelineStep::new(steps::COPY_ARTIFACTS, Self::copy_artifacts),
                    PipelineStep::new(
                        steps::REMOVE_EXTRACTION_CONTAINER,
                        Self::remove_extraction_container,
                    ),
                ],
            ),
            Phase::step(PipelineStep::new(steps::UPLOAD_ARTIFACTS, Self::upload_artifacts)),
        ]
    }

    fn working_dir(&self) -> &Path {
        &self.config.working_directory
    }

    fn artifact_dir(&self) -> PathBuf {
        self.working_dir().join(&self.config.artifact_path)
    }

    fn image_tag(&self) -> PipelineResult<String> {
        self.ctx
            .tag
            .clone()
            .ok_or_else(|| PipelineError::MissingResource {
                what: "image tag".to_string(),
                detail: "the version was never resolved".to_string(),
            })
    }

    fn configure_package_sources(&mut self) -> PipelineResult {
        let Some(url) = self.config.myget_pre_auth_url.clone() else {
            tracing::info!("No pre-authenticated feed configured, using default sources");
            return Ok(());
        };

        std::fs::create_dir_all(&self.scratch_root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("shipline-{}-", self.ctx.run_id))
            .tempdir_in(&self.scratch_root)?;
        let sources = PackageSources::new(dir.path());
        self.sources_dir = Some(dir);

        self.tools.runner.run(&sources.new_config())?;
        self.tools.runner.run(&sources.add_source(&url))?;
        self.nuget_config = Some(sources.config_file());
        self.sources = Some(sources);
        Ok(())
    }

    fn install_versioning_tool(&mut self) -> PipelineResult {
        self.tools.runner.run(&Nbgv.install()).map(drop)
    }

    fn resolve_version(&mut self) -> PipelineResult {
        let label = self.event.version_label();
        self.ctx.set_version(label.clone());
        tracing::info!(event = %self.event, version = %label, "Resolved version label");

        let project_dir = match search::find_first(self.working_dir(), VERSION_MANIFEST)? {
            Some(manifest) => manifest
                .parent()
                .map_or_else(|| self.working_dir().to_path_buf(), Path::to_path_buf),
            None => {
                let message = format!(
                    "{VERSION_MANIFEST} not found under {}",
                    self.working_dir().display()
                );
                tracing::error!("{message}");
                self.tools.reporter.error(&message);
                self.working_dir().to_path_buf()
            }
        };

        let output = self.tools.runner.run(&Nbgv.get_version(&project_dir))?;
        let package_version = PackageVersion::from_nbgv_json(&output.stdout)?;
        tracing::info!(
            package_version = %package_version,
            pre_release = package_version.is_pre_release(),
            "Resolved package version"
        );
        self.ctx.set_package_version(package_version);

        let reporter = self.tools.reporter;
        reporter.set_output(outputs::VERSION, &label)?;
        reporter.set_output(
            outputs::IS_PRE_RELEASE,
            if self.ctx.is_pre_release() { "true" } else { "false" },
        )
    }

    fn set_up_build_engine(&mut self) -> PipelineResult {
        match self.engine.setup_builder() {
            Some(setup) => self.tools.runner.run(&setup).map(drop),
            None => {
                tracing::info!(engine = %self.engine.runtime(), "No builder setup needed");
                Ok(())
            }
        }
    }

    fn authenticate_registry(&mut self) -> PipelineResult {
        match self.config.credentials() {
            Some((username, password)) => {
                let login = self.engine.login(&self.config.registry, username, password);
                self.tools.runner.run(&login).map(drop)
            }
            None => {
                self.tools
                    .reporter
                    .warning("No registry credentials supplied, skipping login");
                Ok(())
            }
        }
    }

    fn locate_build_file(&self) -> PipelineResult<PathBuf> {
        if let Some(ref explicit) = self.config.dockerfile {
            let path = self.working_dir().join(explicit);
            if path.is_file() {
                return Ok(path);
            }
            return Err(PipelineError::MissingResource {
                what: "build file".to_string(),
                detail: path.display().to_string(),
            });
        }

        search::find_first(self.working_dir(), BUILD_FILE)?.ok_or_else(|| {
            PipelineError::MissingResource {
                what: "build file".to_string(),
                detail: format!("no {BUILD_FILE} under {}", self.working_dir().display()),
            }
        })
    }

    fn build_and_push(&mut self) -> PipelineResult {
        let tag = self.image_tag()?;
        let request = BuildRequest {
            dockerfile: self.locate_build_file()?,
            context: self.working_dir().to_path_buf(),
            tag: tag.clone(),
            build_configuration: self.ctx.build_configuration.clone(),
            package_version: self
                .ctx
                .package_version
                .as_ref()
                .map(ToString::to_string),
            nuget_config: self.nuget_config.clone(),
        };

        self.tools.runner.run(&self.engine.build(&request))?;

        if self.config.push {
            self.tools.runner.run(&self.engine.push(&tag))?;
        } else {
            tracing::info!(tag = %tag, "Push disabled, image kept locally");
        }
        Ok(())
    }

    fn remove_package_sources(&mut self) -> PipelineResult {
        let Some(sources) = self.nuget_config.take().and(self.sources.as_ref()) else {
            tracing::debug!("No package sources to remove");
            return Ok(());
        };
        self.tools.runner.run(&sources.remove_source()).map(drop)
    }

    fn create_extraction_container(&mut self) -> PipelineResult {
        let tag = self.image_tag()?;
        self.tools
            .runner
            .run(&self.engine.create(EXTRACT_CONTAINER, &tag))
            .map(drop)
    }

    fn copy_artifacts(&mut self) -> PipelineResult {
        let destination = self.artifact_dir();
        if self.tools.runner.records_only() {
            tracing::debug!(path = %destination.display(), "Not creating artifact directory");
        } else {
            std::fs::create_dir_all(&destination)?;
        }
        let copy = self
            .engine
            .copy_out(EXTRACT_CONTAINER, &self.config.extract_path, &destination);
        self.tools.runner.run(&copy).map(drop)
    }

    fn remove_extraction_container(&mut self) -> PipelineResult {
        self.tools
            .runner
            .run(&self.engine.remove(EXTRACT_CONTAINER))
            .map(drop)
    }

    fn upload_artifacts(&mut self) -> PipelineResult {
        let package_version =
            self.ctx
                .package_version
                .as_ref()
                .ok_or_else(|| PipelineError::MissingResource {
                    what: "package version".to_string(),
                    detail: "the version was never resolved".to_string(),
                })?;
        let name = artifact_name(&self.config.app_name, package_version);

        let report = self.tools.publisher.publish(&name, &self.artifact_dir())?;
        tracing::info!(
            artifact = %report.name,
            files = report.files,
            location = %report.location,
            "Published artifact"
        );
        self.tools.reporter.set_output(outputs::ARTIFACT_NAME, &name)?;
        self.tools
            .reporter
            .set_output(outputs::ARTIFACT_LOCATION, &report.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{MemoryReporter, RecordingRunner};
    use crate::infrastructure::config::inputs;
    use crate::infrastructure::LocalArtifactStore;
    use crate::pipeline::StepOutcome;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn nbgv_json(version: &str) -> String {
        format!(r#"{{"CloudBuildAllVars":{{"NBGV_NuGetPackageVersion":"{version}"}}}}"#)
    }

    struct Workspace {
        repo: TempDir,
        store: TempDir,
    }

    impl Workspace {
        /// Repo with a Dockerfile, a version manifest and already-extracted output
        fn new() -> Self {
            let repo = TempDir::new().unwrap();
            fs::create_dir_all(repo.path().join("src/Orders.Api")).unwrap();
            fs::write(repo.path().join("src/Orders.Api/Dockerfile"), "FROM scratch").unwrap();
            fs::write(repo.path().join("version.json"), r#"{"version":"1.4"}"#).unwrap();
            fs::create_dir_all(repo.path().join("extracted")).unwrap();
            fs::write(repo.path().join("extracted/Orders.Api.dll"), "dll").unwrap();
            Self {
                repo,
                store: TempDir::new().unwrap(),
            }
        }

        fn config(&self, extra: &[(&str, &str)]) -> ActionConfig {
            let mut source: HashMap<String, String> = [
                (inputs::APP_NAME, "Orders.Api"),
                (inputs::DOCKER_REGISTRY_URL, "https://registry.example.com"),
                (inputs::DOCKER_USERNAME, "bot"),
                (inputs::DOCKER_PASSWORD, "hunter2"),
                (inputs::BUILD_CONFIGURATION, "release"),
            ]
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
            source.insert(
                inputs::WORKING_DIRECTORY.to_string(),
                self.repo.path().display().to_string(),
            );
            for (k, v) in extra {
                source.insert((*k).to_string(), (*v).to_string());
            }
            ActionConfig::from_inputs(&source).unwrap()
        }

        fn run(
            &self,
            config: ActionConfig,
            event: RefEvent,
            runner: &RecordingRunner,
            reporter: &MemoryReporter,
        ) -> (RunOutcome, BuildContext) {
            let publisher = LocalArtifactStore::new(self.store.path());
            let tools = Collaborators {
                runner,
                reporter,
                publisher: &publisher,
            };
            let mut orchestrator = BuildOrchestrator::new(config, event, tools)
                .with_package_config_dir(self.repo.path().join(".nuget"));
            let outcome = orchestrator.run();
            (outcome, orchestrator.context().clone())
        }
    }

    fn tag_push(tag: &str) -> RefEvent {
        RefEvent::TagPush {
            tag: tag.to_string(),
        }
    }

    fn versioned_runner(version: &str) -> RecordingRunner {
        RecordingRunner::new().responding(&["nbgv", "get-version"], nbgv_json(version))
    }

    #[test]
    fn test_full_run_sets_outputs_and_uploads() {
        let ws = Workspace::new();
        let runner = versioned_runner("1.4.0-beta.3");
        let reporter = MemoryReporter::new();

        let (outcome, ctx) = ws.run(ws.config(&[]), tag_push("v1.4.0"), &runner, &reporter);

        assert!(outcome.failure.is_none(), "{:?}", outcome.failure);
        assert_eq!(outcome.report.executed(), steps::ALL.to_vec());
        assert_eq!(ctx.tag.as_deref(), Some("registry.example.com/orders.api:v1.4.0"));
        assert_eq!(reporter.output("version").as_deref(), Some("v1.4.0"));
        assert_eq!(reporter.output("is-pre-release").as_deref(), Some("true"));
        assert_eq!(
            reporter.output("artifact-name").as_deref(),
            Some("Orders.Api-1.4.0-beta.3")
        );
        let stored = ws.store.path().join("Orders.Api-1.4.0-beta.3");
        assert!(stored.join("Orders.Api.dll").is_file());
        assert_eq!(
            reporter.output("artifact-location"),
            Some(stored.display().to_string())
        );
        assert!(!reporter.is_failed());
    }

    #[test]
    fn test_command_sequence() {
        let ws = Workspace::new();
        let runner = versioned_runner("2.0.0");
        let reporter = MemoryReporter::new();
        let config = ws.config(&[(
            inputs::MYGET_PRE_AUTH_URL,
            "https://www.myget.org/F/team/auth/tok/api/v3/index.json",
        )]);

        let (outcome, _) = ws.run(
            config,
            RefEvent::BranchPush {
                branch: "feature/login".to_string(),
            },
            &runner,
            &reporter,
        );
        assert!(outcome.failure.is_none(), "{:?}", outcome.failure);

        let programs: Vec<String> = runner
            .calls()
            .iter()
            .map(|c| format!("{} {}", c.program, c.args[0]))
            .collect();
        assert_eq!(
            programs,
            vec![
                "dotnet new",
                "dotnet nuget",
                "dotnet tool",
                "nbgv get-version",
                "docker buildx",
                "docker login",
                "docker buildx",
                "docker push",
                "dotnet nuget",
                "docker create",
                "docker cp",
                "docker rm",
            ]
        );

        let build = &runner.calls()[6];
        assert!(build.args.contains(&"BUILD_CONFIGURATION=release".to_string()));
        assert!(build.args.contains(&"PACKAGE_VERSION=2.0.0".to_string()));
        assert!(build.args.iter().any(|a| a.starts_with("id=nugetconfig,src=")));
        assert!(runner.ran(&[
            "docker",
            "push",
            "registry.example.com/orders.api:feature-login"
        ]));
        assert_eq!(reporter.output("is-pre-release").as_deref(), Some("false"));
    }

    fn package_config_dir(runner: &RecordingRunner) -> PathBuf {
        let new_config = runner
            .calls()
            .into_iter()
            .find(|c| c.matches("dotnet", &["new", "nugetconfig", "-o"]))
            .unwrap();
        PathBuf::from(&new_config.args[3])
    }

    #[test]
    fn test_login_failure_still_deletes_package_config() {
        let ws = Workspace::new();
        let runner = versioned_runner("1.0.0").failing_on(&["docker", "login"]);
        let reporter = MemoryReporter::new();
        let config = ws.config(&[(
            inputs::MYGET_PRE_AUTH_URL,
            "https://www.myget.org/F/team/auth/tok/api/v3/index.json",
        )]);

        let (outcome, _) = ws.run(config, tag_push("v1"), &runner, &reporter);

        assert!(matches!(
            outcome.failure,
            Some(PipelineError::StepFailed { ref step, .. }) if step == steps::AUTHENTICATE_REGISTRY
        ));
        assert!(runner.ran(&["dotnet", "nuget", "add", "source"]));
        let dir = package_config_dir(&runner);
        assert!(dir.starts_with(ws.repo.path().join(".nuget")));
        assert!(!dir.exists());
        assert_eq!(fs::read_dir(ws.repo.path().join(".nuget")).unwrap().count(), 0);
    }

    #[test]
    fn test_successful_run_deletes_package_config() {
        let ws = Workspace::new();
        let runner = versioned_runner("1.0.0");
        let reporter = MemoryReporter::new();
        let config = ws.config(&[(
            inputs::MYGET_PRE_AUTH_URL,
            "https://www.myget.org/F/team/auth/tok/api/v3/index.json",
        )]);

        let (outcome, _) = ws.run(config, tag_push("v1"), &runner, &reporter);

        assert!(outcome.failure.is_none(), "{:?}", outcome.failure);
        let dir = package_config_dir(&runner);
        assert!(runner.ran(&[
            "dotnet",
            "nuget",
            "remove",
            "source",
            "myget",
            "--configfile",
            dir.join("nuget.config").to_str().unwrap(),
        ]));
        assert!(!dir.exists());
    }

    #[test]
    fn test_recorded_run_leaves_working_tree_untouched() {
        let ws = Workspace::new();
        let runner = versioned_runner("1.0.0");
        let reporter = MemoryReporter::new();
        let config = ws.config(&[(inputs::ARTIFACT_PATH, "out/bin")]);

        ws.run(config, tag_push("v1"), &runner, &reporter);

        assert!(runner.ran(&["docker", "cp"]));
        assert!(!ws.repo.path().join("out").exists());
    }

    #[test]
    fn test_build_failure_runs_cleanup_then_fails() {
        let ws = Workspace::new();
        let runner = versioned_runner("1.0.0").failing_on(&["docker", "buildx", "build"]);
        let reporter = MemoryReporter::new();
        let config = ws.config(&[(
            inputs::MYGET_PRE_AUTH_URL,
            "https://www.myget.org/F/team/auth/tok/api/v3/index.json",
        )]);

        let (outcome, _) = ws.run(config, tag_push("v1.0.0"), &runner, &reporter);

        let calls = runner.calls();
        let build_at = calls
            .iter()
            .position(|c| c.matches("docker", &["buildx", "build"]))
            .unwrap();
        let tail: Vec<String> = calls[build_at + 1..]
            .iter()
            .map(|c| format!("{} {} {}", c.program, c.args[0], c.args[1]))
            .collect();
        assert_eq!(
            tail,
            vec![
                "dotnet nuget remove",
                "docker create --name",
                "docker cp extract:/app/.",
                "docker rm extract",
            ]
        );

        assert!(matches!(
            outcome.failure,
            Some(PipelineError::StepFailed { ref step, .. }) if step == steps::BUILD_AND_PUSH
        ));
        assert!(!runner.ran(&["docker", "push"]));
        assert_eq!(
            outcome.report.get(steps::UPLOAD_ARTIFACTS).unwrap().outcome,
            StepOutcome::Skipped
        );
        for cleanup in &steps::ALL[6..10] {
            assert_eq!(
                outcome.report.get(cleanup).unwrap().outcome,
                StepOutcome::Success
            );
        }
        assert_eq!(reporter.failures().len(), 1);
        assert!(reporter.failures()[0].contains("BuildAndPush"));
        assert!(reporter.output("artifact-name").is_none());
    }

    #[test]
    fn test_push_disabled_builds_without_pushing() {
        let ws = Workspace::new();
        let runner = versioned_runner("1.0.0");
        let reporter = MemoryReporter::new();
        let config = ws.config(&[(inputs::PUSH_TO_DOCKER_REGISTRY, "false")]);

        let (outcome, _) = ws.run(config, tag_push("v1.0.0"), &runner, &reporter);

        assert!(outcome.failure.is_none());
        assert!(runner.ran(&["docker", "buildx", "build"]));
        assert!(!runner.ran(&["docker", "push"]));
    }

    #[test]
    fn test_push_disabled_without_credentials_skips_login() {
        let ws = Workspace::new();
        let runner = versioned_runner("1.0.0");
        let reporter = MemoryReporter::new();
        let mut config = ws.config(&[(inputs::PUSH_TO_DOCKER_REGISTRY, "false")]);
        config.docker_username = None;
        config.docker_password = None;

        let (outcome, _) = ws.run(config, RefEvent::Unknown, &runner, &reporter);

        assert!(outcome.failure.is_none());
        assert!(!runner.ran(&["docker", "login"]));
        assert_eq!(reporter.warnings().len(), 1);
        assert_eq!(reporter.output("version").as_deref(), Some("edge"));
    }

    #[test]
    fn test_missing_version_manifest_is_reported_not_fatal() {
        let ws = Workspace::new();
        fs::remove_file(ws.repo.path().join("version.json")).unwrap();
        let runner = versioned_runner("0.1.0");
        let reporter = MemoryReporter::new();

        let (outcome, _) = ws.run(
            ws.config(&[]),
            RefEvent::PullRequest { number: 42 },
            &runner,
            &reporter,
        );

        assert!(outcome.failure.is_none());
        assert_eq!(reporter.errors().len(), 1);
        assert!(reporter.errors()[0].contains("version.json"));
        let nbgv = runner
            .calls()
            .into_iter()
            .find(|c| c.program == "nbgv")
            .unwrap();
        assert_eq!(
            nbgv.args.last().map(String::as_str),
            Some(ws.repo.path().to_str().unwrap())
        );
        assert_eq!(reporter.output("version").as_deref(), Some("pr-42"));
    }

    #[test]
    fn test_unreadable_version_output_is_fatal() {
        let ws = Workspace::new();
        let runner = RecordingRunner::new().responding(&["nbgv"], "not json");
        let reporter = MemoryReporter::new();

        let (outcome, _) = ws.run(ws.config(&[]), tag_push("v1"), &runner, &reporter);

        assert!(matches!(
            outcome.failure,
            Some(PipelineError::StepFailed { ref step, .. }) if step == steps::RESOLVE_VERSION
        ));
        assert!(!runner.ran(&["docker"]));
    }

    #[test]
    fn test_versioning_tool_install_failure_is_tolerated() {
        let ws = Workspace::new();
        let runner = versioned_runner("1.0.0").failing_on(&["dotnet", "tool", "install"]);
        let reporter = MemoryReporter::new();

        let (outcome, _) = ws.run(ws.config(&[]), tag_push("v1"), &runner, &reporter);

        assert!(outcome.failure.is_none());
        assert_eq!(
            outcome
                .report
                .get(steps::INSTALL_VERSIONING_TOOL)
                .unwrap()
                .outcome,
            StepOutcome::Tolerated
        );
        assert_eq!(reporter.warnings().len(), 1);
    }

    #[test]
    fn test_no_feed_skips_source_commands() {
        let ws = Workspace::new();
        let runner = versioned_runner("1.0.0");
        let reporter = MemoryReporter::new();

        let (outcome, _) = ws.run(ws.config(&[]), tag_push("v1"), &runner, &reporter);

        assert!(outcome.failure.is_none());
        assert!(!runner.ran(&["dotnet", "nuget"]));
        assert!(!runner.ran(&["dotnet", "new"]));
        let build = runner
            .calls()
            .into_iter()
            .find(|c| c.matches("docker", &["buildx", "build"]))
            .unwrap();
        assert!(!build.args.contains(&"--secret".to_string()));
    }

    #[test]
    fn test_missing_build_file_fails_build_step() {
        let ws = Workspace::new();
        fs::remove_file(ws.repo.path().join("src/Orders.Api/Dockerfile")).unwrap();
        let runner = versioned_runner("1.0.0");
        let reporter = MemoryReporter::new();

        let (outcome, _) = ws.run(ws.config(&[]), tag_push("v1"), &runner, &reporter);

        let failure = outcome.failure.unwrap();
        assert!(failure.to_string().contains("build file"));
        assert!(runner.ran(&["docker", "rm", EXTRACT_CONTAINER]));
    }

    #[test]
    fn test_explicit_build_file_and_podman() {
        let ws = Workspace::new();
        fs::write(ws.repo.path().join("Containerfile"), "FROM scratch").unwrap();
        let runner = versioned_runner("1.0.0");
        let reporter = MemoryReporter::new();
        let config = ws.config(&[
            (inputs::DOCKERFILE, "Containerfile"),
            (inputs::CONTAINER_ENGINE, "podman"),
        ]);

        let (outcome, _) = ws.run(config, tag_push("v1"), &runner, &reporter);

        assert!(outcome.failure.is_none(), "{:?}", outcome.failure);
        assert!(runner.calls().iter().all(|c| c.program != "docker"));
        let build = runner
            .calls()
            .into_iter()
            .find(|c| c.matches("podman", &["build"]))
            .unwrap();
        assert!(build.args.iter().any(|a| a.ends_with("Containerfile")));
    }

    #[test]
    fn test_cleanup_failure_fails_otherwise_successful_run() {
        let ws = Workspace::new();
        let runner = versioned_runner("1.0.0").failing_on(&["docker", "cp"]);
        let reporter = MemoryReporter::new();

        let (outcome, _) = ws.run(ws.config(&[]), tag_push("v1"), &runner, &reporter);

        assert!(matches!(
            outcome.failure,
            Some(PipelineError::StepFailed { ref step, .. }) if step == steps::COPY_ARTIFACTS
        ));
        assert!(runner.ran(&["docker", "rm", EXTRACT_CONTAINER]));
        assert!(reporter.output("artifact-name").is_none());
    }

    #[test]
    fn test_secrets_are_masked_and_redacted() {
        let ws = Workspace::new();
        let runner = versioned_runner("1.0.0");
        let reporter = MemoryReporter::new();
        let feed = "https://www.myget.org/F/team/auth/tok/api/v3/index.json";

        ws.run(
            ws.config(&[(inputs::MYGET_PRE_AUTH_URL, feed)]),
            tag_push("v1"),
            &runner,
            &reporter,
        );

        assert_eq!(reporter.masked(), vec!["hunter2".to_string(), feed.to_string()]);
        let rendered = runner.command_lines().join("\n");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("auth/tok"));
    }
}
