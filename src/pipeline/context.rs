//! Run-scoped build state

use super::version::{self, PackageVersion};

/// Values shared by every step of one run.
///
/// Created with defaults at the start of the run; only version resolution
/// writes `version`, `tag` and `package_version` afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    /// Identifier for log correlation
    pub run_id: String,
    /// Build mode passed to the image build (`debug`, `release`, ...)
    pub build_configuration: String,
    /// `<registry>/<app name in lowercase>`
    pub docker_image: String,
    /// Version label derived from the triggering ref
    pub version: Option<String>,
    /// `<docker_image>:<version>`
    pub tag: Option<String>,
    /// Version computed by the versioning tool
    pub package_version: Option<PackageVersion>,
}

impl BuildContext {
    /// Creates a fresh context for an image
    #[must_use]
    pub fn new(docker_image: impl Into<String>, build_configuration: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            build_configuration: build_configuration.into(),
            docker_image: docker_image.into(),
            version: None,
            tag: None,
            package_version: None,
        }
    }

    /// Records the version label and derives the image tag from it
    pub fn set_version(&mut self, version: impl Into<String>) {
        let version = version.into();
        self.tag = Some(version::image_tag(&self.docker_image, &version));
        self.version = Some(version);
    }

    /// Records the package version
    pub fn set_package_version(&mut self, package_version: PackageVersion) {
        self.package_version = Some(package_version);
    }

    /// True when a package version was resolved and carries a pre-release suffix
    #[must_use]
    pub fn is_pre_release(&self) -> bool {
        self.package_version
            .as_ref()
            .is_some_and(PackageVersion::is_pre_release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_is_unversioned() {
        let ctx = BuildContext::new("ghcr.io/app", "debug");
        assert_eq!(ctx.build_configuration, "debug");
        assert!(ctx.version.is_none());
        assert!(ctx.tag.is_none());
        assert!(!ctx.is_pre_release());
        assert!(!ctx.run_id.is_empty());
    }

    #[test]
    fn test_set_version_derives_tag() {
        let mut ctx = BuildContext::new("ghcr.io/app", "release");
        ctx.set_version("feature-login");
        assert_eq!(ctx.version.as_deref(), Some("feature-login"));
        assert_eq!(ctx.tag.as_deref(), Some("ghcr.io/app:feature-login"));
    }

    #[test]
    fn test_pre_release_follows_package_version() {
        let mut ctx = BuildContext::new("ghcr.io/app", "debug");
        ctx.set_package_version(PackageVersion::new("1.0.0-beta"));
        assert!(ctx.is_pre_release());
        ctx.set_package_version(PackageVersion::new("1.0.0"));
        assert!(!ctx.is_pre_release());
    }
}
