//! Configuration structures for conversion runs.
//!
//! [`ConvertSettings`] describes one conversion request and is assembled
//! with [`ConvertSettingsBuilder`]. [`ToolPaths`] names the external
//! programs the converter drives.

use crate::converter::metadata::ApplicationMetadata;
use crate::converter::publish::RepoDescriptor;
use std::path::{Path, PathBuf};

/// Kind of input being converted.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum InputKind {
    /// A self-extracting AppImage bundle file.
    #[default]
    AppImage,
    /// A plain directory holding an application.
    Directory,
}

impl InputKind {
    /// Guesses the kind from what is on disk at `path`.
    pub fn detect(path: &Path) -> Self {
        if path.is_dir() {
            InputKind::Directory
        } else {
            InputKind::AppImage
        }
    }

    /// Short label used in messages and changelog entries.
    pub fn label(&self) -> &'static str {
        match self {
            InputKind::AppImage => "AppImage",
            InputKind::Directory => "directory",
        }
    }
}

/// Names or paths of the external programs the converter runs.
///
/// Bare names are resolved through `PATH` when invoked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolPaths {
    /// Package build tool.
    pub rpmbuild: PathBuf,
    /// Dynamic-linker dependency lister.
    pub ldd: PathBuf,
    /// Package-owner query tool for the fedora family.
    pub dnf: PathBuf,
    /// Package-owner query tool for the debian family.
    pub apt_file: PathBuf,
    /// Repository metadata generators, in order of preference.
    pub createrepo: Vec<PathBuf>,
    /// Copr client.
    pub copr_cli: PathBuf,
    /// Open Build Service client.
    pub osc: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            rpmbuild: "rpmbuild".into(),
            ldd: "ldd".into(),
            dnf: "dnf".into(),
            apt_file: "apt-file".into(),
            createrepo: vec!["createrepo_c".into(), "createrepo".into()],
            copr_cli: "copr-cli".into(),
            osc: "osc".into(),
        }
    }
}

impl ToolPaths {
    /// Returns the first available repository metadata generator.
    pub fn createrepo(&self) -> Option<PathBuf> {
        self.createrepo
            .iter()
            .find_map(|tool| which::which(tool).ok())
    }
}

/// One conversion request.
#[derive(Clone, Debug)]
pub struct ConvertSettings {
    input: PathBuf,
    kind: InputKind,
    output_dir: PathBuf,
    distro: Option<String>,
    metadata: ApplicationMetadata,
    auto_deps: bool,
    repo: Option<RepoDescriptor>,
    dependency_report: Option<PathBuf>,
    work_root: PathBuf,
}

impl ConvertSettings {
    /// Path of the bundle file or application directory.
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Kind of input.
    pub fn kind(&self) -> InputKind {
        self.kind
    }

    /// Directory that receives the finished package.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Requested distribution profile, if any. Detected from the host otherwise.
    pub fn distro(&self) -> Option<&str> {
        self.distro.as_deref()
    }

    /// Caller-supplied metadata. Set fields always win over discovered values.
    pub fn metadata(&self) -> &ApplicationMetadata {
        &self.metadata
    }

    /// Whether shared-library dependencies are analyzed.
    pub fn auto_deps(&self) -> bool {
        self.auto_deps
    }

    /// Repository to publish to after a successful build.
    pub fn repo(&self) -> Option<&RepoDescriptor> {
        self.repo.as_ref()
    }

    /// Where to write the JSON dependency report, if requested.
    pub fn dependency_report(&self) -> Option<&Path> {
        self.dependency_report.as_deref()
    }

    /// Parent directory for every temporary directory of the run.
    pub fn work_root(&self) -> &Path {
        &self.work_root
    }
}

/// Builder for [`ConvertSettings`].
#[derive(Debug, Default)]
pub struct ConvertSettingsBuilder {
    input: Option<PathBuf>,
    kind: Option<InputKind>,
    output_dir: Option<PathBuf>,
    distro: Option<String>,
    metadata: ApplicationMetadata,
    auto_deps: Option<bool>,
    repo: Option<RepoDescriptor>,
    dependency_report: Option<PathBuf>,
    work_root: Option<PathBuf>,
}

impl ConvertSettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the input bundle or directory.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn input<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.input = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the input kind.
    ///
    /// Default: detected from the input path
    pub fn kind(mut self, kind: InputKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets the output directory.
    ///
    /// Default: the directory containing the input
    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Selects a distribution profile by id.
    pub fn distro(mut self, id: impl Into<String>) -> Self {
        self.distro = Some(id.into());
        self
    }

    /// Sets metadata overrides.
    pub fn metadata(mut self, metadata: ApplicationMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Enables or disables dependency analysis.
    ///
    /// Default: enabled
    pub fn auto_deps(mut self, enabled: bool) -> Self {
        self.auto_deps = Some(enabled);
        self
    }

    /// Publishes the finished package to `repo`.
    pub fn repo(mut self, repo: RepoDescriptor) -> Self {
        self.repo = Some(repo);
        self
    }

    /// Writes the dependency report to `path`.
    pub fn dependency_report<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.dependency_report = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets where temporary directories are created.
    ///
    /// Default: the system temporary directory
    pub fn work_root<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.work_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if `input` is missing.
    pub fn build(self) -> crate::converter::Result<ConvertSettings> {
        use crate::converter::error::Context;

        let input = self.input.context("input is required")?;
        let kind = self.kind.unwrap_or_else(|| InputKind::detect(&input));
        let output_dir = self.output_dir.unwrap_or_else(|| {
            input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        });

        Ok(ConvertSettings {
            input,
            kind,
            output_dir,
            distro: self.distro,
            metadata: self.metadata,
            auto_deps: self.auto_deps.unwrap_or(true),
            repo: self.repo,
            dependency_report: self.dependency_report,
            work_root: self.work_root.unwrap_or_else(std::env::temp_dir),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_input() {
        let err = ConvertSettingsBuilder::new().build().unwrap_err();
        assert!(err.to_string().contains("input is required"));
    }

    #[test]
    fn test_builder_defaults() {
        let settings = ConvertSettingsBuilder::new()
            .input("/nonexistent/app.AppImage")
            .build()
            .unwrap();
        assert_eq!(settings.kind(), InputKind::AppImage);
        assert!(settings.auto_deps());
        assert_eq!(settings.output_dir(), Path::new("/nonexistent"));
        assert_eq!(settings.work_root(), std::env::temp_dir());
        assert!(settings.distro().is_none());
    }

    #[test]
    fn test_kind_detected_for_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = ConvertSettingsBuilder::new()
            .input(tmp.path())
            .build()
            .unwrap();
        assert_eq!(settings.kind(), InputKind::Directory);
    }
}
