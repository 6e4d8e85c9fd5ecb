//! RPM package assembly.
//!
//! Turns a resolved working tree into an installable package:
//!
//! 1. Sanitize the package name
//! 2. Create an rpmbuild tree and stage the payload, launcher, desktop
//!    entry and icons under `SOURCES/<name>/`
//! 3. Pack the staging directory and render the spec
//! 4. Run rpmbuild with every directory pinned inside the tree
//! 5. Locate the package and copy it to the output directory
//!
//! The build tree is a scoped temporary directory and is removed on both
//! success and failure.

pub mod build;
pub mod layout;
pub mod sanitize;
pub mod spec;

pub use build::BuildTarget;
pub use sanitize::{rpm_version, sanitize_name};

use crate::converter::{
    error::{ErrorExt, Result},
    extract::WorkingTree,
    freedesktop,
    icons::{IconCandidate, IconFormat},
    metadata::ApplicationMetadata,
    utils::fs::{calculate_sha256, copy_file},
};
use layout::{BuildTree, LaunchTarget};
use spec::SpecContext;
use std::path::{Path, PathBuf};

/// A finished package.
#[derive(Clone, Debug)]
pub struct BuildArtifact {
    /// Location in the output directory.
    pub path: PathBuf,
    /// Sanitized package name.
    pub package_name: String,
    /// Metadata the package was built from.
    pub metadata: ApplicationMetadata,
    /// File size in bytes.
    pub size: u64,
    /// SHA-256 of the package file.
    pub checksum: String,
    /// Source package in the output directory, when one was built.
    pub source_package: Option<PathBuf>,
}

/// A staged build tree with its spec written, ready for rpmbuild.
#[derive(Debug)]
pub struct AssembledPackage {
    tree: BuildTree,
    package_name: String,
    metadata: ApplicationMetadata,
    spec_text: String,
    files: Vec<String>,
}

impl AssembledPackage {
    /// Sanitized package name.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Root of the rpmbuild tree.
    pub fn topdir(&self) -> &Path {
        self.tree.root()
    }

    /// Generated spec file text.
    pub fn spec_text(&self) -> &str {
        &self.spec_text
    }

    /// `%files` entries.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Runs rpmbuild and copies the package (and the source package for
    /// [`BuildTarget::BinaryAndSource`]) into `output_dir`.
    ///
    /// The build tree is removed when this returns, whatever the outcome.
    pub async fn build(
        self,
        rpmbuild: &Path,
        macros: Option<&Path>,
        output_dir: &Path,
        target: BuildTarget,
    ) -> Result<BuildArtifact> {
        let spec_path = self.tree.spec_path();
        build::run_rpmbuild(rpmbuild, self.tree.root(), &spec_path, macros, target).await?;

        let version = rpm_version(self.metadata.version());
        let built = build::find_artifact(&self.tree.rpms_dir(), &self.package_name, &version)?;
        let file_name = built
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{}.rpm", self.package_name)));
        let dest = output_dir.join(file_name);
        copy_file(&built, &dest).await?;

        let size = tokio::fs::metadata(&dest)
            .await
            .fs_context("reading package metadata", &dest)?
            .len();
        let checksum = calculate_sha256(&dest).await?;
        log::info!("Created {} ({} bytes)", dest.display(), size);

        let source_package = match target {
            BuildTarget::Binary => None,
            BuildTarget::BinaryAndSource => {
                let srpm = build::find_source_package(&self.tree.srpms_dir(), &self.package_name, &version)?;
                let srpm_dest = output_dir.join(srpm.file_name().unwrap_or_default());
                copy_file(&srpm, &srpm_dest).await?;
                log::info!("Created {}", srpm_dest.display());
                Some(srpm_dest)
            }
        };

        Ok(BuildArtifact {
            path: dest,
            package_name: self.package_name,
            metadata: self.metadata,
            size,
            checksum,
            source_package,
        })
    }
}

/// Stages everything rpmbuild needs for `metadata` and `tree`.
///
/// `icon` is optional; without one the package simply ships no icon.
pub async fn assemble(
    metadata: &ApplicationMetadata,
    tree: &WorkingTree,
    icon: Option<&IconCandidate>,
    work_root: &Path,
) -> Result<AssembledPackage> {
    let package_name = sanitize_name(metadata.name());
    log::debug!("Package name: {} (from {:?})", package_name, metadata.name());

    let build_tree = BuildTree::create(work_root, &package_name).await?;
    let stage = build_tree.stage_root();

    let payload = layout::stage_payload(tree.root(), &stage, &package_name).await?;

    let target = layout::find_launch_target(tree.root(), metadata.exec.as_deref());
    let launcher = layout::write_launcher(&stage, &package_name, &target).await?;

    let desktop = freedesktop::install_desktop_entry(tree.desktop_file(), metadata, &stage, &package_name).await?;

    let icons = match icon {
        Some(icon) => freedesktop::install_icon(icon, &stage, &package_name).await?,
        None => Vec::new(),
    };

    let files = manifest(&payload, &launcher, &desktop, &icons);

    layout::create_tarball(&stage, &package_name, &build_tree.tarball_path()).await?;

    let mut context = SpecContext::new(metadata, &package_name, files.clone());
    context.has_icons = icon.is_some_and(|i| i.format != IconFormat::Xpm && i.format != IconFormat::Ico);
    context.source_label = tree.kind().label().to_string();
    let spec_text = spec::render_spec(&context)?;

    let spec_path = build_tree.spec_path();
    tokio::fs::write(&spec_path, &spec_text)
        .await
        .fs_context("writing spec file", &spec_path)?;

    if matches!(target, LaunchTarget::Missing) {
        log::warn!("{} has no runnable entry point", package_name);
    }

    Ok(AssembledPackage {
        tree: build_tree,
        package_name,
        metadata: metadata.clone(),
        spec_text,
        files,
    })
}

/// `%files` entries for the staged paths, each listed once.
fn manifest(payload: &Path, launcher: &Path, desktop: &Path, icons: &[PathBuf]) -> Vec<String> {
    let absolute = |rel: &Path| Path::new("/").join(rel).to_string_lossy().into_owned();

    let mut files = vec![
        absolute(payload),
        format!("%attr(755,root,root) {}", absolute(launcher)),
        absolute(desktop),
    ];
    for icon in icons {
        let entry = absolute(icon);
        if !files.contains(&entry) {
            files.push(entry);
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::icons::IconOrigin;
    use std::os::unix::fs::PermissionsExt;

    fn app_dir(root: &Path) {
        std::fs::create_dir_all(root.join("usr/bin")).unwrap();
        std::fs::write(root.join("usr/bin/demo"), b"\x7fELF").unwrap();
        std::fs::set_permissions(root.join("usr/bin/demo"), std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(
            root.join("demo.desktop"),
            "[Desktop Entry]\nName=Demo\nExec=demo %U\nIcon=demo\n",
        )
        .unwrap();
        std::fs::write(root.join("demo.svg"), "<svg/>").unwrap();
    }

    #[test]
    fn test_manifest_lists_each_path_once() {
        let files = manifest(
            Path::new("opt/demo"),
            Path::new("usr/bin/demo"),
            Path::new("usr/share/applications/demo.desktop"),
            &[
                PathBuf::from("usr/share/icons/hicolor/scalable/apps/demo.svg"),
                PathBuf::from("usr/share/pixmaps/demo.svg"),
            ],
        );
        assert_eq!(
            files,
            vec![
                "/opt/demo",
                "%attr(755,root,root) /usr/bin/demo",
                "/usr/share/applications/demo.desktop",
                "/usr/share/icons/hicolor/scalable/apps/demo.svg",
                "/usr/share/pixmaps/demo.svg",
            ]
        );
    }

    #[tokio::test]
    async fn test_assemble_stages_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let app = tmp.path().join("Demo App");
        app_dir(&app);
        let work = tmp.path().join("work");

        let tree = WorkingTree::from_directory(&app).unwrap();
        let metadata = ApplicationMetadata {
            name: Some("Demo App".into()),
            version: Some("1.2.0".into()),
            exec: Some("demo %U".into()),
            requires: vec!["gtk3".into()],
            ..Default::default()
        };
        let icon = IconCandidate::from_path(app.join("demo.svg"), IconOrigin::NameMatch).unwrap();

        let assembled = assemble(&metadata, &tree, Some(&icon), &work).await.unwrap();
        let top = assembled.topdir().to_path_buf();
        let stage = top.join("SOURCES/demo-app");

        assert_eq!(assembled.package_name(), "demo-app");
        assert!(stage.join("opt/demo-app/usr/bin/demo").is_file());
        assert!(stage.join("usr/share/icons/hicolor/scalable/apps/demo-app.svg").is_file());
        assert!(top.join("SOURCES/demo-app.tar.gz").is_file());
        assert!(top.join("SPECS/demo-app.spec").is_file());

        let launcher = std::fs::read_to_string(stage.join("usr/bin/demo-app")).unwrap();
        assert!(launcher.contains("'usr/bin/demo'"));
        let desktop =
            std::fs::read_to_string(stage.join("usr/share/applications/demo-app.desktop")).unwrap();
        assert!(desktop.contains("Exec=/usr/bin/demo-app %U"));
        assert!(desktop.contains("Icon=demo-app"));

        assert!(assembled.spec_text().contains("Requires:       gtk3\n"));
        assert!(assembled.spec_text().contains("gtk-update-icon-cache"));
        assert!(assembled.spec_text().contains("- Converted from directory\n"));

        drop(assembled);
        assert!(!top.exists());
    }
}
