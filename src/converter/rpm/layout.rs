//! rpmbuild directory tree and payload staging.
//!
//! Staged files live under `SOURCES/<name>/` mirroring their install
//! paths, then get packed into `SOURCES/<name>.tar.gz` for `%setup`.

use crate::converter::{
    error::{Error, ErrorExt, Result},
    freedesktop,
    utils::fs::{copy_dir, has_exec_bit, write_executable},
};
use flate2::{write::GzEncoder, Compression};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Subdirectories rpmbuild expects under its top directory.
pub const BUILD_SUBDIRS: [&str; 6] = ["SOURCES", "SPECS", "BUILD", "RPMS", "SRPMS", "BUILDROOT"];

/// Scoped rpmbuild top directory. Removed when dropped.
#[derive(Debug)]
pub struct BuildTree {
    dir: TempDir,
    package_name: String,
}

impl BuildTree {
    /// Creates the directory skeleton under `work_root`.
    pub async fn create(work_root: &Path, package_name: &str) -> Result<Self> {
        tokio::fs::create_dir_all(work_root)
            .await
            .fs_context("creating work directory", work_root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{package_name}_build_"))
            .tempdir_in(work_root)
            .fs_context("creating build directory", work_root)?;

        for sub in BUILD_SUBDIRS {
            let path = dir.path().join(sub);
            tokio::fs::create_dir_all(&path)
                .await
                .fs_context("creating build directory", &path)?;
        }

        Ok(Self {
            dir,
            package_name: package_name.to_string(),
        })
    }

    /// The `_topdir`.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// `SOURCES/`
    pub fn sources_dir(&self) -> PathBuf {
        self.root().join("SOURCES")
    }

    /// `SPECS/`
    pub fn specs_dir(&self) -> PathBuf {
        self.root().join("SPECS")
    }

    /// `RPMS/`
    pub fn rpms_dir(&self) -> PathBuf {
        self.root().join("RPMS")
    }

    /// `SRPMS/`
    pub fn srpms_dir(&self) -> PathBuf {
        self.root().join("SRPMS")
    }

    /// Staging root whose layout mirrors the installed file system.
    pub fn stage_root(&self) -> PathBuf {
        self.sources_dir().join(&self.package_name)
    }

    /// Path of the source tarball.
    pub fn tarball_path(&self) -> PathBuf {
        self.sources_dir().join(format!("{}.tar.gz", self.package_name))
    }

    /// Path of the spec file.
    pub fn spec_path(&self) -> PathBuf {
        self.specs_dir().join(format!("{}.spec", self.package_name))
    }
}

/// Install directory of the payload.
pub fn payload_install_dir(package_name: &str) -> PathBuf {
    Path::new("/opt").join(package_name)
}

/// Install path of the launcher.
pub fn launcher_install_path(package_name: &str) -> PathBuf {
    Path::new("/usr/bin").join(package_name)
}

/// Copies the application content to `opt/<name>` in the staging root.
pub async fn stage_payload(content_root: &Path, stage_root: &Path, package_name: &str) -> Result<PathBuf> {
    let rel = payload_install_dir(package_name)
        .strip_prefix("/")?
        .to_path_buf();
    copy_dir(content_root, &stage_root.join(&rel)).await?;
    Ok(rel)
}

/// What the launcher starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LaunchTarget {
    /// A path relative to the payload directory.
    Program(PathBuf),
    /// Nothing runnable was found; the launcher reports it at run time.
    Missing,
}

/// Picks the launcher target inside `content_root`.
///
/// `AppRun` wins. Otherwise the desktop entry's `Exec` program is looked up
/// by file name, then the first executable file in the tree is used.
pub fn find_launch_target(content_root: &Path, exec: Option<&str>) -> LaunchTarget {
    if content_root.join("AppRun").is_file() {
        return LaunchTarget::Program(PathBuf::from("AppRun"));
    }

    let executables: Vec<PathBuf> = walkdir::WalkDir::new(content_root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.metadata().is_ok_and(|m| has_exec_bit(&m)))
        .filter_map(|e| e.path().strip_prefix(content_root).ok().map(Path::to_path_buf))
        .collect();

    let wanted = exec
        .and_then(freedesktop::exec_program)
        .and_then(|p| Path::new(p).file_name().map(|n| n.to_os_string()));
    if let Some(wanted) = wanted
        && let Some(found) = executables
            .iter()
            .find(|p| p.file_name() == Some(wanted.as_os_str()))
    {
        return LaunchTarget::Program(found.clone());
    }

    executables
        .into_iter()
        .next()
        .map_or(LaunchTarget::Missing, LaunchTarget::Program)
}

/// Quotes `value` for a POSIX shell.
fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Text of the `/usr/bin/<name>` launcher.
pub fn launcher_script(package_name: &str, target: &LaunchTarget) -> String {
    let appdir = payload_install_dir(package_name);
    let appdir = sh_quote(&appdir.to_string_lossy());
    match target {
        LaunchTarget::Program(rel) => format!(
            "#!/bin/sh\n\
             APPDIR={appdir}\n\
             export APPDIR\n\
             TARGET=\"$APPDIR\"/{target}\n\
             if [ ! -x \"$TARGET\" ]; then\n\
             \x20   echo \"{name}: $TARGET is missing or not executable\" >&2\n\
             \x20   exit 127\n\
             fi\n\
             exec \"$TARGET\" \"$@\"\n",
            target = sh_quote(&rel.to_string_lossy()),
            name = package_name,
        ),
        LaunchTarget::Missing => format!(
            "#!/bin/sh\n\
             APPDIR={appdir}\n\
             echo \"{package_name}: no executable found in $APPDIR\" >&2\n\
             exit 127\n"
        ),
    }
}

/// Writes the launcher into the staging root and returns its relative path.
pub async fn write_launcher(stage_root: &Path, package_name: &str, target: &LaunchTarget) -> Result<PathBuf> {
    if *target == LaunchTarget::Missing {
        log::warn!("No executable found for {}; the launcher will report an error", package_name);
    }
    let rel = launcher_install_path(package_name)
        .strip_prefix("/")?
        .to_path_buf();
    write_executable(&stage_root.join(&rel), &launcher_script(package_name, target)).await?;
    Ok(rel)
}

/// Packs `stage_root` into a gzip tarball with `top_dir` as its single
/// top-level directory. Symlinks are stored as symlinks.
pub async fn create_tarball(stage_root: &Path, top_dir: &str, dest: &Path) -> Result<()> {
    let file = tokio::fs::File::create(dest)
        .await
        .fs_context("creating source tarball", dest)?;
    let std_file = file.into_std().await;
    let stage_root = stage_root.to_path_buf();
    let top_dir = top_dir.to_string();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let enc = GzEncoder::new(std_file, Compression::default());
        let mut tar = tar::Builder::new(enc);
        tar.follow_symlinks(false);
        tar.append_dir_all(&top_dir, &stage_root)?;
        let enc = tar.into_inner()?;
        enc.finish()?;
        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("Join error: {e}")))?
}
