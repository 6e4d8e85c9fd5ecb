//! Working tree preparation.
//!
//! An AppImage is unpacked with its own `--appimage-extract` runtime flag
//! into a scoped temporary directory. A plain directory is used in place.
//! Either way the result is a [`WorkingTree`] rooted at the application
//! content. Temporary directories are removed when the tree is dropped.

use crate::converter::{
    error::{Error, ErrorExt, Result},
    icons::{self, IconCandidate},
    settings::InputKind,
    utils::{fs::ensure_executable, ToolInvocation},
};
use path_absolutize::Absolutize;
use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};
use tempfile::TempDir;

/// Directory name the AppImage runtime extracts into.
pub const EXTRACT_DIR_NAME: &str = "squashfs-root";

/// Extracted or in-place application content.
#[derive(Debug)]
pub struct WorkingTree {
    root: PathBuf,
    source: PathBuf,
    kind: InputKind,
    desktop_file: OnceLock<Option<PathBuf>>,
    _scratch: Option<TempDir>,
}

impl WorkingTree {
    /// Prepares the working tree for `input`.
    ///
    /// Temporary directories are created under `work_root`.
    pub async fn open(input: &Path, kind: InputKind, work_root: &Path) -> Result<Self> {
        match kind {
            InputKind::AppImage => Self::extract_appimage(input, work_root).await,
            InputKind::Directory => Self::from_directory(input),
        }
    }

    /// Uses an application directory in place.
    pub fn from_directory(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            return Err(Error::InputNotFound(dir.to_path_buf()));
        }
        if !dir.is_dir() {
            return Err(Error::InvalidInput {
                path: dir.to_path_buf(),
                reason: "not a directory".into(),
            });
        }
        let root = dir.absolutize()?.into_owned();
        Ok(Self {
            source: root.clone(),
            root,
            kind: InputKind::Directory,
            desktop_file: OnceLock::new(),
            _scratch: None,
        })
    }

    /// Unpacks an AppImage into a fresh directory under `work_root`.
    pub async fn extract_appimage(bundle: &Path, work_root: &Path) -> Result<Self> {
        if !bundle.exists() {
            return Err(Error::InputNotFound(bundle.to_path_buf()));
        }
        if !bundle.is_file() {
            return Err(Error::InvalidInput {
                path: bundle.to_path_buf(),
                reason: "not a regular file".into(),
            });
        }
        let bundle = bundle.absolutize()?.into_owned();
        ensure_executable(&bundle).await?;

        tokio::fs::create_dir_all(work_root)
            .await
            .fs_context("creating work directory", work_root)?;
        let scratch = tempfile::Builder::new()
            .prefix("appimage2rpm_")
            .tempdir_in(work_root)
            .fs_context("creating temporary directory", work_root)?;
        let extracted = scratch.path().join("extracted");
        tokio::fs::create_dir_all(&extracted)
            .await
            .fs_context("creating extraction directory", &extracted)?;

        log::info!("Extracting {}", bundle.display());
        ToolInvocation::new(&bundle)
            .arg("--appimage-extract")
            .current_dir(&extracted)
            .env("DISPLAY", "")
            .run()
            .await?;

        let root = find_content_root(&extracted)?;
        log::debug!("Extracted content root: {}", root.display());

        Ok(Self {
            root,
            source: bundle,
            kind: InputKind::AppImage,
            desktop_file: OnceLock::new(),
            _scratch: Some(scratch),
        })
    }

    /// Root of the application content.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The original input path.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Kind of input this tree came from.
    pub fn kind(&self) -> InputKind {
        self.kind
    }

    /// The bundle's desktop entry, located once on first use.
    ///
    /// The shallowest `.desktop` file wins; ties go to the first by name.
    pub fn desktop_file(&self) -> Option<&Path> {
        self.desktop_file
            .get_or_init(|| find_desktop_file(&self.root))
            .as_deref()
    }

    /// Icon candidates for an application called `app_name`.
    pub fn icon_candidates(&self, app_name: &str, icon_ref: Option<&str>) -> Vec<IconCandidate> {
        icons::list_candidates(&self.root, app_name, icon_ref, self.kind)
    }

    /// The bundle's own launcher script, if it has one.
    pub fn app_run(&self) -> Option<PathBuf> {
        let path = self.root.join("AppRun");
        path.is_file().then_some(path)
    }
}

fn find_content_root(extracted: &Path) -> Result<PathBuf> {
    let expected = extracted.join(EXTRACT_DIR_NAME);
    if expected.is_dir() {
        return Ok(expected);
    }

    let mut dirs: Vec<PathBuf> = std::fs::read_dir(extracted)
        .fs_context("reading extraction directory", extracted)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs.into_iter()
        .next()
        .ok_or_else(|| Error::ContentRootNotFound(extracted.to_path_buf()))
}

fn find_desktop_file(root: &Path) -> Option<PathBuf> {
    walkdir::WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_type().is_dir())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "desktop"))
        .min_by_key(|e| e.depth())
        .map(|e| e.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn write_script(path: &Path, body: &str) {
        std::fs::write(path, body).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[tokio::test]
    async fn test_extracts_into_squashfs_root() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = tmp.path().join("demo.AppImage");
        write_script(
            &bundle,
            "#!/bin/sh\n[ \"$1\" = --appimage-extract ] || exit 2\nmkdir -p squashfs-root/usr/bin\necho x > squashfs-root/demo.desktop\n",
        );
        let work = tmp.path().join("work");

        let tree = WorkingTree::extract_appimage(&bundle, &work).await.unwrap();
        assert!(tree.root().ends_with(EXTRACT_DIR_NAME));
        assert!(tree.desktop_file().unwrap().ends_with("demo.desktop"));

        drop(tree);
        assert_eq!(std::fs::read_dir(&work).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_first_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = tmp.path().join("odd.AppImage");
        write_script(&bundle, "#!/bin/sh\nmkdir -p other-root/usr\n");

        let tree = WorkingTree::extract_appimage(&bundle, tmp.path()).await.unwrap();
        assert!(tree.root().ends_with("other-root"));
    }

    #[tokio::test]
    async fn test_failed_extraction_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = tmp.path().join("bad.AppImage");
        write_script(&bundle, "#!/bin/sh\necho corrupt >&2\nexit 1\n");
        let work = tmp.path().join("work");

        let err = WorkingTree::extract_appimage(&bundle, &work).await.unwrap_err();
        assert!(matches!(err, Error::ToolFailed { .. }));
        assert_eq!(std::fs::read_dir(&work).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_empty_extraction_has_no_root() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = tmp.path().join("empty.AppImage");
        write_script(&bundle, "#!/bin/sh\nexit 0\n");

        let err = WorkingTree::extract_appimage(&bundle, tmp.path()).await.unwrap_err();
        assert!(matches!(err, Error::ContentRootNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_input() {
        let tmp = tempfile::tempdir().unwrap();
        let err = WorkingTree::open(
            &tmp.path().join("missing.AppImage"),
            InputKind::AppImage,
            tmp.path(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InputNotFound(_)));
    }

    #[test]
    fn test_directory_mode_rejects_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("file");
        std::fs::write(&file, b"").unwrap();
        let err = WorkingTree::from_directory(&file).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn test_shallowest_desktop_file_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let apps = tmp.path().join("usr/share/applications");
        std::fs::create_dir_all(&apps).unwrap();
        std::fs::write(apps.join("a.desktop"), b"").unwrap();
        std::fs::write(tmp.path().join("z.desktop"), b"").unwrap();

        let tree = WorkingTree::from_directory(tmp.path()).unwrap();
        assert!(tree.desktop_file().unwrap().ends_with("z.desktop"));
    }
}
