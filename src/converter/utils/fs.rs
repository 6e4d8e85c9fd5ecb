//! File system utilities for package staging.
//!
//! Provides file operations with automatic directory creation,
//! symlink preservation, and path context on every error.

use crate::converter::error::{Error, ErrorExt, Result};
use std::{
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};
use tokio::fs;

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// Symlinked sources are followed, so the destination always holds content.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Err(Error::GenericError(format!("{from:?} does not exist")));
    }
    if !from.is_file() {
        return Err(Error::GenericError(format!("{from:?} is not a file")));
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("creating directory", dest_dir)?;
    }
    fs::copy(from, to).await.fs_context("copying file", from)?;
    Ok(())
}

/// Recursively copies a directory from one path to another, creating any
/// parent directories of the destination path as necessary.
///
/// Symlinks are recreated as symlinks. Permission bits travel with `fs::copy`.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    if !from.is_dir() {
        return Err(Error::GenericError(format!("{from:?} is not a directory")));
    }
    fs::create_dir_all(to)
        .await
        .fs_context("creating directory", to)?;

    for entry in walkdir::WalkDir::new(from).min_depth(1).follow_links(false) {
        let entry = entry?;
        let rel_path = entry.path().strip_prefix(from)?;
        let dest_path = to.join(rel_path);

        if entry.file_type().is_symlink() {
            let target = fs::read_link(entry.path())
                .await
                .fs_context("reading symlink", entry.path())?;
            fs::symlink(&target, &dest_path)
                .await
                .fs_context("creating symlink", &dest_path)?;
        } else if entry.file_type().is_dir() {
            fs::create_dir_all(&dest_path)
                .await
                .fs_context("creating directory", &dest_path)?;
        } else {
            fs::copy(entry.path(), &dest_path)
                .await
                .fs_context("copying file", entry.path())?;
        }
    }

    Ok(())
}

/// Writes `contents` to `path` with mode 0755, creating parent directories.
pub async fn write_executable(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating directory", parent)?;
    }
    fs::write(path, contents)
        .await
        .fs_context("writing executable", path)?;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .fs_context("setting permissions", path)?;
    Ok(())
}

/// Adds the execute bits to `path` if none are set.
pub async fn ensure_executable(path: &Path) -> Result<()> {
    let metadata = fs::metadata(path)
        .await
        .fs_context("reading metadata", path)?;
    let mode = metadata.permissions().mode();
    if mode & 0o111 == 0 {
        log::debug!("Marking {} executable", path.display());
        fs::set_permissions(path, std::fs::Permissions::from_mode(mode | 0o755))
            .await
            .fs_context("setting permissions", path)?;
    }
    Ok(())
}

/// Returns true if any execute bit is set in `metadata`.
pub fn has_exec_bit(metadata: &std::fs::Metadata) -> bool {
    metadata.permissions().mode() & 0o111 != 0
}

/// Lists every path under `root` relative to it, sorted.
///
/// Used to dump a build tree when a build fails.
pub fn enumerate_tree(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    paths.sort();
    paths
}

/// Calculates the SHA256 checksum of a file.
///
/// Reads in 8KB chunks and returns the hex-encoded digest.
pub async fn calculate_sha256(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};
    use tokio::io::AsyncReadExt;

    let mut file = fs::File::open(path)
        .await
        .fs_context("opening file for hashing", path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading file for hash calculation", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
