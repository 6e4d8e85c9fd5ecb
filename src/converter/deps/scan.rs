//! Executable discovery and `ldd` output parsing.

use crate::converter::{
    error::{ErrorExt, Result},
    utils::{fs::has_exec_bit, process::combined_output, ToolInvocation},
};
use std::{
    collections::BTreeSet,
    io::Read,
    path::{Path, PathBuf},
};

/// Returns true if the file at `path` starts with an ELF header.
///
/// Unreadable or short files are not ELF objects.
pub fn is_elf(path: &Path) -> bool {
    match peek_hint(path) {
        Ok(hint) => matches!(hint, goblin::Hint::Elf(_)),
        Err(e) => {
            log::trace!("Not an ELF object: {}: {}", path.display(), e);
            false
        }
    }
}

/// Reads the first 16 bytes of `path` and asks goblin what kind of object it is.
fn peek_hint(path: &Path) -> Result<goblin::Hint> {
    let mut head = [0u8; 16];
    let mut file = std::fs::File::open(path).fs_context("opening binary", path)?;
    file.read_exact(&mut head).fs_context("reading binary header", path)?;
    Ok(goblin::peek_bytes(&head)?)
}

/// Lists regular files under `root` that have an execute bit and are ELF objects.
///
/// Symlinks are skipped so each binary is scanned once.
pub fn find_executables(root: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.metadata().is_ok_and(|m| has_exec_bit(&m)))
        .filter(|e| is_elf(e.path()))
        .map(|e| e.into_path())
        .collect()
}

/// Extracts resolved library file names from `ldd` output.
///
/// Only `name => /path (addr)` lines count. Unresolved (`not found`)
/// entries and lines without `=>` such as the vdso or the loader are skipped.
pub fn parse_ldd_output(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .filter_map(|line| line.split_once("=>"))
        .filter_map(|(_, target)| {
            let target = target.trim();
            if target.is_empty() || target.starts_with("not found") {
                return None;
            }
            let path = target.split_whitespace().next()?;
            if path.starts_with('(') {
                return None;
            }
            Path::new(path)
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
        })
        .collect()
}

/// Runs `ldd` on one binary and returns the libraries it resolves.
///
/// A non-zero exit (static binaries, foreign architectures) yields an
/// empty set and a warning.
pub async fn scan_executable(ldd: &Path, executable: &Path) -> Result<BTreeSet<String>> {
    let output = ToolInvocation::new(ldd).arg(executable).output().await?;
    if !output.status.success() {
        log::warn!(
            "ldd failed for {}: {}",
            executable.display(),
            combined_output(&output)
        );
        return Ok(BTreeSet::new());
    }
    Ok(parse_ldd_output(&String::from_utf8_lossy(&output.stdout)))
}
