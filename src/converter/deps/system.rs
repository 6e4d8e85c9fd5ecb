//! Baseline of shared libraries already present on the host.

use std::{
    collections::BTreeSet,
    path::PathBuf,
};

/// Library directories scanned for the baseline.
pub const SYSTEM_LIBRARY_DIRS: [&str; 4] = ["/lib", "/lib64", "/usr/lib", "/usr/lib64"];

/// Shared-library file names assumed to be provided by the base system.
///
/// Built once and treated as read-only afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SystemLibraries {
    names: BTreeSet<String>,
}

impl SystemLibraries {
    /// Scans the standard library directories of the host.
    pub fn scan_host() -> Self {
        let dirs: Vec<PathBuf> = SYSTEM_LIBRARY_DIRS.iter().map(PathBuf::from).collect();
        let libraries = Self::scan(&dirs);
        log::debug!("Loaded {} system libraries", libraries.len());
        libraries
    }

    /// Scans `dirs` recursively for `*.so` and `*.so.*` files and symlinks.
    pub fn scan(dirs: &[PathBuf]) -> Self {
        let names = dirs
            .iter()
            .filter(|d| d.is_dir())
            .flat_map(|dir| {
                walkdir::WalkDir::new(dir)
                    .follow_links(false)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| !e.file_type().is_dir())
                    .filter_map(|e| e.file_name().to_str().map(str::to_string))
                    .filter(|name| is_shared_library_name(name))
            })
            .collect();
        Self { names }
    }

    /// Builds a baseline from explicit names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `library` is part of the baseline.
    pub fn contains(&self, library: &str) -> bool {
        self.names.contains(library)
    }

    /// Number of libraries in the baseline.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the baseline is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// `libfoo.so` or `libfoo.so.1.2`.
pub fn is_shared_library_name(name: &str) -> bool {
    name.ends_with(".so") || name.contains(".so.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_library_names() {
        assert!(is_shared_library_name("libc.so.6"));
        assert!(is_shared_library_name("libfoo.so"));
        assert!(!is_shared_library_name("libfoo.a"));
        assert!(!is_shared_library_name("resolve.sock"));
    }

    #[test]
    fn test_scan_collects_files_and_symlinks() {
        let tmp = tempfile::tempdir().unwrap();
        let lib = tmp.path().join("lib64");
        std::fs::create_dir_all(lib.join("nested")).unwrap();
        std::fs::write(lib.join("libc.so.6"), b"").unwrap();
        std::fs::write(lib.join("nested/libz.so.1.3"), b"").unwrap();
        std::fs::write(lib.join("README"), b"").unwrap();
        std::os::unix::fs::symlink("libc.so.6", lib.join("libc.so")).unwrap();

        let baseline = SystemLibraries::scan(&[lib, tmp.path().join("missing")]);
        assert_eq!(baseline.len(), 3);
        assert!(baseline.contains("libc.so"));
        assert!(baseline.contains("libz.so.1.3"));
        assert!(!baseline.contains("README"));
    }
}
