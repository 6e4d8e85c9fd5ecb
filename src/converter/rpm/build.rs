//! rpmbuild invocation and artifact lookup.

use crate::converter::{
    error::{Error, Result},
    utils::{fs::enumerate_tree, ToolInvocation},
};
use glob::Pattern;
use std::path::{Path, PathBuf};

/// What rpmbuild produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BuildTarget {
    /// Binary package only (`-bb`).
    #[default]
    Binary,
    /// Binary and source packages (`-ba`). Copr builds from the source package.
    BinaryAndSource,
}

impl BuildTarget {
    fn flag(self) -> &'static str {
        match self {
            BuildTarget::Binary => "-bb",
            BuildTarget::BinaryAndSource => "-ba",
        }
    }
}

/// Builds the rpmbuild command for `spec` with every directory pinned
/// inside `topdir`.
///
/// `macros` is loaded first so the explicit directory overrides win.
pub fn rpmbuild_invocation(
    rpmbuild: &Path,
    topdir: &Path,
    spec: &Path,
    macros: Option<&Path>,
    target: BuildTarget,
) -> ToolInvocation {
    let mut invocation = ToolInvocation::new(rpmbuild);
    if let Some(macros) = macros {
        invocation = invocation.arg("--load").arg(macros);
    }

    let top = topdir.to_string_lossy();
    let defines = [
        ("_topdir", top.to_string()),
        ("_builddir", "%{_topdir}/BUILD".to_string()),
        ("_rpmdir", format!("{top}/RPMS")),
        ("_sourcedir", format!("{top}/SOURCES")),
        ("_specdir", format!("{top}/SPECS")),
        ("_srcrpmdir", format!("{top}/SRPMS")),
        ("_buildrootdir", format!("{top}/BUILDROOT")),
    ];
    for (name, value) in defines {
        invocation = invocation.arg("--define").arg(format!("{name} {value}"));
    }

    invocation.arg(target.flag()).arg(spec)
}

/// Runs rpmbuild. On failure the build tree is logged and the tool's
/// output is carried in the error.
pub async fn run_rpmbuild(
    rpmbuild: &Path,
    topdir: &Path,
    spec: &Path,
    macros: Option<&Path>,
    target: BuildTarget,
) -> Result<()> {
    let invocation = rpmbuild_invocation(rpmbuild, topdir, spec, macros, target);
    log::info!("Running {}", invocation.program_name());

    if let Err(e) = invocation.run().await {
        if matches!(e, Error::ToolFailed { .. }) {
            log::debug!("Build tree at failure:");
            for path in enumerate_tree(topdir) {
                log::debug!("  {}", path.display());
            }
        }
        return Err(e);
    }
    Ok(())
}

/// Finds the built package under `rpms_dir`.
///
/// Looks for `*/<name>-<version>*.rpm` first and falls back to any
/// `.rpm` below `rpms_dir` only when that finds nothing.
pub fn find_artifact(rpms_dir: &Path, name: &str, version: &str) -> Result<PathBuf> {
    let base = Pattern::escape(&rpms_dir.to_string_lossy());
    let strict = format!(
        "{base}/*/{}-{}*.rpm",
        Pattern::escape(name),
        Pattern::escape(version)
    );
    if let Some(path) = first_match(&strict)? {
        return Ok(path);
    }

    let any = format!("{base}/**/*.rpm");
    if let Some(path) = first_match(&any)? {
        log::warn!(
            "No package named {}-{} was built; using {}",
            name,
            version,
            path.display()
        );
        return Ok(path);
    }

    Err(Error::ArtifactNotFound(rpms_dir.to_path_buf()))
}

/// Finds the source package `<name>-<version>*.src.rpm` in `srpms_dir`.
pub fn find_source_package(srpms_dir: &Path, name: &str, version: &str) -> Result<PathBuf> {
    let pattern = format!(
        "{}/{}-{}*.src.rpm",
        Pattern::escape(&srpms_dir.to_string_lossy()),
        Pattern::escape(name),
        Pattern::escape(version)
    );
    first_match(&pattern)?.ok_or_else(|| Error::ArtifactNotFound(srpms_dir.to_path_buf()))
}

fn first_match(pattern: &str) -> Result<Option<PathBuf>> {
    let mut matches: Vec<PathBuf> = glob::glob(pattern)?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    matches.sort();
    Ok(matches.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"rpm").unwrap();
    }

    #[test]
    fn test_invocation_argument_order() {
        let cmd = rpmbuild_invocation(
            Path::new("rpmbuild"),
            Path::new("/tmp/top"),
            Path::new("/tmp/top/SPECS/demo.spec"),
            Some(Path::new("/home/u/.config/appimage2rpm/macros.fedora41")),
            BuildTarget::Binary,
        );
        let line = cmd.display();
        assert!(line.starts_with("rpmbuild --load /home/u/.config/appimage2rpm/macros.fedora41 --define _topdir /tmp/top"));
        assert!(line.contains("--define _rpmdir /tmp/top/RPMS"));
        assert!(line.ends_with("-bb /tmp/top/SPECS/demo.spec"));
    }

    #[test]
    fn test_invocation_without_macros() {
        let cmd = rpmbuild_invocation(
            Path::new("rpmbuild"),
            Path::new("/t"),
            Path::new("/t/s.spec"),
            None,
            BuildTarget::BinaryAndSource,
        );
        assert!(cmd.display().starts_with("rpmbuild --define _topdir /t"));
        assert!(cmd.display().contains("--define _srcrpmdir /t/SRPMS"));
        assert!(cmd.display().ends_with("-ba /t/s.spec"));
    }

    #[test]
    fn test_find_source_package() {
        let tmp = tempfile::tempdir().unwrap();
        let srpms = tmp.path().join("SRPMS");
        std::fs::create_dir_all(&srpms).unwrap();
        assert!(matches!(
            find_source_package(&srpms, "demo", "1.0.0"),
            Err(Error::ArtifactNotFound(_))
        ));

        touch(&srpms.join("demo-1.0.0-1.fc41.src.rpm"));
        assert_eq!(
            find_source_package(&srpms, "demo", "1.0.0").unwrap(),
            srpms.join("demo-1.0.0-1.fc41.src.rpm")
        );
    }

    #[test]
    fn test_find_artifact_strict_match() {
        let tmp = tempfile::tempdir().unwrap();
        let rpms = tmp.path().join("RPMS");
        touch(&rpms.join("x86_64/demo-debuginfo-1.0.0-1.x86_64.rpm"));
        touch(&rpms.join("x86_64/demo-1.0.0-1.fc41.x86_64.rpm"));
        assert_eq!(
            find_artifact(&rpms, "demo", "1.0.0").unwrap(),
            rpms.join("x86_64/demo-1.0.0-1.fc41.x86_64.rpm")
        );
    }

    #[test]
    fn test_find_artifact_falls_back_then_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let rpms = tmp.path().join("RPMS");
        std::fs::create_dir_all(&rpms).unwrap();
        assert!(matches!(
            find_artifact(&rpms, "demo", "1.0.0"),
            Err(Error::ArtifactNotFound(_))
        ));

        touch(&rpms.join("noarch/other-2.0-1.noarch.rpm"));
        assert_eq!(
            find_artifact(&rpms, "demo", "1.0.0").unwrap(),
            rpms.join("noarch/other-2.0-1.noarch.rpm")
        );
    }
}
