//! Shared-library dependency analysis.
//!
//! Scans the ELF executables of a working tree with `ldd`, drops the
//! libraries the base system already ships, and maps the rest to package
//! names with a family-specific [`ProvidesQuery`].

pub mod provides;
pub mod scan;
pub mod system;

pub use provides::{query_for, AptFileSearch, DnfProvides, ProvidesQuery};
pub use system::SystemLibraries;

use crate::converter::{
    error::{ErrorExt, Result},
    profiles::DistroFamily,
};
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

/// Outcome of one dependency scan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DependencyReport {
    /// Every library resolved by `ldd` across all executables.
    pub detected: BTreeSet<String>,
    /// Detected libraries that the base system provides.
    pub system_libraries: BTreeSet<String>,
    /// Detected libraries that need a package.
    pub external: BTreeSet<String>,
    /// External library to providing package. Unmapped libraries are absent.
    pub package_mapping: BTreeMap<String, String>,
    /// Resolved package names per family id, without duplicates.
    pub requires_by_distro: BTreeMap<String, Vec<String>>,
}

impl DependencyReport {
    /// Splits `detected` against the `baseline`.
    pub fn from_detected(detected: BTreeSet<String>, baseline: &SystemLibraries) -> Self {
        let (system_libraries, external): (BTreeSet<String>, BTreeSet<String>) =
            detected.iter().cloned().partition(|lib| baseline.contains(lib));
        Self {
            detected,
            system_libraries,
            external,
            ..Default::default()
        }
    }

    /// Writes the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).fs_context("creating report directory", parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).fs_context("writing dependency report", path)?;
        Ok(())
    }
}

/// Scans every ELF executable under `root`.
pub async fn analyze(root: &Path, ldd: &Path, baseline: &SystemLibraries) -> Result<DependencyReport> {
    let executables = scan::find_executables(root);
    log::debug!("Scanning {} executables for library dependencies", executables.len());

    let mut detected = BTreeSet::new();
    for executable in &executables {
        detected.extend(scan::scan_executable(ldd, executable).await?);
    }

    let report = DependencyReport::from_detected(detected, baseline);
    log::info!(
        "Found {} libraries ({} system-excluded, {} external)",
        report.detected.len(),
        report.system_libraries.len(),
        report.external.len()
    );
    Ok(report)
}

/// Maps the report's external libraries to packages with `query` and
/// records the resolved list under the query's family.
pub async fn map_packages(report: &mut DependencyReport, query: &dyn ProvidesQuery) {
    for library in &report.external {
        match provides::lookup(query, library).await {
            Some(package) => {
                log::debug!("{} is provided by {}", library, package);
                report.package_mapping.insert(library.clone(), package);
            }
            None => log::warn!("No package found for {}; dropping it", library),
        }
    }
    let requires = dedup(report.package_mapping.values().cloned());
    report
        .requires_by_distro
        .insert(query.family().as_str().to_string(), requires);
}

/// Package names resolved for `family`. Empty when the family was never mapped.
pub fn resolve(report: &DependencyReport, family: DistroFamily) -> Vec<String> {
    report
        .requires_by_distro
        .get(family.as_str())
        .map(|requires| dedup(requires.iter().cloned()))
        .unwrap_or_default()
}

fn dedup(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::utils::ToolInvocation;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Answers from a fixed table by echoing the package name.
    struct TableQuery(BTreeMap<&'static str, &'static str>);

    impl ProvidesQuery for TableQuery {
        fn family(&self) -> DistroFamily {
            DistroFamily::Fedora
        }

        fn command(&self, library: &str) -> ToolInvocation {
            match self.0.get(library) {
                Some(pkg) => ToolInvocation::new("echo").arg(format!("{pkg}-1.0-1.fc41.x86_64 : x")),
                None => ToolInvocation::new("false"),
            }
        }

        fn parse(&self, stdout: &str) -> Option<String> {
            DnfProvides::new("dnf").parse(stdout)
        }
    }

    #[test]
    fn test_system_libraries_never_external() {
        let baseline = SystemLibraries::from_names(["libc.so.6", "libm.so.6"]);
        let report = DependencyReport::from_detected(set(&["libc.so.6", "libfoo.so.1"]), &baseline);
        assert_eq!(report.system_libraries, set(&["libc.so.6"]));
        assert_eq!(report.external, set(&["libfoo.so.1"]));
    }

    #[test]
    fn test_resolve_unknown_family_is_empty() {
        let report = DependencyReport::default();
        assert!(resolve(&report, DistroFamily::Debian).is_empty());
    }

    #[tokio::test]
    async fn test_map_packages_drops_unmapped_and_dedups() {
        let baseline = SystemLibraries::default();
        let mut report = DependencyReport::from_detected(
            set(&["libgtk-3.so.0", "libgdk-3.so.0", "libmystery.so.9"]),
            &baseline,
        );
        let query = TableQuery(BTreeMap::from([
            ("libgtk-3.so.0", "gtk3"),
            ("libgdk-3.so.0", "gtk3"),
        ]));

        map_packages(&mut report, &query).await;

        assert_eq!(report.package_mapping.len(), 2);
        assert!(!report.package_mapping.contains_key("libmystery.so.9"));
        assert_eq!(resolve(&report, DistroFamily::Fedora), vec!["gtk3".to_string()]);
    }

    #[test]
    fn test_write_json_report() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("reports/deps.json");
        let report = DependencyReport::from_detected(set(&["libfoo.so.1"]), &SystemLibraries::default());
        report.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["external"][0], "libfoo.so.1");
    }
}
