//! Package-owner queries, one strategy per distribution family.

use crate::converter::{
    profiles::DistroFamily,
    settings::ToolPaths,
    utils::ToolInvocation,
};
use regex::Regex;
use std::{path::PathBuf, sync::LazyLock, time::Duration};

/// Upper bound for a single provides query.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(60);

/// `name-version...` at the start of a `dnf provides` result line.
static DNF_PACKAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9._+-]+?)-\d").expect("dnf package regex is valid")
});

/// Debian package names.
static DEB_PACKAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9.+-]+$").expect("debian package regex is valid")
});

/// Answers "which package ships this library file" for one family.
pub trait ProvidesQuery: Send + Sync {
    /// Family this query serves.
    fn family(&self) -> DistroFamily;

    /// Command that asks the package manager about `library`.
    fn command(&self, library: &str) -> ToolInvocation;

    /// Extracts the providing package from the command's stdout.
    fn parse(&self, stdout: &str) -> Option<String>;
}

/// Runs `query` for `library`. Any failure or unparseable answer yields `None`.
pub async fn lookup(query: &dyn ProvidesQuery, library: &str) -> Option<String> {
    let invocation = query.command(library);
    let output = match tokio::time::timeout(QUERY_TIMEOUT, invocation.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            log::warn!("Package query for {} failed: {}", library, e);
            return None;
        }
        Err(_) => {
            log::warn!("Package query for {} timed out", library);
            return None;
        }
    };
    if !output.status.success() {
        log::debug!("{} found no package for {}", invocation.program_name(), library);
        return None;
    }
    query.parse(&String::from_utf8_lossy(&output.stdout))
}

/// `dnf provides <lib>` for the Fedora family.
#[derive(Clone, Debug)]
pub struct DnfProvides {
    program: PathBuf,
}

impl DnfProvides {
    /// Uses `program` as the dnf executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ProvidesQuery for DnfProvides {
    fn family(&self) -> DistroFamily {
        DistroFamily::Fedora
    }

    fn command(&self, library: &str) -> ToolInvocation {
        ToolInvocation::new(&self.program)
            .args(["-q", "provides"])
            .arg(library)
    }

    fn parse(&self, stdout: &str) -> Option<String> {
        stdout
            .lines()
            .map(str::trim)
            .find_map(|line| DNF_PACKAGE_RE.captures(line))
            .map(|caps| caps[1].to_string())
    }
}

/// `apt-file search <lib>` for the Debian family.
#[derive(Clone, Debug)]
pub struct AptFileSearch {
    program: PathBuf,
}

impl AptFileSearch {
    /// Uses `program` as the apt-file executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ProvidesQuery for AptFileSearch {
    fn family(&self) -> DistroFamily {
        DistroFamily::Debian
    }

    fn command(&self, library: &str) -> ToolInvocation {
        ToolInvocation::new(&self.program).arg("search").arg(library)
    }

    fn parse(&self, stdout: &str) -> Option<String> {
        stdout
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(package, _)| package.trim())
            .find(|package| DEB_PACKAGE_RE.is_match(package))
            .map(str::to_string)
    }
}

/// The query strategy for `family`, or `None` when the family has none.
pub fn query_for(family: DistroFamily, tools: &ToolPaths) -> Option<Box<dyn ProvidesQuery>> {
    match family {
        DistroFamily::Fedora => Some(Box::new(DnfProvides::new(&tools.dnf))),
        DistroFamily::Debian => Some(Box::new(AptFileSearch::new(&tools.apt_file))),
        DistroFamily::Unknown => None,
    }
}
