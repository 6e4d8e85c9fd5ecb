//! Application metadata and its resolution from bundle contents.
//!
//! Metadata is filled field by field from several sources. A field that
//! already holds a value is never replaced, so the order in which sources
//! are applied is the precedence order:
//!
//! 1. Caller-supplied overrides
//! 2. The bundle's desktop entry
//! 3. AppStream metainfo files
//! 4. The input filename (versions only)
//! 5. Directory-mode heuristics (version files)
//! 6. Built-in defaults

pub mod appstream;
pub mod desktop;
pub mod filename;

use crate::converter::extract::WorkingTree;
use crate::converter::settings::InputKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use desktop::DesktopEntry;

/// Version used when no source supplies one.
pub const DEFAULT_VERSION: &str = "1.0.0";
/// Release used when no source supplies one.
pub const DEFAULT_RELEASE: &str = "1";
/// License used for bundles that carry no license information.
pub const DEFAULT_LICENSE: &str = "Unspecified";
/// License assumed for plain application directories.
pub const DIRECTORY_LICENSE: &str = "Proprietary";

/// Descriptive metadata for the application being packaged.
///
/// Unset fields are `None` until a source fills them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationMetadata {
    /// Display name. The package name is derived from it by sanitizing.
    pub name: Option<String>,
    /// Human-readable generic name (e.g. "Web Browser").
    pub generic_name: Option<String>,
    /// Upstream version string.
    pub version: Option<String>,
    /// Package release number.
    pub release: Option<String>,
    /// One-line summary.
    pub summary: Option<String>,
    /// Long description.
    pub description: Option<String>,
    /// License expression.
    pub license: Option<String>,
    /// Project homepage.
    pub url: Option<String>,
    /// Desktop menu categories.
    pub categories: Vec<String>,
    /// Command line from the desktop entry.
    pub exec: Option<String>,
    /// Icon name or path from the desktop entry.
    pub icon: Option<String>,
    /// Runtime package requirements.
    pub requires: Vec<String>,
}

impl ApplicationMetadata {
    /// Fills every unset field of `self` from `other`.
    ///
    /// List fields are taken only when `self`'s list is empty.
    pub fn merge_missing(&mut self, other: ApplicationMetadata) {
        fn fill(slot: &mut Option<String>, value: Option<String>) {
            if slot.as_deref().is_none_or(|s| s.trim().is_empty())
                && let Some(value) = value.filter(|v| !v.trim().is_empty())
            {
                *slot = Some(value);
            }
        }

        fill(&mut self.name, other.name);
        fill(&mut self.generic_name, other.generic_name);
        fill(&mut self.version, other.version);
        fill(&mut self.release, other.release);
        fill(&mut self.summary, other.summary);
        fill(&mut self.description, other.description);
        fill(&mut self.license, other.license);
        fill(&mut self.url, other.url);
        fill(&mut self.exec, other.exec);
        fill(&mut self.icon, other.icon);
        if self.categories.is_empty() {
            self.categories = other.categories;
        }
        if self.requires.is_empty() {
            self.requires = other.requires;
        }
    }

    /// Appends requirements not already present, keeping order.
    pub fn add_requires<I: IntoIterator<Item = String>>(&mut self, requires: I) {
        for req in requires {
            if !self.requires.contains(&req) {
                self.requires.push(req);
            }
        }
    }

    /// Resolved display name. Empty until resolution has run.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Resolved version, or the default.
    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(DEFAULT_VERSION)
    }

    /// Resolved release, or the default.
    pub fn release(&self) -> &str {
        self.release.as_deref().unwrap_or(DEFAULT_RELEASE)
    }

    /// Resolved license, or the default.
    pub fn license(&self) -> &str {
        self.license.as_deref().unwrap_or(DEFAULT_LICENSE)
    }

    /// One-line summary, falling back to the generic name, then "<name> application".
    pub fn summary(&self) -> String {
        let text = self
            .summary
            .as_deref()
            .or(self.generic_name.as_deref())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} application", self.name()));
        text.lines().next().unwrap_or_default().trim().to_string()
    }

    /// Long description, falling back to the summary.
    pub fn description(&self) -> String {
        match self.description.as_deref() {
            Some(desc) if !desc.trim().is_empty() => desc.trim().to_string(),
            _ => self.summary(),
        }
    }
}

/// Fills `metadata` from everything the working tree offers.
///
/// Fields already set in `metadata` are left untouched. After this returns,
/// name, version, release, and license are always set.
pub fn resolve(metadata: &mut ApplicationMetadata, tree: &WorkingTree) {
    if let Some(path) = tree.desktop_file() {
        match DesktopEntry::load(path) {
            Ok(entry) => {
                log::debug!("Reading desktop entry {}", path.display());
                metadata.merge_missing(entry.to_metadata());
            }
            Err(e) => log::warn!("Ignoring unreadable desktop entry: {}", e),
        }
    } else {
        log::debug!("No desktop entry found in {}", tree.root().display());
    }

    metadata.merge_missing(appstream::scan(tree.root()));

    match tree.kind() {
        InputKind::AppImage => {
            if let Some(file_name) = tree.source().file_name().and_then(|n| n.to_str()) {
                metadata.merge_missing(ApplicationMetadata {
                    version: filename::version_from_filename(file_name),
                    ..Default::default()
                });
            }
        }
        InputKind::Directory => {
            metadata.merge_missing(ApplicationMetadata {
                version: filename::version_from_directory(tree.root()),
                license: Some(DIRECTORY_LICENSE.to_string()),
                categories: vec!["Utility".to_string()],
                ..Default::default()
            });
        }
    }

    metadata.merge_missing(defaults_for(tree.source(), tree.kind()));
}

/// Built-in fallbacks derived from the input path.
fn defaults_for(source: &Path, kind: InputKind) -> ApplicationMetadata {
    let file_name = source
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let name = match kind {
        InputKind::AppImage => filename::name_from_filename(file_name),
        InputKind::Directory => file_name.to_string(),
    };
    let name = if name.is_empty() {
        "application".to_string()
    } else {
        name
    };

    ApplicationMetadata {
        name: Some(name),
        version: Some(DEFAULT_VERSION.to_string()),
        release: Some(DEFAULT_RELEASE.to_string()),
        license: Some(DEFAULT_LICENSE.to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_never_overwrites() {
        let mut meta = ApplicationMetadata {
            name: Some("Override".into()),
            categories: vec!["Game".into()],
            ..Default::default()
        };
        meta.merge_missing(ApplicationMetadata {
            name: Some("FromDesktop".into()),
            version: Some("2.0".into()),
            categories: vec!["Utility".into()],
            ..Default::default()
        });
        assert_eq!(meta.name(), "Override");
        assert_eq!(meta.version(), "2.0");
        assert_eq!(meta.categories, vec!["Game".to_string()]);
    }

    #[test]
    fn test_merge_treats_blank_as_unset() {
        let mut meta = ApplicationMetadata {
            summary: Some("  ".into()),
            ..Default::default()
        };
        meta.merge_missing(ApplicationMetadata {
            summary: Some("Edits text".into()),
            ..Default::default()
        });
        assert_eq!(meta.summary(), "Edits text");
    }

    #[test]
    fn test_add_requires_dedups() {
        let mut meta = ApplicationMetadata {
            requires: vec!["glibc".into()],
            ..Default::default()
        };
        meta.add_requires(vec!["gtk3".into(), "glibc".into(), "gtk3".into()]);
        assert_eq!(meta.requires, vec!["glibc", "gtk3"]);
    }

    #[test]
    fn test_summary_is_single_line() {
        let meta = ApplicationMetadata {
            name: Some("demo".into()),
            summary: Some("first line\nsecond".into()),
            ..Default::default()
        };
        assert_eq!(meta.summary(), "first line");
        assert_eq!(meta.description(), "first line");

        let bare = ApplicationMetadata {
            name: Some("demo".into()),
            ..Default::default()
        };
        assert_eq!(bare.summary(), "demo application");
    }

    #[test]
    fn test_defaults_from_stem() {
        let meta = defaults_for(
            Path::new("/tmp/Demo-1.0.0-x86_64.AppImage"),
            InputKind::AppImage,
        );
        assert_eq!(meta.name(), "Demo");
        assert_eq!(meta.version(), DEFAULT_VERSION);
        assert_eq!(meta.license(), DEFAULT_LICENSE);

        let meta = defaults_for(Path::new("/opt/my-tool"), InputKind::Directory);
        assert_eq!(meta.name(), "my-tool");
    }
}
