//! Desktop entry (`.desktop`) parsing.
//!
//! Only the `[Desktop Entry]` group is read. Localized keys such as
//! `Name[de]` are kept apart from their base key and never replace it.

use super::ApplicationMetadata;
use crate::converter::error::{ErrorExt, Result};
use std::{collections::BTreeMap, path::Path};

const MAIN_GROUP: &str = "Desktop Entry";

/// Key/value pairs of a desktop entry's main group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesktopEntry {
    entries: BTreeMap<String, String>,
}

impl DesktopEntry {
    /// Reads and parses a desktop entry file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).fs_context("reading desktop entry", path)?;
        Ok(Self::parse(&String::from_utf8_lossy(&bytes)))
    }

    /// Parses desktop entry text.
    ///
    /// The first occurrence of a key wins. Comments, blank lines, and
    /// lines without `=` are skipped.
    pub fn parse(text: &str) -> Self {
        let mut entries = BTreeMap::new();
        let mut in_main = false;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                in_main = &line[1..line.len() - 1] == MAIN_GROUP;
                continue;
            }
            if !in_main {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                entries
                    .entry(key.trim().to_string())
                    .or_insert_with(|| value.trim().to_string());
            }
        }

        Self { entries }
    }

    /// Returns the value of an unlocalized key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Splits the `Categories` list on `;` or `,`.
    pub fn categories(&self) -> Vec<String> {
        self.get("Categories")
            .map(|c| {
                c.split([';', ','])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Maps the entry onto metadata fields.
    ///
    /// `X-AppImage-Name` and `X-AppImage-Version` take precedence over
    /// `Name`. The plain `Version` key describes the entry format, not the
    /// application, and is not used.
    pub fn to_metadata(&self) -> ApplicationMetadata {
        let owned = |key: &str| self.get(key).map(str::to_string);

        ApplicationMetadata {
            name: owned("X-AppImage-Name").or_else(|| owned("Name")),
            generic_name: owned("GenericName"),
            version: owned("X-AppImage-Version"),
            summary: owned("Comment"),
            categories: self.categories(),
            exec: owned("Exec"),
            icon: owned("Icon"),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# comment
[Desktop Entry]
Type=Application
Name[de]=Beispiel
Name=Example App
GenericName=Text Editor
Comment=Edits things
Exec=example %U
Icon=example
Categories=Utility;TextEditor;
Version=1.0
X-AppImage-Version=2.3.4

[Desktop Action new-window]
Name=New Window
Exec=example --new-window
";

    #[test]
    fn test_parse_main_group_only() {
        let entry = DesktopEntry::parse(SAMPLE);
        assert_eq!(entry.get("Name"), Some("Example App"));
        assert_eq!(entry.get("Exec"), Some("example %U"));
        assert_eq!(entry.get("Name[de]"), Some("Beispiel"));
    }

    #[test]
    fn test_localized_name_does_not_replace_base() {
        let entry = DesktopEntry::parse("[Desktop Entry]\nName[fr]=Exemple\nName=Example\n");
        assert_eq!(entry.to_metadata().name.as_deref(), Some("Example"));
    }

    #[test]
    fn test_to_metadata() {
        let meta = DesktopEntry::parse(SAMPLE).to_metadata();
        assert_eq!(meta.name.as_deref(), Some("Example App"));
        assert_eq!(meta.version.as_deref(), Some("2.3.4"));
        assert_eq!(meta.summary.as_deref(), Some("Edits things"));
        assert_eq!(meta.generic_name.as_deref(), Some("Text Editor"));
        assert_eq!(meta.categories, vec!["Utility", "TextEditor"]);
        assert_eq!(meta.icon.as_deref(), Some("example"));
    }

    #[test]
    fn test_appimage_name_wins() {
        let entry = DesktopEntry::parse("[Desktop Entry]\nName=Short\nX-AppImage-Name=Long Name\n");
        assert_eq!(entry.to_metadata().name.as_deref(), Some("Long Name"));
    }

    #[test]
    fn test_format_version_is_ignored() {
        let entry = DesktopEntry::parse("[Desktop Entry]\nName=X\nVersion=1.0\n");
        assert_eq!(entry.to_metadata().version, None);
    }
}
