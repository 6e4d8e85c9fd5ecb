//! AppStream metainfo scanning.
//!
//! Metainfo files are matched with a handful of patterns rather than parsed
//! as full XML. Only the unlocalized summary and description are taken.

use super::ApplicationMetadata;
use regex::Regex;
use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

/// Directories searched for metainfo files, relative to the content root.
pub const METAINFO_DIRS: [&str; 2] = ["usr/share/metainfo", "usr/share/appdata"];

static RELEASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<release\b[^>]*\bversion="([^"]+)""#).expect("valid regex"));
static HOMEPAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<url\s+type="homepage"\s*>([^<]+)</url>"#).expect("valid regex"));
static LICENSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<project_license>([^<]+)</project_license>").expect("valid regex"));
static SUMMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<summary>([^<]+)</summary>").expect("valid regex"));
static DESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<description>(.*?)</description>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Extracts metadata from one metainfo document.
pub fn parse(xml: &str) -> ApplicationMetadata {
    let capture = |re: &Regex| {
        re.captures(xml)
            .and_then(|c| c.get(1))
            .map(|m| unescape(m.as_str().trim()))
            .filter(|s| !s.is_empty())
    };

    let description = DESCRIPTION_RE
        .captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| {
            let text = TAG_RE.replace_all(m.as_str(), "\n");
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(unescape)
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|s| !s.is_empty());

    ApplicationMetadata {
        version: capture(&RELEASE_RE),
        url: capture(&HOMEPAGE_RE),
        license: capture(&LICENSE_RE),
        summary: capture(&SUMMARY_RE),
        description,
        ..Default::default()
    }
}

/// Scans all metainfo files under `root`, merging in file-name order.
pub fn scan(root: &Path) -> ApplicationMetadata {
    let mut merged = ApplicationMetadata::default();
    for path in metainfo_files(root) {
        match std::fs::read(&path) {
            Ok(bytes) => {
                log::debug!("Reading AppStream metadata {}", path.display());
                merged.merge_missing(parse(&String::from_utf8_lossy(&bytes)));
            }
            Err(e) => log::warn!("Skipping unreadable metainfo {}: {}", path.display(), e),
        }
    }
    merged
}

fn metainfo_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for dir in METAINFO_DIRS {
        let Ok(read_dir) = std::fs::read_dir(root.join(dir)) else {
            continue;
        };
        let mut found: Vec<PathBuf> = read_dir
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "xml"))
            .collect();
        found.sort();
        files.extend(found);
    }
    files
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const METAINFO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<component type="desktop-application">
  <id>org.example.Demo</id>
  <project_license>GPL-3.0-or-later</project_license>
  <summary>Draw &amp; paint</summary>
  <summary xml:lang="de">Zeichnen</summary>
  <description>
    <p>Demo is a painting program.</p>
    <p>It has layers.</p>
  </description>
  <url type="bugtracker">https://example.org/bugs</url>
  <url type="homepage">https://example.org</url>
  <releases>
    <release version="3.1.0" date="2024-01-01"/>
    <release version="3.0.0" date="2023-01-01"/>
  </releases>
</component>
"#;

    #[test]
    fn test_parse_fields() {
        let meta = parse(METAINFO);
        assert_eq!(meta.version.as_deref(), Some("3.1.0"));
        assert_eq!(meta.url.as_deref(), Some("https://example.org"));
        assert_eq!(meta.license.as_deref(), Some("GPL-3.0-or-later"));
        assert_eq!(meta.summary.as_deref(), Some("Draw & paint"));
        assert_eq!(
            meta.description.as_deref(),
            Some("Demo is a painting program.\nIt has layers.")
        );
    }

    #[test]
    fn test_scan_reads_metainfo_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("usr/share/metainfo");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("demo.appdata.xml"), METAINFO).unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let meta = scan(tmp.path());
        assert_eq!(meta.license.as_deref(), Some("GPL-3.0-or-later"));
    }

    #[test]
    fn test_scan_without_metainfo_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(scan(tmp.path()), ApplicationMetadata::default());
    }
}
