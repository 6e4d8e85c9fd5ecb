//! Version and name inference from file names and version files.

use regex::Regex;
use std::{path::Path, sync::LazyLock};

/// Filename version patterns, tried in order. The first match wins.
static VERSION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"[-_](\d+\.\d+\.\d+(?:-\w+(?:\.\d+)?)?)-",
        r"[-_]v(\d+\.\d+\.\d+(?:-\w+(?:\.\d+)?)?)-",
        r"[-_](\d+\.\d+)-",
        r"[-_](\d+)-",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("filename version regex is valid"))
    .collect()
});

static VERSION_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.\d+(?:\.\d+)?)").expect("version file regex is valid"));

/// Names of version files probed in directory mode.
const VERSION_FILES: [&str; 3] = ["version", "VERSION", "Version"];

/// Infers a version from a bundle file name such as `app-1.2.3-x86_64.AppImage`.
pub fn version_from_filename(file_name: &str) -> Option<String> {
    VERSION_PATTERNS
        .iter()
        .find_map(|re| re.captures(file_name))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Strips the version and everything after it from a bundle file name.
///
/// `Demo-1.0.0-x86_64.AppImage` becomes `Demo`. Names without a
/// recognizable version lose only their extension.
pub fn name_from_filename(file_name: &str) -> String {
    let start = VERSION_PATTERNS
        .iter()
        .find_map(|re| re.find(file_name))
        .map(|m| m.start());

    let name = match start {
        Some(start) => &file_name[..start],
        None => Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name),
    };
    name.trim_end_matches(['-', '_']).to_string()
}

/// Reads a version from a `version` file at the root of an application directory.
pub fn version_from_directory(root: &Path) -> Option<String> {
    VERSION_FILES.iter().find_map(|name| {
        let contents = std::fs::read_to_string(root.join(name)).ok()?;
        VERSION_FILE_RE
            .captures(&contents)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_patterns() {
        assert_eq!(
            version_from_filename("app-1.0.0-x86_64.bundle").as_deref(),
            Some("1.0.0")
        );
        assert_eq!(
            version_from_filename("app-v2.1.3-x86_64.bundle").as_deref(),
            Some("2.1.3")
        );
        assert_eq!(
            version_from_filename("app_3.4-x86_64.AppImage").as_deref(),
            Some("3.4")
        );
        assert_eq!(
            version_from_filename("app-5-x86_64.bundle").as_deref(),
            Some("5")
        );
        assert_eq!(version_from_filename("app.noversion.bundle"), None);
    }

    #[test]
    fn test_prerelease_suffix() {
        assert_eq!(
            version_from_filename("Tool-1.2.3-beta.2-x86_64.AppImage").as_deref(),
            Some("1.2.3-beta.2")
        );
    }

    #[test]
    fn test_name_from_filename() {
        assert_eq!(name_from_filename("Demo-1.0.0-x86_64.AppImage"), "Demo");
        assert_eq!(name_from_filename("my_tool-v2.0.1-x86_64.AppImage"), "my_tool");
        assert_eq!(name_from_filename("Plain.AppImage"), "Plain");
    }

    #[test]
    fn test_version_from_directory() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(version_from_directory(tmp.path()), None);

        std::fs::write(tmp.path().join("VERSION"), "release 4.5.6\n").unwrap();
        assert_eq!(version_from_directory(tmp.path()).as_deref(), Some("4.5.6"));
    }
}
