//! Icon discovery and selection.
//!
//! Candidates are gathered from the places bundles usually keep icons,
//! then ranked strictly by format: SVG, then PNG (largest declared size
//! first), then the remaining raster formats, then the bundle's default
//! `.DirIcon`. Ties keep discovery order.

use crate::converter::settings::InputKind;
use regex::Regex;
use std::{
    collections::HashSet,
    io::Read,
    path::{Path, PathBuf},
    sync::LazyLock,
};

/// Pixel size assumed for a PNG without a size directory.
pub const DEFAULT_PNG_SIZE: u32 = 48;

static SIZE_SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)x\d+(?:@\d+)?$").expect("icon size regex is valid"));

/// Image format of an icon file.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum IconFormat {
    /// Scalable vector graphic.
    Svg,
    /// Portable network graphic.
    Png,
    /// X pixmap.
    Xpm,
    /// Windows icon. Only picked up in directory mode.
    Ico,
}

impl IconFormat {
    /// Maps a file extension to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "svg" => Some(IconFormat::Svg),
            "png" => Some(IconFormat::Png),
            "xpm" => Some(IconFormat::Xpm),
            "ico" => Some(IconFormat::Ico),
            _ => None,
        }
    }

    /// File extension used when installing.
    pub fn extension(&self) -> &'static str {
        match self {
            IconFormat::Svg => "svg",
            IconFormat::Png => "png",
            IconFormat::Xpm => "xpm",
            IconFormat::Ico => "ico",
        }
    }

    /// Identifies a format from the first bytes of a file.
    fn sniff(path: &Path) -> Option<Self> {
        let mut head = [0u8; 256];
        let n = std::fs::File::open(path).ok()?.read(&mut head).ok()?;
        let head = &head[..n];
        if head.starts_with(b"\x89PNG") {
            Some(IconFormat::Png)
        } else if head.starts_with(b"/* XPM */") {
            Some(IconFormat::Xpm)
        } else if head.starts_with(&[0, 0, 1, 0]) {
            Some(IconFormat::Ico)
        } else if String::from_utf8_lossy(head).contains("<svg") {
            Some(IconFormat::Svg)
        } else {
            None
        }
    }
}

/// Where a candidate was found.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IconOrigin {
    /// The bundle's `.DirIcon`.
    DirIcon,
    /// A hicolor theme `apps` directory.
    Hicolor,
    /// `usr/share/pixmaps`.
    Pixmaps,
    /// A file whose name starts with the application name.
    NameMatch,
    /// The file named by the desktop entry's `Icon=` key.
    DesktopReference,
}

/// A possible application icon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IconCandidate {
    /// Location inside the working tree.
    pub path: PathBuf,
    /// Image format.
    pub format: IconFormat,
    /// Pixel size from a `WxH` path segment, if any.
    pub declared_size: Option<u32>,
    /// Discovery source.
    pub origin: IconOrigin,
}

impl IconCandidate {
    /// Builds a candidate, deriving format and size from the path.
    pub fn from_path(path: PathBuf, origin: IconOrigin) -> Option<Self> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(IconFormat::from_extension)
            .or_else(|| IconFormat::sniff(&path))?;
        let declared_size = declared_size(&path);
        Some(Self {
            path,
            format,
            declared_size,
            origin,
        })
    }

    /// Size used for ranking and install paths.
    pub fn effective_size(&self) -> u32 {
        self.declared_size.unwrap_or(DEFAULT_PNG_SIZE)
    }

    fn rank(&self) -> (u8, std::cmp::Reverse<u32>) {
        if self.origin == IconOrigin::DirIcon {
            return (3, std::cmp::Reverse(0));
        }
        match self.format {
            IconFormat::Svg => (0, std::cmp::Reverse(0)),
            IconFormat::Png => (1, std::cmp::Reverse(self.effective_size())),
            IconFormat::Xpm | IconFormat::Ico => (2, std::cmp::Reverse(0)),
        }
    }
}

/// Parses the pixel size from the last `WxH` segment of `path`.
pub fn declared_size(path: &Path) -> Option<u32> {
    path.components()
        .filter_map(|c| c.as_os_str().to_str())
        .filter_map(|segment| SIZE_SEGMENT_RE.captures(segment))
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .last()
}

/// Picks the best icon. Returns `None` only for an empty list.
pub fn select_best(candidates: &[IconCandidate]) -> Option<&IconCandidate> {
    candidates.iter().min_by_key(|c| c.rank())
}

/// Lists every icon candidate in `root`, without duplicates.
///
/// `icon_ref` is the desktop entry's `Icon=` value, a name or a path.
pub fn list_candidates(
    root: &Path,
    app_name: &str,
    icon_ref: Option<&str>,
    kind: InputKind,
) -> Vec<IconCandidate> {
    let accepts = |format: IconFormat| kind == InputKind::Directory || format != IconFormat::Ico;
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    let mut push = |path: PathBuf, origin: IconOrigin| {
        if seen.contains(&path) {
            return;
        }
        if let Some(candidate) = IconCandidate::from_path(path.clone(), origin)
            && accepts(candidate.format)
        {
            seen.insert(path);
            candidates.push(candidate);
        }
    };

    let dir_icon = root.join(".DirIcon");
    if dir_icon.is_file() {
        push(dir_icon, IconOrigin::DirIcon);
    }

    let hicolor = root.join("usr/share/icons/hicolor");
    let mut size_dirs = sorted_entries(&hicolor);
    size_dirs.sort_by_key(|dir| std::cmp::Reverse(declared_size(dir).unwrap_or(u32::MAX)));
    for size_dir in size_dirs {
        for file in sorted_entries(&size_dir.join("apps")) {
            push(file, IconOrigin::Hicolor);
        }
    }

    for file in sorted_entries(&root.join("usr/share/pixmaps")) {
        push(file, IconOrigin::Pixmaps);
    }

    let prefix = app_name.to_lowercase();
    let reference = icon_ref.and_then(|r| {
        Path::new(r)
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_lowercase)
    });
    let mut references = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_type().is_dir())
    {
        let file_name = entry.file_name().to_string_lossy().to_lowercase();
        let stem = entry
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !prefix.is_empty() && file_name.starts_with(&prefix) && has_icon_extension(entry.path()) {
            push(entry.path().to_path_buf(), IconOrigin::NameMatch);
        }
        if reference.as_deref() == Some(stem.as_str()) && has_icon_extension(entry.path()) {
            references.push(entry.into_path());
        }
    }
    for path in references {
        push(path, IconOrigin::DesktopReference);
    }

    log::debug!("Found {} icon candidates in {}", candidates.len(), root.display());
    candidates
}

fn has_icon_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(IconFormat::from_extension)
        .is_some()
}

fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut entries: Vec<PathBuf> = read_dir.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    entries.sort();
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(path: &str) -> IconCandidate {
        IconCandidate::from_path(PathBuf::from(path), IconOrigin::Hicolor).unwrap()
    }

    #[test]
    fn test_format_first_ranking() {
        let mut candidates = vec![
            candidate("usr/share/icons/hicolor/48x48/apps/a.png"),
            candidate("usr/share/pixmaps/a.xpm"),
            candidate("usr/share/icons/hicolor/scalable/apps/a.svg"),
            candidate("usr/share/icons/hicolor/128x128/apps/a.png"),
        ];
        assert_eq!(select_best(&candidates).unwrap().format, IconFormat::Svg);

        candidates.retain(|c| c.format != IconFormat::Svg);
        let best = select_best(&candidates).unwrap();
        assert_eq!(best.declared_size, Some(128));

        candidates.retain(|c| c.format != IconFormat::Png);
        assert_eq!(select_best(&candidates).unwrap().format, IconFormat::Xpm);
    }

    #[test]
    fn test_empty_list_has_no_best() {
        assert!(select_best(&[]).is_none());
    }

    #[test]
    fn test_png_without_size_counts_as_default() {
        let candidates = vec![candidate("pixmaps/a.png"), candidate("32x32/apps/a.png")];
        assert_eq!(select_best(&candidates).unwrap().path, PathBuf::from("pixmaps/a.png"));
    }

    #[test]
    fn test_declared_size() {
        assert_eq!(declared_size(Path::new("icons/hicolor/256x256/apps/x.png")), Some(256));
        assert_eq!(declared_size(Path::new("icons/hicolor/32x32@2/apps/x.png")), Some(32));
        assert_eq!(declared_size(Path::new("icons/hicolor/scalable/apps/x.svg")), None);
    }

    #[test]
    fn test_list_candidates_sources() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("usr/share/icons/hicolor/64x64/apps")).unwrap();
        std::fs::create_dir_all(root.join("usr/share/pixmaps")).unwrap();
        std::fs::create_dir_all(root.join("resources")).unwrap();
        std::fs::write(root.join(".DirIcon"), b"\x89PNG\r\n").unwrap();
        std::fs::write(root.join("usr/share/icons/hicolor/64x64/apps/demo.png"), b"").unwrap();
        std::fs::write(root.join("usr/share/pixmaps/demo.xpm"), b"").unwrap();
        std::fs::write(root.join("resources/logo.svg"), b"").unwrap();
        std::fs::write(root.join("resources/demo.ico"), b"").unwrap();

        let found = list_candidates(root, "demo", Some("logo"), InputKind::AppImage);
        let origins: Vec<_> = found.iter().map(|c| c.origin).collect();
        assert_eq!(
            origins,
            vec![
                IconOrigin::DirIcon,
                IconOrigin::Hicolor,
                IconOrigin::Pixmaps,
                IconOrigin::DesktopReference
            ]
        );
        assert_eq!(found[0].format, IconFormat::Png);
        assert_eq!(select_best(&found).unwrap().origin, IconOrigin::DesktopReference);

        let dir_mode = list_candidates(root, "demo", None, InputKind::Directory);
        assert!(dir_mode.iter().any(|c| c.format == IconFormat::Ico));
    }

    #[test]
    fn test_dir_icon_ranks_last() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(".DirIcon"), b"<svg xmlns=\"\"/>").unwrap();
        let dir_icon =
            IconCandidate::from_path(tmp.path().join(".DirIcon"), IconOrigin::DirIcon).unwrap();
        let xpm = candidate("pixmaps/demo.xpm");
        let candidates = vec![dir_icon, xpm];
        assert_eq!(select_best(&candidates).unwrap().format, IconFormat::Xpm);
    }
}
