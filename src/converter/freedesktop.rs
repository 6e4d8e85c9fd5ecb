//! FreeDesktop.org desktop entry and icon installation.
//!
//! Icons are installed under the hicolor theme by format:
//! ```text
//! usr/share/icons/hicolor/
//!   ├── scalable/apps/{name}.svg
//!   └── {N}x{N}/apps/{name}.png
//! usr/share/pixmaps/{name}.{ext}
//! ```
//! The pixmaps copy is always made so older menus find the icon too.

use crate::converter::{
    error::{ErrorExt, Result},
    icons::{IconCandidate, IconFormat},
    metadata::ApplicationMetadata,
    utils::fs::copy_file,
};
use std::path::{Path, PathBuf};

/// Install location of desktop entries, relative to the staging root.
pub const APPLICATIONS_DIR: &str = "usr/share/applications";

/// Root of the hicolor icon theme, relative to the staging root.
pub const HICOLOR_DIR: &str = "usr/share/icons/hicolor";

/// Legacy icon directory, relative to the staging root.
pub const PIXMAPS_DIR: &str = "usr/share/pixmaps";

/// Relative install paths for `icon` when packaged as `package_name`.
pub fn icon_install_paths(icon: &IconCandidate, package_name: &str) -> Vec<PathBuf> {
    let file_name = format!("{}.{}", package_name, icon.format.extension());
    let hicolor = Path::new(HICOLOR_DIR);
    let mut paths = Vec::new();
    match icon.format {
        IconFormat::Svg => paths.push(hicolor.join("scalable/apps").join(&file_name)),
        IconFormat::Png => {
            let size = icon.effective_size();
            paths.push(hicolor.join(format!("{size}x{size}/apps")).join(&file_name));
        }
        IconFormat::Xpm | IconFormat::Ico => {}
    }
    paths.push(Path::new(PIXMAPS_DIR).join(&file_name));
    paths
}

/// Copies `icon` into the staging root and returns the relative paths written.
pub async fn install_icon(icon: &IconCandidate, stage_root: &Path, package_name: &str) -> Result<Vec<PathBuf>> {
    let paths = icon_install_paths(icon, package_name);
    for rel in &paths {
        let dest = stage_root.join(rel);
        copy_file(&icon.path, &dest).await?;
        log::debug!("Installed icon {} -> {}", icon.path.display(), dest.display());
    }
    Ok(paths)
}

/// Relative path of the installed desktop entry.
pub fn desktop_entry_path(package_name: &str) -> PathBuf {
    Path::new(APPLICATIONS_DIR).join(format!("{package_name}.desktop"))
}

/// Rewrites a bundled desktop entry for the installed layout.
///
/// `Exec` and `TryExec` point at the installed launcher in every group,
/// so `[Desktop Action …]` entries keep working once the bundle's own
/// `AppRun` is off `PATH`. Each `Exec` keeps its own arguments (field codes
/// like `%U`, action flags). `Icon` and, when given, `Name` are replaced in
/// the `[Desktop Entry]` group only. Localized keys and other lines are
/// copied unchanged.
pub fn rewrite_desktop_entry(text: &str, launcher: &str, icon_name: &str, display_name: Option<&str>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_main = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            in_main = trimmed == "[Desktop Entry]";
        }

        let rewritten = trimmed
            .split_once('=')
            .and_then(|(key, value)| match (key.trim(), in_main) {
                ("Exec", _) => Some(match exec_arguments(value.trim()) {
                    "" => format!("Exec={launcher}"),
                    args => format!("Exec={launcher} {args}"),
                }),
                ("TryExec", _) => Some(format!("TryExec={launcher}")),
                ("Icon", true) => Some(format!("Icon={icon_name}")),
                ("Name", true) => display_name.map(|name| format!("Name={name}")),
                _ => None,
            });

        out.push_str(rewritten.as_deref().unwrap_or(line));
        out.push('\n');
    }
    out
}

/// Everything after the program in an `Exec` value.
fn exec_arguments(exec: &str) -> &str {
    let rest = if let Some(quoted) = exec.strip_prefix('"') {
        quoted.split_once('"').map_or("", |(_, rest)| rest)
    } else {
        exec.split_once(char::is_whitespace).map_or("", |(_, rest)| rest)
    };
    rest.trim()
}

/// The program of an `Exec` value, unquoted.
pub fn exec_program(exec: &str) -> Option<&str> {
    let exec = exec.trim();
    let program = match exec.strip_prefix('"') {
        Some(quoted) => quoted.split_once('"').map_or(quoted, |(p, _)| p),
        None => exec.split_whitespace().next()?,
    };
    (!program.is_empty()).then_some(program)
}

/// Writes a minimal desktop entry for bundles that ship none.
pub fn generate_desktop_entry(metadata: &ApplicationMetadata, launcher: &str, icon_name: &str) -> String {
    let mut entry = String::from("[Desktop Entry]\nType=Application\n");
    entry.push_str(&format!("Name={}\n", metadata.name()));
    if let Some(generic) = metadata.generic_name.as_deref() {
        entry.push_str(&format!("GenericName={generic}\n"));
    }
    entry.push_str(&format!("Comment={}\n", metadata.summary()));
    entry.push_str(&format!("Exec={launcher}\n"));
    entry.push_str(&format!("Icon={icon_name}\n"));
    entry.push_str("Terminal=false\n");
    if !metadata.categories.is_empty() {
        entry.push_str(&format!("Categories={};\n", metadata.categories.join(";")));
    }
    entry
}

/// Installs the desktop entry for `package_name` into the staging root.
///
/// The bundle's own entry is rewritten when `source` is given, with its
/// main `Name` taken from `metadata`; otherwise one is generated from
/// `metadata`. Returns the relative path written.
pub async fn install_desktop_entry(
    source: Option<&Path>,
    metadata: &ApplicationMetadata,
    stage_root: &Path,
    package_name: &str,
) -> Result<PathBuf> {
    let launcher = format!("/usr/bin/{package_name}");
    let contents = match source {
        Some(path) => {
            let bytes = tokio::fs::read(path).await.fs_context("reading desktop entry", path)?;
            rewrite_desktop_entry(
                &String::from_utf8_lossy(&bytes),
                &launcher,
                package_name,
                metadata.name.as_deref(),
            )
        }
        None => {
            log::debug!("No desktop entry in bundle; generating one");
            generate_desktop_entry(metadata, &launcher, package_name)
        }
    };

    let rel = desktop_entry_path(package_name);
    let dest = stage_root.join(&rel);
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .fs_context("creating applications directory", parent)?;
    }
    tokio::fs::write(&dest, contents)
        .await
        .fs_context("writing desktop entry", &dest)?;
    Ok(rel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::icons::IconOrigin;

    fn candidate(path: &str) -> IconCandidate {
        IconCandidate::from_path(PathBuf::from(path), IconOrigin::Hicolor).unwrap()
    }

    #[test]
    fn test_icon_install_paths_by_format() {
        assert_eq!(
            icon_install_paths(&candidate("/t/scalable/apps/a.svg"), "demo"),
            vec![
                PathBuf::from("usr/share/icons/hicolor/scalable/apps/demo.svg"),
                PathBuf::from("usr/share/pixmaps/demo.svg"),
            ]
        );
        assert_eq!(
            icon_install_paths(&candidate("/t/128x128/apps/a.png"), "demo")[0],
            PathBuf::from("usr/share/icons/hicolor/128x128/apps/demo.png")
        );
        assert_eq!(
            icon_install_paths(&candidate("/t/a.png"), "demo")[0],
            PathBuf::from("usr/share/icons/hicolor/48x48/apps/demo.png")
        );
        assert_eq!(
            icon_install_paths(&candidate("/t/a.xpm"), "demo"),
            vec![PathBuf::from("usr/share/pixmaps/demo.xpm")]
        );
    }

    #[test]
    fn test_rewrite_desktop_entry() {
        let text = "\
[Desktop Entry]
Name=Demo
Name[de]=Beispiel
Exec=AppRun --flag %U
TryExec=AppRun
Icon=demo-icon

[Desktop Action new]
Name=New Window
Exec=AppRun --new
Icon=new-window
";
        let out = rewrite_desktop_entry(text, "/usr/bin/demo", "demo", None);
        assert!(out.contains("Exec=/usr/bin/demo --flag %U\n"));
        assert!(out.contains("TryExec=/usr/bin/demo\n"));
        assert!(out.contains("Icon=demo\n"));
        assert!(out.contains("Name=Demo\n"));
        assert!(out.contains("Exec=/usr/bin/demo --new\n"));
        assert!(!out.contains("AppRun"));
        assert!(out.contains("Name=New Window\n"));
        assert!(out.contains("Icon=new-window\n"));
    }

    #[test]
    fn test_rewrite_desktop_entry_renames_main_group() {
        let text = "[Desktop Entry]\nName=Demo\nName[de]=Beispiel\nExec=demo\n\n[Desktop Action new]\nName=New Window\n";
        let out = rewrite_desktop_entry(text, "/usr/bin/my-renamed-tool", "my-renamed-tool", Some("My Renamed Tool"));
        assert!(out.contains("Name=My Renamed Tool\n"));
        assert!(!out.contains("Name=Demo\n"));
        assert!(out.contains("Name[de]=Beispiel\n"));
        assert!(out.contains("Name=New Window\n"));
    }

    #[tokio::test]
    async fn test_install_desktop_entry_uses_metadata_name() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("demo.desktop");
        std::fs::write(&source, "[Desktop Entry]\nName=Demo\nExec=AppRun %U\nIcon=demo\n").unwrap();
        let stage = tmp.path().join("stage");
        let metadata = ApplicationMetadata {
            name: Some("My Renamed Tool".into()),
            ..Default::default()
        };

        let rel = install_desktop_entry(Some(&source), &metadata, &stage, "my-renamed-tool")
            .await
            .unwrap();
        assert_eq!(rel, PathBuf::from("usr/share/applications/my-renamed-tool.desktop"));
        let installed = std::fs::read_to_string(stage.join(rel)).unwrap();
        assert!(installed.contains("Name=My Renamed Tool\n"));
        assert!(installed.contains("Exec=/usr/bin/my-renamed-tool %U\n"));
        assert!(installed.contains("Icon=my-renamed-tool\n"));
    }

    #[test]
    fn test_exec_program_and_quoted_arguments() {
        assert_eq!(exec_program("demo %F"), Some("demo"));
        assert_eq!(exec_program("\"/opt/My App/run\" %u"), Some("/opt/My App/run"));
        assert_eq!(exec_program("  "), None);
        assert_eq!(exec_arguments("\"/opt/My App/run\" %u"), "%u");
        assert_eq!(exec_arguments("demo"), "");
    }

    #[test]
    fn test_generate_desktop_entry() {
        let metadata = ApplicationMetadata {
            name: Some("Demo".into()),
            categories: vec!["Utility".into()],
            ..Default::default()
        };
        let entry = generate_desktop_entry(&metadata, "/usr/bin/demo", "demo");
        assert!(entry.starts_with("[Desktop Entry]\n"));
        assert!(entry.contains("Exec=/usr/bin/demo\n"));
        assert!(entry.contains("Comment=Demo application\n"));
        assert!(entry.contains("Categories=Utility;\n"));
    }
}
