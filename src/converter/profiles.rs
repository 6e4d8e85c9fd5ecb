//! Distribution profiles.
//!
//! A profile describes one target distribution release: its os-release
//! identity, the packages it needs, and an RPM macro template. Profiles
//! come from `distros.toml` (user config dir, then `/etc/appimage2rpm`)
//! layered over a built-in set that always contains [`DEFAULT_PROFILE_ID`].

use crate::converter::error::{ErrorExt, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Profile used when the host cannot be matched to any profile.
pub const DEFAULT_PROFILE_ID: &str = "fedora41";

/// Name of the profile definitions file.
pub const PROFILES_FILE: &str = "distros.toml";

/// Directory name used under the user and system config dirs.
pub const CONFIG_DIR_NAME: &str = "appimage2rpm";

/// Family of distributions sharing one package-owner query dialect.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum DistroFamily {
    /// Fedora, RHEL, CentOS and rebuilds; queried with `dnf provides`.
    Fedora,
    /// Debian and Ubuntu; queried with `apt-file search`.
    Debian,
    /// Anything else. No package mapping is attempted.
    Unknown,
}

impl DistroFamily {
    /// Maps an os-release `ID` to its family.
    pub fn from_distro_id(id: &str) -> Self {
        match id {
            "fedora" | "rhel" | "centos" | "rocky" | "almalinux" => DistroFamily::Fedora,
            "debian" | "ubuntu" => DistroFamily::Debian,
            _ => DistroFamily::Unknown,
        }
    }

    /// Stable identifier used as a key in dependency reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            DistroFamily::Fedora => "fedora",
            DistroFamily::Debian => "debian",
            DistroFamily::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DistroFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One target distribution release.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionProfile {
    /// Profile id, e.g. `fedora41`. Taken from the table key in TOML.
    #[serde(skip)]
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// os-release `ID` of the distribution.
    #[serde(alias = "id")]
    pub distro: String,
    /// os-release `VERSION_ID`.
    pub version: String,
    /// Package lists by purpose (`build`, `runtime`).
    #[serde(default)]
    pub packages: BTreeMap<String, Vec<String>>,
    /// Contents of the RPM macro file for this target.
    #[serde(default)]
    pub macro_template: String,
}

impl DistributionProfile {
    /// The package-query family of this profile's distribution.
    pub fn family(&self) -> DistroFamily {
        DistroFamily::from_distro_id(&self.distro)
    }
}

/// Identity fields read from an os-release file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OsRelease {
    /// `ID`
    pub id: Option<String>,
    /// `VERSION_ID`
    pub version_id: Option<String>,
}

impl OsRelease {
    /// Parses os-release text. Values may be single- or double-quoted.
    pub fn parse(text: &str) -> Self {
        let mut release = OsRelease::default();
        for line in text.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'').to_string();
            match key.trim() {
                "ID" => release.id = Some(value),
                "VERSION_ID" => release.version_id = Some(value),
                _ => {}
            }
        }
        release
    }

    /// Reads the host's os-release file.
    pub fn from_host() -> Option<Self> {
        ["/etc/os-release", "/usr/lib/os-release"]
            .iter()
            .find_map(|p| std::fs::read_to_string(p).ok())
            .map(|text| Self::parse(&text))
    }
}

/// The set of known distribution profiles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileStore {
    profiles: BTreeMap<String, DistributionProfile>,
    config_dir: Option<PathBuf>,
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProfileStore {
    /// The built-in profiles.
    pub fn builtin() -> Self {
        let build = ["rpm-build", "rpmdevtools", "createrepo"];
        let runtime = ["dnf", "glibc"];
        let profiles = [
            ("fedora40", "Fedora 40", "fedora", "40", "%dist .fc40\n%fedora 40\n"),
            ("fedora41", "Fedora 41", "fedora", "41", "%dist .fc41\n%fedora 41\n"),
            ("rhel9", "RHEL 9", "rhel", "9", "%dist .el9\n%rhel 9\n"),
            ("centos9", "CentOS 9 Stream", "centos", "9", "%dist .el9\n%rhel 9\n%centos 9\n"),
            ("debian12", "Debian 12", "debian", "12", "%dist .deb12\n"),
            ("ubuntu24", "Ubuntu 24.04", "ubuntu", "24.04", "%dist .ubuntu2404\n"),
        ]
        .into_iter()
        .map(|(id, name, distro, version, dist_macros)| {
            let packages = BTreeMap::from([
                ("build".to_string(), build.iter().map(|s| s.to_string()).collect()),
                ("runtime".to_string(), runtime.iter().map(|s| s.to_string()).collect()),
            ]);
            let macro_template = format!(
                "# {name} RPM macros\n%_topdir %(echo $HOME)/rpmbuild\n{dist_macros}%__os_install_post %{{nil}}\n%_build_id_links none\n"
            );
            let profile = DistributionProfile {
                id: id.to_string(),
                name: name.to_string(),
                distro: distro.to_string(),
                version: version.to_string(),
                packages,
                macro_template,
            };
            (id.to_string(), profile)
        })
        .collect();

        Self {
            profiles,
            config_dir: user_config_dir(),
        }
    }

    /// Loads profiles from the first `distros.toml` found in the config
    /// search path, layered over the built-ins.
    ///
    /// An unreadable or malformed file is reported and skipped.
    pub fn load() -> Self {
        let mut store = Self::builtin();
        for path in config_search_path(PROFILES_FILE) {
            if !path.exists() {
                continue;
            }
            match std::fs::read_to_string(&path)
                .fs_context("reading profiles", &path)
                .and_then(|text| Self::parse_profiles(&text))
            {
                Ok(profiles) => {
                    log::debug!("Loaded {} profiles from {}", profiles.len(), path.display());
                    store.profiles.extend(profiles);
                    return store;
                }
                Err(e) => log::warn!("Ignoring profile file {}: {}", path.display(), e),
            }
        }
        store
    }

    /// Builds a store from TOML text layered over the built-ins.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut store = Self::builtin();
        store.profiles.extend(Self::parse_profiles(text)?);
        Ok(store)
    }

    fn parse_profiles(text: &str) -> Result<BTreeMap<String, DistributionProfile>> {
        let mut profiles: BTreeMap<String, DistributionProfile> = toml::from_str(text)?;
        for (id, profile) in profiles.iter_mut() {
            profile.id = id.clone();
        }
        Ok(profiles)
    }

    /// Directory that receives macro files. Defaults to the user config dir.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Looks up a profile by id.
    pub fn get(&self, id: &str) -> Option<&DistributionProfile> {
        self.profiles.get(id)
    }

    /// All profiles in id order.
    pub fn iter(&self) -> impl Iterator<Item = &DistributionProfile> {
        self.profiles.values()
    }

    /// Number of known profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the store is empty. Never true for a store built here.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Picks the profile matching the host.
    pub fn detect_current(&self) -> String {
        match OsRelease::from_host() {
            Some(release) => self.detect_from(&release),
            None => {
                log::warn!("No os-release file found; using {}", DEFAULT_PROFILE_ID);
                DEFAULT_PROFILE_ID.to_string()
            }
        }
    }

    /// Picks the profile for `release`: exact id and version, then id
    /// alone, then [`DEFAULT_PROFILE_ID`].
    pub fn detect_from(&self, release: &OsRelease) -> String {
        let Some(id) = release.id.as_deref() else {
            return DEFAULT_PROFILE_ID.to_string();
        };

        if let Some(version) = release.version_id.as_deref()
            && let Some(profile) = self
                .iter()
                .find(|p| p.distro == id && p.version == version)
        {
            return profile.id.clone();
        }

        if let Some(profile) = self.iter().find(|p| p.distro == id) {
            return profile.id.clone();
        }

        log::warn!("No profile matches distribution '{}'; using {}", id, DEFAULT_PROFILE_ID);
        DEFAULT_PROFILE_ID.to_string()
    }

    /// Writes `macros.<id>` into the config dir and returns its path.
    ///
    /// Returns `None` if the profile is unknown or the file cannot be written.
    pub fn create_build_macros(&self, id: &str) -> Option<PathBuf> {
        let profile = self.get(id)?;
        let dir = self.config_dir.as_ref()?;
        let path = dir.join(format!("macros.{id}"));

        let written = std::fs::create_dir_all(dir)
            .fs_context("creating config directory", dir)
            .and_then(|_| {
                std::fs::write(&path, &profile.macro_template).fs_context("writing macro file", &path)
            });
        match written {
            Ok(()) => Some(path),
            Err(e) => {
                log::warn!("Could not write build macros for {}: {}", id, e);
                None
            }
        }
    }

    /// Serializes all profiles to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(&self.profiles)
            .map_err(|e| crate::converter::Error::GenericError(format!("serializing profiles: {e}")))
    }

    /// Writes all profiles to `distros.toml` in the config dir.
    pub fn save(&self) -> Result<PathBuf> {
        use crate::converter::error::Context;

        let dir = self
            .config_dir
            .as_ref()
            .context("no user config directory available")?;
        std::fs::create_dir_all(dir).fs_context("creating config directory", dir)?;
        let path = dir.join(PROFILES_FILE);
        std::fs::write(&path, self.to_toml()?).fs_context("writing profiles", &path)?;
        Ok(path)
    }
}

/// `~/.config/appimage2rpm`, if a config dir exists for this user.
pub fn user_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME))
}

/// Candidate locations for `file_name`, most specific first.
pub fn config_search_path(file_name: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = user_config_dir() {
        paths.push(dir.join(file_name));
    }
    paths.push(Path::new("/etc").join(CONFIG_DIR_NAME).join(file_name));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(id: &str, version: &str) -> OsRelease {
        OsRelease {
            id: Some(id.into()),
            version_id: Some(version.into()),
        }
    }

    #[test]
    fn test_builtin_contains_default() {
        let store = ProfileStore::builtin();
        assert!(store.get(DEFAULT_PROFILE_ID).is_some());
        assert_eq!(store.get("rhel9").unwrap().family(), DistroFamily::Fedora);
        assert_eq!(store.get("ubuntu24").unwrap().family(), DistroFamily::Debian);
    }

    #[test]
    fn test_detect_exact_then_family_then_default() {
        let store = ProfileStore::builtin();
        assert_eq!(store.detect_from(&release("fedora", "40")), "fedora40");
        assert_eq!(store.detect_from(&release("centos", "9")), "centos9");
        // Unknown release of a known distro falls back to any profile of that distro
        assert!(store.detect_from(&release("fedora", "99")).starts_with("fedora"));
        assert_eq!(store.detect_from(&release("arch", "rolling")), DEFAULT_PROFILE_ID);
        assert_eq!(store.detect_from(&OsRelease::default()), DEFAULT_PROFILE_ID);
    }

    #[test]
    fn test_parse_os_release() {
        let parsed = OsRelease::parse("NAME=\"Fedora Linux\"\nID=fedora\nVERSION_ID='41'\n# x\n");
        assert_eq!(parsed, release("fedora", "41"));
    }

    #[test]
    fn test_toml_profiles_layer_over_builtins() {
        let store = ProfileStore::from_toml_str(
            r#"
[fedora42]
name = "Fedora 42"
id = "fedora"
version = "42"
macro_template = "%dist .fc42\n"

[fedora42.packages]
runtime = ["glibc"]
"#,
        )
        .unwrap();
        let profile = store.get("fedora42").unwrap();
        assert_eq!(profile.id, "fedora42");
        assert_eq!(profile.distro, "fedora");
        assert!(store.get(DEFAULT_PROFILE_ID).is_some());
        assert_eq!(store.detect_from(&release("fedora", "42")), "fedora42");
    }

    #[test]
    fn test_create_build_macros() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ProfileStore::builtin().with_config_dir(tmp.path());

        let path = store.create_build_macros("rhel9").unwrap();
        assert_eq!(path, tmp.path().join("macros.rhel9"));
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("%dist .el9"));
        assert!(text.contains("%_build_id_links none"));

        assert!(store.create_build_macros("nope").is_none());
    }

    #[test]
    fn test_save_round_trips_through_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ProfileStore::builtin().with_config_dir(tmp.path());
        let path = store.save().unwrap();
        let reloaded = ProfileStore::from_toml_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(reloaded.get("centos9").unwrap().distro, "centos");
    }
}
