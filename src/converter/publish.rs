//! Repository publishing.
//!
//! Each repository profile has a kind that selects the strategy:
//!
//! - `local`: a directory with `RPMS/` and `SRPMS/`, refreshed with
//!   `createrepo_c` (or `createrepo`)
//! - `copr`: a Copr build submitted with `copr-cli` from the source package
//! - `obs`: an Open Build Service package committed with `osc`
//!
//! Profile commands are argument-vector templates. Placeholders such as
//! `{rpm_path}` or `{srpm_path}` are substituted per argument and nothing is run through a
//! shell, so package names and paths are never interpreted.

use crate::converter::{
    error::{Error, ErrorExt, Result},
    profiles::{config_search_path, user_config_dir},
    settings::ToolPaths,
    utils::{fs::copy_file, ToolInvocation},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Name of the repository profile file.
pub const REPOS_FILE: &str = "repos.toml";

/// Repository name used when none is given.
pub const DEFAULT_REPO_NAME: &str = "appimage2rpm";

/// OBS project used when none is given.
pub const DEFAULT_OBS_PROJECT: &str = "home:appimage2rpm";

/// Repository strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoKind {
    /// Local createrepo directory.
    #[serde(alias = "createrepo")]
    Local,
    /// Fedora Copr.
    Copr,
    /// Open Build Service.
    Obs,
}

impl RepoKind {
    /// Lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoKind::Local => "local",
            RepoKind::Copr => "copr",
            RepoKind::Obs => "obs",
        }
    }
}

impl std::str::FromStr for RepoKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "createrepo" => Ok(RepoKind::Local),
            "copr" => Ok(RepoKind::Copr),
            "obs" => Ok(RepoKind::Obs),
            other => Err(Error::UnknownRepoProfile(other.to_string())),
        }
    }
}

impl std::fmt::Display for RepoKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named repository definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoProfile {
    /// Profile id, taken from the TOML table key.
    #[serde(skip)]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Strategy.
    #[serde(rename = "type")]
    pub kind: RepoKind,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Command templates by step (`add`, `update`, `build`, `checkout`, `commit`).
    #[serde(default)]
    pub commands: BTreeMap<String, Vec<String>>,
}

impl RepoProfile {
    fn command(&self, step: &str) -> Option<&[String]> {
        self.commands.get(step).map(Vec::as_slice).filter(|c| !c.is_empty())
    }

    /// Whether publishing needs a source package: any command takes `{srpm_path}`.
    pub fn needs_source_package(&self) -> bool {
        self.commands
            .values()
            .flatten()
            .any(|arg| arg.contains("{srpm_path}"))
    }
}

/// The set of known repository profiles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoStore {
    profiles: BTreeMap<String, RepoProfile>,
}

impl Default for RepoStore {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RepoStore {
    /// Built-in `local`, `copr` and `obs` profiles.
    pub fn builtin() -> Self {
        let argv = |args: &[&str]| args.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let profiles = [
            RepoProfile {
                id: "local".into(),
                name: "Local repository".into(),
                kind: RepoKind::Local,
                description: "Local RPM repository maintained with createrepo".into(),
                commands: BTreeMap::new(),
            },
            RepoProfile {
                id: "copr".into(),
                name: "Fedora Copr".into(),
                kind: RepoKind::Copr,
                description: "Fedora Copr build service".into(),
                commands: BTreeMap::from([(
                    "build".to_string(),
                    argv(&["copr-cli", "build", "{repo_name}", "{srpm_path}"]),
                )]),
            },
            RepoProfile {
                id: "obs".into(),
                name: "Open Build Service".into(),
                kind: RepoKind::Obs,
                description: "openSUSE Open Build Service".into(),
                commands: BTreeMap::from([
                    ("checkout".to_string(), argv(&["osc", "checkout", "{project}/{pkg_name}"])),
                    ("add".to_string(), argv(&["osc", "add", "{rpm_file}"])),
                    (
                        "commit".to_string(),
                        argv(&["osc", "commit", "-m", "Import {rpm_file} from appimage2rpm"]),
                    ),
                ]),
            },
        ]
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();
        Self { profiles }
    }

    /// Loads `repos.toml` from the config search path over the built-ins.
    pub fn load() -> Self {
        let mut store = Self::builtin();
        for path in config_search_path(REPOS_FILE) {
            if !path.exists() {
                continue;
            }
            match std::fs::read_to_string(&path)
                .fs_context("reading repository profiles", &path)
                .and_then(|text| Self::parse_profiles(&text))
            {
                Ok(profiles) => {
                    log::debug!("Loaded {} repository profiles from {}", profiles.len(), path.display());
                    store.profiles.extend(profiles);
                    return store;
                }
                Err(e) => log::warn!("Ignoring repository file {}: {}", path.display(), e),
            }
        }
        store
    }

    /// Builds a store from TOML text over the built-ins.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut store = Self::builtin();
        store.profiles.extend(Self::parse_profiles(text)?);
        Ok(store)
    }

    fn parse_profiles(text: &str) -> Result<BTreeMap<String, RepoProfile>> {
        let mut profiles: BTreeMap<String, RepoProfile> = toml::from_str(text)?;
        for (id, profile) in profiles.iter_mut() {
            profile.id = id.clone();
        }
        Ok(profiles)
    }

    /// Looks up a profile.
    pub fn get(&self, id: &str) -> Option<&RepoProfile> {
        self.profiles.get(id)
    }

    /// All profiles in id order.
    pub fn iter(&self) -> impl Iterator<Item = &RepoProfile> {
        self.profiles.values()
    }
}

/// Where and how to publish one package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoDescriptor {
    /// Repository profile id.
    pub profile: String,
    /// Repository name (Copr project, `.repo` section).
    pub repo_name: String,
    /// Local repository directory.
    pub repo_path: PathBuf,
    /// OBS project.
    pub project: String,
}

impl RepoDescriptor {
    /// Describes `repo_name` published with `profile`, with default locations.
    pub fn new(profile: impl Into<String>, repo_name: impl Into<String>) -> Self {
        let repo_name = repo_name.into();
        Self {
            profile: profile.into(),
            repo_path: default_repo_path(&repo_name),
            repo_name,
            project: DEFAULT_OBS_PROJECT.to_string(),
        }
    }

    /// Overrides the local repository directory.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.repo_path = path.into();
        self
    }

    /// Overrides the OBS project.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }
}

/// `~/rpmbuild/repos/<name>`
pub fn default_repo_path(repo_name: &str) -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("rpmbuild/repos")
        .join(repo_name)
}

/// Package name encoded in an RPM file name (`name-version-release.arch.rpm`).
pub fn package_name_from_file(rpm: &Path) -> Option<String> {
    let file_name = rpm.file_name()?.to_str()?;
    let stem = file_name.strip_suffix(".rpm")?;
    let mut parts = stem.rsplitn(3, '-');
    let (_release, _version, name) = (parts.next()?, parts.next()?, parts.next()?);
    Some(name.to_string())
}

/// Creates a local repository layout and its `.repo` file.
pub async fn create_repository(repo_path: &Path, repo_name: &str, description: Option<&str>) -> Result<PathBuf> {
    for sub in ["RPMS", "SRPMS"] {
        let dir = repo_path.join(sub);
        tokio::fs::create_dir_all(&dir)
            .await
            .fs_context("creating repository directory", &dir)?;
    }

    let repo_file = repo_path.join(format!("{repo_name}.repo"));
    let contents = format!(
        "[{repo_name}]\nname={}\nbaseurl=file://{}/RPMS\nenabled=1\ngpgcheck=0\n",
        description.unwrap_or(repo_name),
        repo_path.display()
    );
    tokio::fs::write(&repo_file, contents)
        .await
        .fs_context("writing repository file", &repo_file)?;

    log::info!("Created repository at {}", repo_path.display());
    Ok(repo_path.to_path_buf())
}

/// Copies `package` into `RPMS/`, or `SRPMS/` for source packages.
pub async fn add_package(repo_path: &Path, package: &Path) -> Result<PathBuf> {
    if !package.is_file() {
        return Err(Error::InputNotFound(package.to_path_buf()));
    }
    let file_name = package
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| n.ends_with(".rpm"))
        .ok_or_else(|| Error::InvalidInput {
            path: package.to_path_buf(),
            reason: "not an RPM package".into(),
        })?;

    let subdir = if file_name.ends_with(".src.rpm") { "SRPMS" } else { "RPMS" };
    let dest = repo_path.join(subdir).join(file_name);
    copy_file(package, &dest).await?;
    log::info!("Added {} to {}", file_name, repo_path.display());
    Ok(dest)
}

/// Regenerates repository metadata for `RPMS/`.
pub async fn update_metadata(repo_path: &Path, tools: &ToolPaths) -> Result<()> {
    let rpms = repo_path.join("RPMS");
    if !rpms.is_dir() {
        return Err(Error::InvalidInput {
            path: rpms,
            reason: "repository has no RPMS directory".into(),
        });
    }
    let createrepo = tools
        .createrepo()
        .ok_or_else(|| Error::ToolNotFound("createrepo_c".into()))?;
    ToolInvocation::new(createrepo)
        .arg("--update")
        .arg(&rpms)
        .run()
        .await?;
    log::info!("Updated repository metadata in {}", rpms.display());
    Ok(())
}

/// `/etc/yum.repos.d` snippet for a repository. `None` for OBS.
pub fn repo_config(kind: RepoKind, repo_name: &str, repo_path: Option<&Path>) -> Option<String> {
    match kind {
        RepoKind::Local => {
            let path = repo_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| default_repo_path(repo_name));
            Some(format!(
                "[{repo_name}]\n\
                 name={repo_name} - appimage2rpm local repository\n\
                 baseurl=file://{}/RPMS\n\
                 enabled=1\n\
                 gpgcheck=0\n",
                path.display()
            ))
        }
        RepoKind::Copr => Some(format!(
            "[copr:{repo_name}]\n\
             name=Copr repo for {repo_name}\n\
             baseurl=https://copr-be.cloud.fedoraproject.org/results/{repo_name}/fedora-$releasever-$basearch/\n\
             type=rpm-md\n\
             skip_if_unavailable=True\n\
             gpgcheck=1\n\
             gpgkey=https://copr-be.cloud.fedoraproject.org/results/{repo_name}/pubkey.gpg\n\
             repo_gpgcheck=0\n\
             enabled=1\n\
             enabled_metadata=1\n"
        )),
        RepoKind::Obs => None,
    }
}

/// Writes the snippet from [`repo_config`] to `<config dir>/<name>.repo`.
pub fn save_repo_config(kind: RepoKind, repo_name: &str, repo_path: Option<&Path>) -> Result<PathBuf> {
    use crate::converter::error::Context;

    let contents = repo_config(kind, repo_name, repo_path)
        .with_context(|| format!("no repository configuration for {kind} repositories"))?;
    let dir = user_config_dir().context("no user config directory available")?;
    std::fs::create_dir_all(&dir).fs_context("creating config directory", &dir)?;
    let path = dir.join(format!("{repo_name}.repo"));
    std::fs::write(&path, contents).fs_context("writing repository file", &path)?;
    Ok(path)
}

/// Placeholder values for one publish run.
struct Placeholders {
    values: Vec<(&'static str, String)>,
}

impl Placeholders {
    fn new(rpm: &Path, source: Option<&Path>, repo: &RepoDescriptor) -> Self {
        let rpm_file = rpm
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let pkg_name = package_name_from_file(rpm).unwrap_or_else(|| rpm_file.clone());
        Self {
            values: vec![
                ("{repo_name}", repo.repo_name.clone()),
                ("{repo_path}", repo.repo_path.to_string_lossy().into_owned()),
                ("{project}", repo.project.clone()),
                ("{pkg_name}", pkg_name),
                ("{rpm_path}", rpm.to_string_lossy().into_owned()),
                (
                    "{srpm_path}",
                    source.map(|p| p.to_string_lossy().into_owned()).unwrap_or_default(),
                ),
                ("{rpm_file}", rpm_file),
            ],
        }
    }

    fn get(&self, key: &str) -> &str {
        self.values
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or_default()
    }

    fn apply(&self, template: &str) -> String {
        self.values
            .iter()
            .fold(template.to_string(), |acc, (key, value)| acc.replace(key, value))
    }
}

/// Publishes packages using a repository store and tool paths.
#[derive(Clone, Copy, Debug)]
pub struct Publisher<'a> {
    repos: &'a RepoStore,
    tools: &'a ToolPaths,
}

impl<'a> Publisher<'a> {
    /// Creates a publisher.
    pub fn new(repos: &'a RepoStore, tools: &'a ToolPaths) -> Self {
        Self { repos, tools }
    }

    /// Publishes `rpm` to `repo`. Failures are logged and reported as `false`.
    pub async fn publish(&self, rpm: &Path, source: Option<&Path>, repo: &RepoDescriptor) -> bool {
        match self.try_publish(rpm, source, repo).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Publishing {} failed: {}", rpm.display(), e);
                false
            }
        }
    }

    /// Publishes `rpm` to `repo`.
    ///
    /// `source` is the matching `.src.rpm`. When `rpm` is itself a source
    /// package it serves as both. Profiles whose commands take
    /// `{srpm_path}` (the built-in Copr one) fail without a source package.
    pub async fn try_publish(&self, rpm: &Path, source: Option<&Path>, repo: &RepoDescriptor) -> Result<()> {
        if !rpm.is_file() {
            return Err(Error::InputNotFound(rpm.to_path_buf()));
        }
        let profile = self
            .repos
            .get(&repo.profile)
            .ok_or_else(|| Error::UnknownRepoProfile(repo.profile.clone()))?;

        let source = source.or_else(|| is_source_package(rpm).then_some(rpm));
        if profile.needs_source_package() && source.is_none() {
            return Err(Error::InvalidInput {
                path: rpm.to_path_buf(),
                reason: format!("the '{}' repository builds from a source package (.src.rpm)", profile.id),
            });
        }
        if let Some(source) = source
            && !source.is_file()
        {
            return Err(Error::InputNotFound(source.to_path_buf()));
        }

        let placeholders = Placeholders::new(rpm, source, repo);
        log::info!("Publishing {} to {} ({})", rpm.display(), repo.repo_name, profile.kind);

        match profile.kind {
            RepoKind::Local => self.publish_local(profile, rpm, source, repo, &placeholders).await,
            RepoKind::Copr => {
                let template = profile.command("build").ok_or_else(|| missing(profile, "build"))?;
                self.invocation(template, &placeholders).run().await?;
                Ok(())
            }
            RepoKind::Obs => self.publish_obs(profile, rpm, &placeholders).await,
        }
    }

    async fn publish_local(
        &self,
        profile: &RepoProfile,
        rpm: &Path,
        source: Option<&Path>,
        repo: &RepoDescriptor,
        placeholders: &Placeholders,
    ) -> Result<()> {
        if !repo.repo_path.join("RPMS").is_dir() {
            let description = (!profile.description.is_empty()).then_some(profile.description.as_str());
            create_repository(&repo.repo_path, &repo.repo_name, description).await?;
        }
        match profile.command("add") {
            Some(template) => {
                self.invocation(template, placeholders).run().await?;
            }
            None => {
                add_package(&repo.repo_path, rpm).await?;
                if let Some(source) = source.filter(|s| *s != rpm) {
                    add_package(&repo.repo_path, source).await?;
                }
            }
        }
        match profile.command("update") {
            Some(template) => {
                self.invocation(template, placeholders).run().await?;
                Ok(())
            }
            None => update_metadata(&repo.repo_path, self.tools).await,
        }
    }

    async fn publish_obs(&self, profile: &RepoProfile, rpm: &Path, placeholders: &Placeholders) -> Result<()> {
        let checkout = profile.command("checkout").ok_or_else(|| missing(profile, "checkout"))?;
        let add = profile.command("add").ok_or_else(|| missing(profile, "add"))?;
        let commit = profile.command("commit").ok_or_else(|| missing(profile, "commit"))?;

        let scratch = tempfile::Builder::new()
            .prefix("appimage2rpm_obs_")
            .tempdir()
            .fs_context("creating checkout directory", std::env::temp_dir())?;
        self.invocation(checkout, placeholders)
            .current_dir(scratch.path())
            .run()
            .await?;

        let package_dir = scratch
            .path()
            .join(placeholders.get("{project}"))
            .join(placeholders.get("{pkg_name}"));
        copy_file(rpm, &package_dir.join(placeholders.get("{rpm_file}"))).await?;

        self.invocation(add, placeholders)
            .current_dir(&package_dir)
            .run()
            .await?;
        self.invocation(commit, placeholders)
            .current_dir(&package_dir)
            .run()
            .await?;
        Ok(())
    }

    /// Expands a command template. Known client names map to configured paths.
    fn invocation(&self, template: &[String], placeholders: &Placeholders) -> ToolInvocation {
        let (program, args) = template.split_first().map_or(("", &[][..]), |(p, a)| (p.as_str(), a));
        let program: PathBuf = match program {
            "copr-cli" => self.tools.copr_cli.clone(),
            "osc" => self.tools.osc.clone(),
            other => PathBuf::from(placeholders.apply(other)),
        };
        ToolInvocation::new(program).args(args.iter().map(|a| placeholders.apply(a)))
    }
}

fn is_source_package(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".src.rpm"))
}

fn missing(profile: &RepoProfile, step: &str) -> Error {
    Error::GenericError(format!("repository profile '{}' has no '{}' command", profile.id, step))
}
