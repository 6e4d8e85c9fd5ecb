//! Process-wide conversion context.
//!
//! Everything here is loaded once and read-only afterwards, so one context
//! can back any number of conversions.

use crate::converter::{
    deps::SystemLibraries,
    profiles::ProfileStore,
    publish::RepoStore,
    settings::ToolPaths,
};
use std::sync::Arc;

/// Shared, immutable state for conversions.
#[derive(Clone, Debug)]
pub struct ConversionContext {
    profiles: Arc<ProfileStore>,
    repos: Arc<RepoStore>,
    system_libraries: Arc<SystemLibraries>,
    tools: Arc<ToolPaths>,
}

impl ConversionContext {
    /// Loads profiles and repository profiles from the config search path
    /// and scans the host's library directories.
    pub fn init() -> Self {
        let context = Self::new(
            ProfileStore::load(),
            RepoStore::load(),
            SystemLibraries::scan_host(),
            ToolPaths::default(),
        );
        log::debug!(
            "Conversion context ready: {} profiles, {} system libraries",
            context.profiles.len(),
            context.system_libraries.len()
        );
        context
    }

    /// Builds a context from explicit parts.
    pub fn new(
        profiles: ProfileStore,
        repos: RepoStore,
        system_libraries: SystemLibraries,
        tools: ToolPaths,
    ) -> Self {
        Self {
            profiles: Arc::new(profiles),
            repos: Arc::new(repos),
            system_libraries: Arc::new(system_libraries),
            tools: Arc::new(tools),
        }
    }

    /// Distribution profiles.
    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// Repository profiles.
    pub fn repos(&self) -> &RepoStore {
        &self.repos
    }

    /// Baseline of host libraries excluded from dependencies.
    pub fn system_libraries(&self) -> &SystemLibraries {
        &self.system_libraries
    }

    /// External program locations.
    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }
}
