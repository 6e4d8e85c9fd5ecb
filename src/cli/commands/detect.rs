//! Detect command implementation.

use crate::cli::RuntimeConfig;
use crate::converter::{profiles::OsRelease, ProfileStore};
use crate::error::Result;

/// Execute detect command
pub(super) fn execute_detect(config: &RuntimeConfig) -> Result<()> {
    if let Some(release) = OsRelease::from_host() {
        config.verbose_println(&format!(
            "os-release: ID={} VERSION_ID={}",
            release.id.as_deref().unwrap_or("?"),
            release.version_id.as_deref().unwrap_or("?")
        ));
    }
    let id = ProfileStore::load().detect_current();
    config.output().data(&id)?;
    Ok(())
}
