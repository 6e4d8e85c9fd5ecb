//! Profiles command implementation.

use crate::cli::RuntimeConfig;
use crate::converter::ProfileStore;
use crate::error::Result;

/// Execute profiles command
pub(super) fn execute_profiles(config: &RuntimeConfig) -> Result<()> {
    let store = ProfileStore::load();
    let current = store.detect_current();
    let output = config.output();

    for profile in store.iter() {
        let marker = if profile.id == current { "*" } else { " " };
        output.data(&format!("{marker} {:<12} {}", profile.id, profile.name))?;
        if config.is_verbose() {
            for (role, packages) in &profile.packages {
                config.indent(&format!("{role}: {}", packages.join(" ")));
            }
        }
    }
    Ok(())
}
