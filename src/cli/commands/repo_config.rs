//! Repo-config command implementation.

use crate::cli::{Args, Command, RuntimeConfig};
use crate::converter::{
    publish::{repo_config, save_repo_config},
    RepoKind,
};
use crate::error::{CliError, Result};

/// Execute repo-config command
pub(super) fn execute_repo_config(args: &Args, config: &RuntimeConfig) -> Result<()> {
    let Command::RepoConfig { kind, name, path, save } = &args.command else {
        return Ok(());
    };

    let kind: RepoKind = kind.parse()?;
    if *save {
        let written = save_repo_config(kind, name, path.as_deref())?;
        config.success_println(&format!("Wrote {}", written.display()));
        config.indent(&format!("Install it with: sudo cp {} /etc/yum.repos.d/", written.display()));
        return Ok(());
    }

    let text = repo_config(kind, name, path.as_deref()).ok_or_else(|| CliError::InvalidArguments {
        reason: format!("{kind} repositories have no .repo file"),
    })?;
    config.output().data(text.trim_end())?;
    Ok(())
}
