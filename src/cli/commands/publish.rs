//! Publish command implementation.

use crate::cli::{Args, Command, RuntimeConfig};
use crate::converter::{
    publish::DEFAULT_REPO_NAME, Publisher, RepoDescriptor, RepoStore, ToolPaths,
};
use crate::error::Result;

/// Execute publish command
pub(super) async fn execute_publish(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let Command::Publish {
        rpm,
        source,
        repo,
        repo_name,
        repo_path,
    } = &args.command
    else {
        return Ok(1);
    };

    let mut descriptor = RepoDescriptor::new(repo, repo_name.as_deref().unwrap_or(DEFAULT_REPO_NAME));
    if let Some(path) = repo_path {
        descriptor = descriptor.with_path(path);
    }

    let repos = RepoStore::load();
    let tools = ToolPaths::default();
    config.verbose_println(&format!("Publishing {} with profile '{}'", rpm.display(), repo));
    Publisher::new(&repos, &tools).try_publish(rpm, source.as_deref(), &descriptor).await?;

    config.success_println(&format!("Published {} to {}", rpm.display(), descriptor.repo_name));
    Ok(0)
}
