//! Subcommand implementations.
//!
//! Each subcommand lives in its own file; this module validates arguments,
//! dispatches, and turns errors into exit codes with recovery suggestions.

mod convert;
mod detect;
mod profiles;
mod publish;
mod repo_config;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::{AppError, Result};

use convert::execute_convert;
use detect::execute_detect;
use profiles::execute_profiles;
use publish::execute_publish;
use repo_config::execute_repo_config;

/// Execute the command selected by the parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        // Validation errors are shown even in quiet mode
        let output = super::OutputManager::new(false, false);
        output.error(&format!("Invalid arguments: {}", validation_error));
        return Ok(2);
    }

    let config = RuntimeConfig::from(&args);

    let result = match &args.command {
        Command::Convert { .. } => execute_convert(&args, &config).await,
        Command::Publish { .. } => execute_publish(&args, &config).await,
        Command::Profiles => execute_profiles(&config).map(|()| 0),
        Command::Detect => execute_detect(&config).map(|()| 0),
        Command::RepoConfig { .. } => execute_repo_config(&args, &config).map(|()| 0),
    };

    match result {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            config.error_println(&format!("Command '{}' failed: {}", args.command.name(), e));
            print_suggestions(&config, &e);
            Ok(1)
        }
    }
}

fn print_suggestions(config: &RuntimeConfig, error: &AppError) {
    let suggestions = error.recovery_suggestions();
    if suggestions.is_empty() {
        return;
    }
    config.println("\n💡 Recovery suggestions:");
    for suggestion in suggestions {
        config.println(&format!("  • {}", suggestion));
    }
}
