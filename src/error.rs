//! Top-level error types for the appimage2rpm binary.
//!
//! Wraps the converter's errors with CLI errors and adds recovery suggestions.

use crate::converter;
use thiserror::Error;

/// Result type alias for appimage2rpm operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Main error type for the command-line front end
#[derive(Error, Debug)]
pub enum AppError {
    /// Conversion, packaging or publishing errors
    #[error("{0}")]
    Converter(#[from] converter::Error),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl AppError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            AppError::Converter(error) => converter_suggestions(error),
            AppError::Cli(CliError::InvalidArguments { .. }) => {
                vec!["Run with --help to see the accepted arguments".to_string()]
            }
            AppError::Toml(_) => vec![
                "Check distros.toml and repos.toml in ~/.config/appimage2rpm/".to_string(),
                "Remove a broken file to fall back to the built-in profiles".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}

fn converter_suggestions(error: &converter::Error) -> Vec<String> {
    use converter::Error;

    match error {
        Error::Context(_, inner) => converter_suggestions(inner),
        Error::CommandFailed { command, .. } | Error::ToolNotFound(command) => tool_suggestions(command),
        Error::ToolFailed { tool, .. } if tool.ends_with("rpmbuild") => vec![
            "Re-run with --verbose to list the build tree before it is removed".to_string(),
            "Check that the package name and version contain no unusual characters".to_string(),
        ],
        Error::ToolFailed { tool, .. } if tool.to_ascii_lowercase().ends_with(".appimage") => vec![
            "Make sure the AppImage is complete and runs on this machine".to_string(),
            "Extract it manually with --appimage-extract and convert the directory with --directory".to_string(),
        ],
        Error::InputNotFound(path) => vec![format!("Check that {} exists", path.display())],
        Error::InvalidInput { .. } => {
            vec!["Pass --directory to convert an unpacked application directory".to_string()]
        }
        Error::UnknownProfile(_) => vec!["List the available targets: appimage2rpm profiles".to_string()],
        Error::UnknownRepoProfile(_) => vec!["Use one of the repository types: local, copr, obs".to_string()],
        Error::ArtifactNotFound(_) => {
            vec!["Check the rpmbuild output above; its version may name packages differently".to_string()]
        }
        _ => vec!["Check the error message above for specific details".to_string()],
    }
}

fn tool_suggestions(command: &str) -> Vec<String> {
    let program = command.rsplit('/').next().unwrap_or(command);
    let package = match program {
        "rpmbuild" => Some("rpm-build"),
        "createrepo_c" | "createrepo" => Some("createrepo_c"),
        "copr-cli" => Some("copr-cli"),
        "osc" => Some("osc"),
        "dnf" => Some("dnf"),
        "ldd" => Some("glibc-common"),
        _ => None,
    };
    match (program, package) {
        ("apt-file", _) => vec![
            "Install apt-file: sudo apt install apt-file".to_string(),
            "Refresh its index: sudo apt-file update".to_string(),
        ],
        (_, Some(package)) => vec![format!("Install {program}: sudo dnf install {package}")],
        _ => vec![format!("Make sure {program} is installed and on PATH")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io, path::PathBuf};

    #[test]
    fn test_missing_rpmbuild_suggests_package() {
        let error = AppError::from(converter::Error::CommandFailed {
            command: "rpmbuild".to_string(),
            error: io::Error::new(io::ErrorKind::NotFound, "not found"),
        });
        let suggestions = error.recovery_suggestions();
        assert!(suggestions.iter().any(|s| s.contains("rpm-build")));
    }

    #[test]
    fn test_context_is_unwrapped() {
        let inner = converter::Error::ToolNotFound("createrepo_c".to_string());
        let error = AppError::from(converter::Error::Context("publishing".to_string(), Box::new(inner)));
        assert!(error.recovery_suggestions()[0].contains("createrepo_c"));
    }

    #[test]
    fn test_fallback_suggestion() {
        let error = AppError::from(converter::Error::ContentRootNotFound(PathBuf::from("/tmp/x")));
        assert_eq!(error.recovery_suggestions().len(), 1);
    }
}
