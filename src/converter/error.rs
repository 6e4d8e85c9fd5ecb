//! Error types for conversion operations.
//!
//! Provides contextual error chaining, filesystem-specific errors, and
//! variants for the external tools the converter drives.
//!
//! # Features
//!
//! - **Context trait**: Add context to errors similar to anyhow
//! - **ErrorExt trait**: Filesystem operations with automatic path context
//! - **bail! macro**: Early return with formatted error messages
//!
//! # Example
//!
//! ```ignore
//! fn read_entry(path: &Path) -> Result<String> {
//!     let contents = std::fs::read_to_string(path)
//!         .fs_context("reading desktop entry", path)?;
//!
//!     if contents.is_empty() {
//!         bail!("desktop entry {} is empty", path.display());
//!     }
//!
//!     Ok(contents)
//! }
//! ```

use std::{
    fmt::Display,
    io,
    path::{self, PathBuf},
};
use thiserror::Error as DeriveError;

/// Errors returned by the converter.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "reading desktop entry")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// An external program could not be started at all.
    #[error("failed to run command {command}: {error}")]
    CommandFailed {
        /// Program that failed to start
        command: String,
        /// The underlying error
        error: io::Error,
    },

    /// An external program ran but exited unsuccessfully.
    ///
    /// Carries the tool's combined diagnostic output.
    #[error("{tool} exited with {}: {output}", status_text(.code))]
    ToolFailed {
        /// Program that failed
        tool: String,
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Captured stdout and stderr
        output: String,
    },

    /// A required external program is not installed.
    #[error("required tool '{0}' was not found in PATH")]
    ToolNotFound(String),

    /// The input bundle or directory does not exist.
    #[error("input not found: {0}")]
    InputNotFound(PathBuf),

    /// The input exists but is the wrong kind of file system object.
    #[error("invalid input {path}: {reason}")]
    InvalidInput {
        /// Offending input path
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// Extraction succeeded but produced no content root.
    #[error("no extracted content root found under {0}")]
    ContentRootNotFound(PathBuf),

    /// A requested distribution profile is not defined.
    #[error("unknown distribution profile '{0}'")]
    UnknownProfile(String),

    /// A requested repository profile is not defined.
    #[error("unknown repository profile '{0}'")]
    UnknownRepoProfile(String),

    /// The build tool reported success but produced no package file.
    #[error("no RPM package was produced under {0}")]
    ArtifactNotFound(PathBuf),

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Error walking a directory tree.
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// Handlebars template rendering error.
    #[error("{0}")]
    HandleBarsError(#[from] handlebars::RenderError),

    /// Handlebars template parsing error.
    #[error("{0}")]
    Template(#[from] handlebars::TemplateError),

    /// JSON serialization error (dependency reports).
    #[error("{0}")]
    JsonError(#[from] serde_json::error::Error),

    /// TOML parsing error (profile and repository files).
    #[error("{0}")]
    TomlError(#[from] toml::de::Error),

    /// Invalid glob pattern (artifact lookup).
    #[error("{0}")]
    GlobPattern(#[from] glob::PatternError),

    /// Binary parsing error (ELF detection).
    #[error("binary parse error: {0}")]
    BinaryParseError(#[from] goblin::error::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

fn status_text(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with the converter's Error type.
/// Works with both `Result<T, E>` and `Option<T>`.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory", "copying icon".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with error.
///
/// Converts the message into a [`Error::GenericError`] and returns immediately.
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::converter::error::Error::GenericError($msg.into()))
    };
    ($err:expr $(,)?) => {
        return Err($crate::converter::error::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::converter::error::Error::GenericError(format!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_failed_message_includes_output() {
        let err = Error::ToolFailed {
            tool: "rpmbuild".into(),
            code: Some(1),
            output: "error: Bad exit status".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("rpmbuild"));
        assert!(msg.contains("exit code 1"));
        assert!(msg.contains("Bad exit status"));
    }

    #[test]
    fn test_option_context() {
        let missing: Option<u8> = None;
        let err = missing.context("no icon").unwrap_err();
        assert_eq!(err.to_string(), "no icon");
    }

    #[test]
    fn test_fs_context_keeps_path() {
        let result: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = result.fs_context("reading file", "/tmp/x.desktop").unwrap_err();
        assert!(err.to_string().contains("/tmp/x.desktop"));
    }
}
