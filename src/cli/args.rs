//! Command line argument parsing and validation.

use crate::cli::output::OutputManager;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Convert AppImage bundles and application directories into RPM packages
#[derive(Parser, Debug)]
#[command(
    name = "appimage2rpm",
    version,
    about = "Convert AppImage bundles and application directories into RPM packages",
    long_about = "Unpacks an AppImage (or adopts an application directory), reads its desktop \
                  entry and AppStream metadata, maps bundled shared libraries to distribution \
                  packages, and builds an installable RPM with rpmbuild."
)]
pub struct Args {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Print debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert an AppImage or application directory into an RPM
    Convert {
        /// AppImage file, or application directory with --directory
        input: PathBuf,

        /// Where the finished RPM is written (default: next to the input)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Application name (overrides the desktop entry)
        #[arg(long)]
        name: Option<String>,

        /// Application version
        #[arg(long = "version", id = "app_version")]
        app_version: Option<String>,

        /// Package release number
        #[arg(long)]
        release: Option<String>,

        /// One-line package summary
        #[arg(long)]
        summary: Option<String>,

        /// License identifier
        #[arg(long)]
        license: Option<String>,

        /// Project homepage
        #[arg(long)]
        url: Option<String>,

        /// Extra package requirement (repeatable)
        #[arg(long = "requires", value_name = "PACKAGE")]
        requires: Vec<String>,

        /// Target distribution profile id (default: detected from the host)
        #[arg(long)]
        distro: Option<String>,

        /// Skip shared-library dependency detection
        #[arg(long)]
        no_auto_deps: bool,

        /// Treat INPUT as an unpacked application directory
        #[arg(long)]
        directory: bool,

        /// Publish the package to this repository profile (local, copr, obs)
        #[arg(long)]
        repo: Option<String>,

        /// Repository, Copr project or OBS package name
        #[arg(long, requires = "repo")]
        repo_name: Option<String>,

        /// Local repository directory
        #[arg(long, requires = "repo")]
        repo_path: Option<PathBuf>,

        /// Write the dependency analysis as JSON to this file
        #[arg(long, value_name = "FILE")]
        deps_report: Option<PathBuf>,
    },

    /// List the known distribution profiles
    Profiles,

    /// Print the profile id detected for this host
    Detect,

    /// Publish an existing RPM to a repository
    Publish {
        /// RPM file to publish
        rpm: PathBuf,

        /// Matching source package (.src.rpm), needed for Copr
        #[arg(long, value_name = "SRPM")]
        source: Option<PathBuf>,

        /// Repository profile (local, copr, obs)
        #[arg(long, default_value = "local")]
        repo: String,

        /// Repository, Copr project or OBS package name
        #[arg(long)]
        repo_name: Option<String>,

        /// Local repository directory
        #[arg(long)]
        repo_path: Option<PathBuf>,
    },

    /// Print a yum/dnf .repo file for a repository
    RepoConfig {
        /// Repository type (local, copr)
        #[arg(long, default_value = "local")]
        kind: String,

        /// Repository or Copr project name
        #[arg(long)]
        name: String,

        /// Local repository directory
        #[arg(long)]
        path: Option<PathBuf>,

        /// Install the file under ~/.config/appimage2rpm/ instead of printing it
        #[arg(long)]
        save: bool,
    },
}

impl Command {
    /// Subcommand name, for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Convert { .. } => "convert",
            Command::Profiles => "profiles",
            Command::Detect => "detect",
            Command::Publish { .. } => "publish",
            Command::RepoConfig { .. } => "repo-config",
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments clap cannot check on its own
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Convert {
                input,
                directory,
                name,
                ..
            } => {
                if *directory && input.is_file() {
                    return Err(format!("{} is a file but --directory was given", input.display()));
                }
                if let Some(name) = name
                    && name.trim().is_empty()
                {
                    return Err("--name cannot be empty".to_string());
                }
            }
            Command::RepoConfig { name, .. } if name.trim().is_empty() => {
                return Err("--name cannot be empty".to_string());
            }
            _ => {}
        }
        Ok(())
    }
}

/// Runtime configuration derived from arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: OutputManager,
}

impl RuntimeConfig {
    /// Create runtime config from args
    pub fn from(args: &Args) -> Self {
        Self {
            output: OutputManager::new(args.verbose, args.quiet),
        }
    }

    /// The underlying output manager
    pub fn output(&self) -> &OutputManager {
        &self.output
    }

    /// Check if verbose output is enabled
    pub fn is_verbose(&self) -> bool {
        self.output.is_verbose()
    }

    /// Print message if not in quiet mode
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print verbose message
    pub fn verbose_println(&self, message: &str) {
        let _ = self.output.verbose(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }
}
