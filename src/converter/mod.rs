//! AppImage and application-directory to RPM conversion.
//!
//! A conversion prepares a working tree from the input, resolves metadata,
//! scans shared-library dependencies, picks an icon, stages an rpmbuild
//! tree and runs rpmbuild, then optionally publishes the package.
//!
//! # Configuration
//!
//! Distribution profiles live in `distros.toml` and repository profiles in
//! `repos.toml`, searched in `~/.config/appimage2rpm/` then
//! `/etc/appimage2rpm/`:
//!
//! ```toml
//! [fedora42]
//! name = "Fedora 42"
//! distro = "fedora"
//! version = "42"
//! macro_template = "%dist .fc42\n"
//! ```
//!
//! # Integration
//!
//! ```no_run
//! use appimage2rpm::converter::{ConversionContext, ConvertSettingsBuilder, Converter};
//!
//! # async fn example() -> appimage2rpm::converter::Result<()> {
//! let settings = ConvertSettingsBuilder::new()
//!     .input("Demo-1.2.0-x86_64.AppImage")
//!     .output_dir("dist")
//!     .build()?;
//!
//! let converter = Converter::new(ConversionContext::init());
//! let outcome = converter.convert(&settings, None).await;
//! println!("{}", outcome.message);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod context;
pub mod deps;
pub mod error;
pub mod extract;
pub mod freedesktop;
pub mod icons;
pub mod metadata;
pub mod pipeline;
pub mod profiles;
pub mod progress;
pub mod publish;
pub mod rpm;
pub mod settings;
pub mod utils;

pub use context::ConversionContext;
pub use deps::DependencyReport;
pub use error::{Context, Error, ErrorExt, Result};
pub use extract::WorkingTree;
pub use icons::{IconCandidate, IconFormat};
pub use metadata::ApplicationMetadata;
pub use pipeline::{ConversionOutcome, Converter};
pub use profiles::{DistributionProfile, DistroFamily, ProfileStore};
pub use progress::{Progress, Stage};
pub use publish::{Publisher, RepoDescriptor, RepoKind, RepoStore};
pub use rpm::BuildArtifact;
pub use settings::{ConvertSettings, ConvertSettingsBuilder, InputKind, ToolPaths};
