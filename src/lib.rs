//! # appimage2rpm
//!
//! Converts AppImage bundles and unpacked application directories into
//! installable RPM packages.
//!
//! A conversion unpacks the bundle into a scratch directory, reads its
//! desktop entry and AppStream metadata, maps the shared libraries its
//! binaries link against to distribution packages, picks the best icon,
//! writes an rpmbuild tree with a generated spec file and runs `rpmbuild`.
//! The finished package can then be published to a local repository, Copr
//! or the Open Build Service.
//!
//! ## Usage
//!
//! ```bash
//! appimage2rpm convert Demo-1.2.0-x86_64.AppImage
//! appimage2rpm convert ./demo-app --directory --distro fedora41 --no-auto-deps
//! appimage2rpm convert Demo.AppImage --repo local --repo-name demo
//! appimage2rpm profiles
//! ```
//!
//! The library entry point is [`converter::Converter`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod converter;
pub mod error;

pub use cli::Args;
pub use converter::{ConversionContext, ConversionOutcome, ConvertSettings, ConvertSettingsBuilder, Converter};
pub use error::{AppError, CliError, Result};
