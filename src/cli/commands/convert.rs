//! Convert command implementation.
//!
//! Runs one conversion on a worker task and prints its progress.

use crate::cli::{Args, Command, RuntimeConfig};
use crate::converter::{
    publish::DEFAULT_REPO_NAME, ApplicationMetadata, ConversionContext, ConvertSettingsBuilder, Converter,
    Error as ConvertError, InputKind, RepoDescriptor,
};
use crate::error::Result;

/// Execute convert command
pub(super) async fn execute_convert(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let Command::Convert {
        input,
        output_dir,
        name,
        app_version,
        release,
        summary,
        license,
        url,
        requires,
        distro,
        no_auto_deps,
        directory,
        repo,
        repo_name,
        repo_path,
        deps_report,
    } = &args.command
    else {
        return Ok(1);
    };

    let context = ConversionContext::init();

    let overrides = ApplicationMetadata {
        name: name.clone(),
        version: app_version.clone(),
        release: release.clone(),
        summary: summary.clone(),
        license: license.clone(),
        url: url.clone(),
        requires: requires.clone(),
        ..Default::default()
    };

    let mut builder = ConvertSettingsBuilder::new()
        .input(input)
        .metadata(overrides)
        .auto_deps(!no_auto_deps);
    if *directory {
        builder = builder.kind(InputKind::Directory);
    }
    if let Some(dir) = output_dir {
        builder = builder.output_dir(dir);
    }
    if let Some(id) = distro {
        builder = builder.distro(id);
    }
    if let Some(path) = deps_report {
        builder = builder.dependency_report(path);
    }
    if let Some(profile) = repo {
        if context.repos().get(profile).is_none() {
            return Err(ConvertError::UnknownRepoProfile(profile.clone()).into());
        }
        let mut descriptor = RepoDescriptor::new(profile, repo_name.as_deref().unwrap_or(DEFAULT_REPO_NAME));
        if let Some(path) = repo_path {
            descriptor = descriptor.with_path(path);
        }
        builder = builder.repo(descriptor);
    }
    let settings = builder.build()?;

    config.verbose_println(&format!(
        "Converting {} as {}",
        settings.input().display(),
        settings.kind().label()
    ));

    let converter = Converter::new(context);
    let (handle, mut progress) = converter.spawn(settings);
    while let Some(update) = progress.recv().await {
        let _ = config.output().progress(update.percent, &update.message);
    }
    let outcome = handle.await.map_err(anyhow::Error::from)?;

    if !outcome.success {
        config.error_println(&format!("Conversion failed: {}", outcome.message));
        return Ok(1);
    }

    if let Some(artifact) = &outcome.artifact {
        config.success_println(&format!("Created {}", artifact.path.display()));
        let output = config.output();
        let _ = output.field("Package", &artifact.package_name);
        let _ = output.field("Version", &format!(
            "{}-{}",
            artifact.metadata.version(),
            artifact.metadata.release()
        ));
        let _ = output.field("Size", &format!("{} bytes", artifact.size));
        let _ = output.field("SHA-256", &artifact.checksum);
        if let Some(source) = &artifact.source_package {
            let _ = output.field("Source", &source.display().to_string());
        }
        if !artifact.metadata.requires.is_empty() {
            let _ = output.field("Requires", &artifact.metadata.requires.join(", "));
        }
    }

    match outcome.published {
        Some(true) => config.success_println("Published"),
        Some(false) => config.warning_println("The package was built but publishing failed; see the log above"),
        None => {}
    }

    Ok(0)
}
