//! The conversion pipeline.
//!
//! One conversion is a straight line of stages, each feeding the next:
//! profile, working tree, metadata, dependencies, icon, build, publish.
//! Temporary directories are owned by the stage values that created them,
//! so they are released on every exit path, including task cancellation.

use crate::converter::{
    context::ConversionContext,
    deps,
    error::{Error, Result},
    extract::WorkingTree,
    icons,
    metadata,
    progress::{Progress, ProgressCallback, Stage},
    publish::Publisher,
    rpm::{self, BuildArtifact, BuildTarget},
    settings::ConvertSettings,
};
use tokio::{sync::mpsc, task::JoinHandle};

/// Result of one conversion run.
#[derive(Clone, Debug)]
pub struct ConversionOutcome {
    /// Whether a package was produced.
    pub success: bool,
    /// The package, when `success` is true.
    pub artifact: Option<BuildArtifact>,
    /// Human-readable summary or error message.
    pub message: String,
    /// Publish result, when publishing was requested.
    pub published: Option<bool>,
}

impl ConversionOutcome {
    fn failed(error: &Error) -> Self {
        Self {
            success: false,
            artifact: None,
            message: error.to_string(),
            published: None,
        }
    }
}

/// Runs conversions against a shared [`ConversionContext`].
#[derive(Clone, Debug)]
pub struct Converter {
    context: ConversionContext,
}

impl Converter {
    /// Creates a converter.
    pub fn new(context: ConversionContext) -> Self {
        Self { context }
    }

    /// The shared context.
    pub fn context(&self) -> &ConversionContext {
        &self.context
    }

    /// Converts one input. Never fails; errors are reported in the outcome.
    pub async fn convert(&self, settings: &ConvertSettings, progress: Option<&ProgressCallback>) -> ConversionOutcome {
        let report = |stage: Stage, message: String| {
            log::debug!("{}", message);
            if let Some(callback) = progress {
                callback(&Progress::new(stage, message));
            }
        };

        match self.run(settings, &report).await {
            Ok((artifact, published)) => {
                let message = format!("Created {}", artifact.path.display());
                report(Stage::Done, message.clone());
                ConversionOutcome {
                    success: true,
                    artifact: Some(artifact),
                    message,
                    published,
                }
            }
            Err(e) => {
                log::error!("Conversion of {} failed: {}", settings.input().display(), e);
                ConversionOutcome::failed(&e)
            }
        }
    }

    /// Runs [`convert`](Self::convert) on a tokio task.
    ///
    /// Progress arrives on the returned channel; the handle yields the outcome.
    pub fn spawn(&self, settings: ConvertSettings) -> (JoinHandle<ConversionOutcome>, mpsc::UnboundedReceiver<Progress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let converter = self.clone();
        let handle = tokio::spawn(async move {
            let callback = move |p: &Progress| {
                let _ = tx.send(p.clone());
            };
            converter.convert(&settings, Some(&callback)).await
        });
        (handle, rx)
    }

    async fn run(
        &self,
        settings: &ConvertSettings,
        report: &(dyn Fn(Stage, String) + Sync),
    ) -> Result<(BuildArtifact, Option<bool>)> {
        let ctx = &self.context;
        let tools = ctx.tools();
        report(
            Stage::Initialized,
            format!("Converting {} ({})", settings.input().display(), settings.kind().label()),
        );

        let profile_id = match settings.distro() {
            Some(id) => id.to_string(),
            None => ctx.profiles().detect_current(),
        };
        let profile = ctx
            .profiles()
            .get(&profile_id)
            .ok_or_else(|| Error::UnknownProfile(profile_id.clone()))?;
        let macros = ctx.profiles().create_build_macros(&profile.id);
        report(Stage::ProfileResolved, format!("Target: {}", profile.name));

        let tree = WorkingTree::open(settings.input(), settings.kind(), settings.work_root()).await?;
        report(Stage::Extracted, format!("Prepared {}", tree.root().display()));

        let mut metadata = settings.metadata().clone();
        metadata::resolve(&mut metadata, &tree);
        report(
            Stage::MetadataResolved,
            format!("Application: {} {}", metadata.name(), metadata.version()),
        );

        if settings.auto_deps() {
            let family = profile.family();
            let mut dep_report = deps::analyze(tree.root(), &tools.ldd, ctx.system_libraries()).await?;
            match deps::query_for(family, tools) {
                Some(query) => deps::map_packages(&mut dep_report, query.as_ref()).await,
                None => log::warn!("No package query for the {} family; no dependencies added", family),
            }
            metadata.add_requires(deps::resolve(&dep_report, family));
            if let Some(path) = settings.dependency_report()
                && let Err(e) = dep_report.write_json(path)
            {
                log::warn!("Could not write dependency report: {}", e);
            }
            report(
                Stage::DependenciesScanned,
                format!("{} package dependencies", metadata.requires.len()),
            );
        } else {
            report(Stage::DependenciesScanned, "Dependency detection disabled".to_string());
        }

        let candidates = tree.icon_candidates(metadata.name(), metadata.icon.as_deref());
        let icon = icons::select_best(&candidates).cloned();
        match &icon {
            Some(icon) => report(Stage::IconResolved, format!("Icon: {}", icon.path.display())),
            None => {
                log::warn!("No icon found for {}; packaging without one", metadata.name());
                report(Stage::IconResolved, "No icon found".to_string());
            }
        }

        let assembled = rpm::assemble(&metadata, &tree, icon.as_ref(), settings.work_root()).await?;
        drop(tree);
        report(Stage::BuildStarted, format!("Building {}", assembled.package_name()));

        let target = match settings.repo().and_then(|repo| ctx.repos().get(&repo.profile)) {
            Some(profile) if profile.needs_source_package() => BuildTarget::BinaryAndSource,
            _ => BuildTarget::Binary,
        };
        let artifact = assembled
            .build(&tools.rpmbuild, macros.as_deref(), settings.output_dir(), target)
            .await?;
        report(Stage::BuildFinished, format!("Built {}", artifact.path.display()));

        let published = match settings.repo() {
            Some(repo) => {
                let ok = Publisher::new(ctx.repos(), tools).publish(&artifact.path, artifact.source_package.as_deref(), repo)
                    .await;
                if !ok {
                    log::warn!("Package was built but publishing to {} failed", repo.repo_name);
                }
                report(
                    Stage::Published,
                    format!("Publish to {}: {}", repo.repo_name, if ok { "ok" } else { "failed" }),
                );
                Some(ok)
            }
            None => None,
        };

        Ok((artifact, published))
    }
}
