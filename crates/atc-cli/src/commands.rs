use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use atc_build::{
    AssemblyReport, DevServerBridge, OutputAssembler, PipelineError, PipelineReport, ProfileName,
    ReleaseBuilder, WebPipeline,
};
use atc_cli::config::PipelineConfig;
use atc_common::SystemRunner;
use atc_provision::{
    ArtifactState, GitLfsStore, GitProject, ModelProvisioner, SetupOutcome, UpdateOutcome,
};
use tracing::{error, info, info_span, warn};

use crate::cli::{BuildArgs, SetupArgs};
use crate::summary::print_hint;

type SystemProvisioner = ModelProvisioner<GitLfsStore<SystemRunner>, GitProject<SystemRunner>>;

/// Project root and the config that applies to it, resolved once per run.
pub struct Workspace {
    pub root: PathBuf,
    pub config: PipelineConfig,
}

impl Workspace {
    pub fn load(project_root: Option<&Path>, config: Option<&Path>) -> Result<Self> {
        let root = match project_root {
            Some(path) => path.to_path_buf(),
            None => std::env::current_dir().context("determine current directory")?,
        };
        let root = root
            .canonicalize()
            .with_context(|| format!("project root {} is not accessible", root.display()))?;
        let config = PipelineConfig::load(&root, config).context("load pipeline config")?;
        info!(root = %root.display(), "workspace resolved");
        Ok(Self { root, config })
    }

    fn provisioner(&self) -> Result<SystemProvisioner> {
        let models = &self.config.models;
        let validator = models.validator()?;
        let store = GitLfsStore::new(SystemRunner, validator)
            .with_git(&models.git)
            .with_timeouts(models.timeouts());
        let project = GitProject::new(SystemRunner, &self.root).with_git(&models.git);
        Ok(ModelProvisioner::new(
            store,
            project,
            models.artifact_ref(&self.root),
            models.remote_ref(),
        )
        .with_commit_message(&models.commit_message))
    }

    fn builder(&self) -> ReleaseBuilder<SystemRunner> {
        let mut settings = self.config.build.settings(&self.root);
        settings.stream_output = true;
        ReleaseBuilder::new(SystemRunner, settings)
    }

    fn assembler(&self) -> OutputAssembler {
        OutputAssembler::new(self.config.layout(&self.root))
    }
}

/// Provisions the model, then runs the native build.
///
/// A provisioning failure does not stop the native build; it is reported
/// after the build has run.
pub fn run_setup(workspace: &Workspace, args: &SetupArgs) -> Result<SetupOutcome> {
    let provisioned = workspace.provisioner()?.setup();
    match &provisioned {
        Ok(outcome) if outcome.is_degraded() => warn!("{outcome}"),
        Ok(outcome) => info!("{outcome}"),
        Err(error) => error!(%error, "model provisioning failed"),
    }

    if args.no_build {
        info!("native build skipped");
    } else {
        let build = workspace.builder().build_native();
        if let Err(error) = build {
            print_hint(error.remediation());
            return Err(error).context("native build failed");
        }
    }

    provisioned.map_err(|error| {
        print_hint(error.remediation());
        anyhow::Error::new(error).context("model provisioning failed")
    })
}

pub fn run_update(workspace: &Workspace) -> Result<UpdateOutcome> {
    workspace.provisioner()?.update().map_err(|error| {
        print_hint(error.remediation());
        anyhow::Error::new(error).context("model update failed")
    })
}

pub fn run_build(workspace: &Workspace, args: &BuildArgs) -> Result<PipelineReport> {
    let profile = args.profile.unwrap_or(workspace.config.build.profile).profile();
    let pipeline = WebPipeline::new(
        workspace.builder(),
        workspace.assembler(),
        workspace.config.bridge_target(&workspace.root),
    );
    pipeline.run(&profile, !args.no_assemble).map_err(|error| {
        if let PipelineError::Build(build) = &error {
            print_hint(build.remediation());
        }
        anyhow::Error::new(error).context(format!("{} build failed", profile.name()))
    })
}

pub fn run_assemble(workspace: &Workspace) -> Result<AssemblyReport> {
    let report = workspace.assembler().assemble().context("assemble output")?;
    for path in &report.overwritten {
        warn!(path = %path.display(), "overwrote existing file");
    }
    Ok(report)
}

pub fn run_bridge(workspace: &Workspace) -> Result<PathBuf> {
    let layout = workspace.config.layout(&workspace.root);
    let target = workspace.config.bridge_target(&workspace.root);
    DevServerBridge::for_assets(&layout.assets_dest(), &target.dest)
        .write(&target.config_path)
        .context("write dev-server bridge config")?;
    Ok(target.config_path)
}

/// Snapshot of everything `status` shows.
pub struct StatusReport {
    pub root: PathBuf,
    pub artifact: PathBuf,
    /// `None` when the models submodule is not checked out.
    pub state: Option<ArtifactState>,
    pub validator: String,
    pub remote: String,
    pub profile: ProfileName,
    pub out_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub public_dir: PathBuf,
    pub bridge_config: PathBuf,
}

pub fn run_status(workspace: &Workspace) -> Result<StatusReport> {
    let span = info_span!("status");
    let _guard = span.enter();

    let config = &workspace.config;
    let provisioner = workspace.provisioner()?;
    let layout = config.layout(&workspace.root);
    Ok(StatusReport {
        root: workspace.root.clone(),
        artifact: provisioner.artifact().path(),
        state: provisioner.status(),
        validator: config.models.validator()?.describe(),
        remote: config.models.remote_ref().to_string(),
        profile: config.build.profile,
        out_dir: layout.out_dir,
        assets_dir: layout.assets_dir,
        public_dir: layout.public_dir,
        bridge_config: config.bridge_target(&workspace.root).config_path,
    })
}
