//! Release build followed by assembly and the dev-server bridge file.

use std::path::PathBuf;

use atc_common::CommandRunner;
use tracing::{info, info_span};

use crate::assemble::{AssemblyReport, OutputAssembler};
use crate::bridge::DevServerBridge;
use crate::builder::{BuildOutputSet, ReleaseBuilder};
use crate::error::PipelineError;
use crate::profile::BuildProfile;

/// Where the bridge file goes and what subdirectory it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeTarget {
    pub config_path: PathBuf,
    pub dest: String,
}

/// Result of a full pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub outputs: BuildOutputSet,
    /// `None` when assembly was skipped.
    pub assembly: Option<AssemblyReport>,
    /// Bridge file written, if any.
    pub bridge: Option<PathBuf>,
}

/// Build → assemble → bridge, strictly in that order.
pub struct WebPipeline<R> {
    builder: ReleaseBuilder<R>,
    assembler: OutputAssembler,
    bridge: BridgeTarget,
}

impl<R: CommandRunner> WebPipeline<R> {
    pub fn new(builder: ReleaseBuilder<R>, assembler: OutputAssembler, bridge: BridgeTarget) -> Self {
        Self {
            builder,
            assembler,
            bridge,
        }
    }

    pub fn builder(&self) -> &ReleaseBuilder<R> {
        &self.builder
    }

    pub fn assembler(&self) -> &OutputAssembler {
        &self.assembler
    }

    /// Bridge config pointing at the assembled asset directory.
    pub fn bridge_config(&self) -> DevServerBridge {
        DevServerBridge::for_assets(&self.assembler.layout().assets_dest(), &self.bridge.dest)
    }

    pub fn write_bridge(&self) -> Result<PathBuf, PipelineError> {
        self.bridge_config().write(&self.bridge.config_path)?;
        Ok(self.bridge.config_path.clone())
    }

    /// Runs the pipeline. A build failure returns before anything is copied.
    pub fn run(&self, profile: &BuildProfile, assemble: bool) -> Result<PipelineReport, PipelineError> {
        let span = info_span!("web_pipeline", profile = %profile.name(), assemble);
        let _guard = span.enter();

        let outputs = self.builder.build(profile)?;
        if !assemble {
            info!("assembly skipped");
            return Ok(PipelineReport {
                outputs,
                assembly: None,
                bridge: None,
            });
        }

        let assembly = self.assembler.assemble()?;
        let bridge = self.write_bridge()?;
        Ok(PipelineReport {
            outputs,
            assembly: Some(assembly),
            bridge: Some(bridge),
        })
    }
}
