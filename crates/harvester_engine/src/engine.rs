use std::path::{Path, PathBuf};
use std::sync::Arc;

use harvest_logging::{harvest_error, harvest_info};

use crate::fetch::FetchSettings;
use crate::pipeline::{FileReport, Pipeline, PipelineConfig, PipelineError};
use crate::transport::Transport;

/// Blocking front door: owns the multi-threaded runtime the pipeline runs on
/// and processes input files one after another.
pub struct HarvestEngine {
    runtime: tokio::runtime::Runtime,
    pipeline: Pipeline,
}

impl HarvestEngine {
    pub fn new(config: PipelineConfig, settings: FetchSettings) -> Result<Self, PipelineError> {
        let runtime = build_runtime()?;
        // reqwest clients must be built inside a runtime context.
        let pipeline = {
            let _guard = runtime.enter();
            Pipeline::new(config, settings)?
        };
        Ok(Self { runtime, pipeline })
    }

    pub fn with_transport(
        config: PipelineConfig,
        settings: FetchSettings,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            runtime: build_runtime()?,
            pipeline: Pipeline::with_transport(config, settings, transport)?,
        })
    }

    pub fn process_file(&self, input: &Path) -> Result<FileReport, PipelineError> {
        self.runtime.block_on(self.pipeline.process_file(input))
    }

    /// Process each input in order. A failing file is logged and does not
    /// stop the ones after it.
    pub fn run_files(&self, inputs: &[PathBuf]) -> Vec<(PathBuf, Result<FileReport, PipelineError>)> {
        inputs
            .iter()
            .map(|input| {
                harvest_info!("processing {}", input.display());
                let result = self.process_file(input);
                match &result {
                    Ok(report) => harvest_info!(
                        "{} -> {}: {} in {:.1?}",
                        input.display(),
                        report.output.display(),
                        report.summary,
                        report.elapsed
                    ),
                    Err(err) => harvest_error!("{} skipped: {}", input.display(), err),
                }
                (input.clone(), result)
            })
            .collect()
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime, PipelineError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("harvester-worker")
        .build()
        .map_err(|err| PipelineError::Config(format!("cannot start runtime: {err}")))
}
