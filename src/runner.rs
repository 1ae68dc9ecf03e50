//! Entry point for presentation code: stage, run off-thread, display.
//!
//! A selection flows through [`BenchmarkRunner::run`] as:
//! stage both artifacts → call the native bridge → post the outcome to the UI
//! loop → [`ResultSink`]. Staging and the native call both happen on the
//! worker thread; if staging fails, the bridge is never called.
//!
//! Overlapping runs, including two runs of the same selection, are independent:
//! each gets its own job and its own completion. Env-channel libraries are
//! serialized at the native call by [`EnvChannelScope`](crate::native::EnvChannelScope).

use std::sync::Arc;

use tracing::{info, warn};

use crate::bridge::BenchmarkBridge;
use crate::config::{RunnerConfig, StagingMode};
use crate::device::DeviceInfo;
use crate::native::NativeLibrary;
use crate::selection::BenchmarkKind;
use crate::shim::{BackgroundExecutor, JobHandle, UiHandle, render_outcome};
use crate::staging::{AssetStager, BundledStager, CopyingStager, DirAssetSource};
use crate::{BenchError, BenchResult};

/// Text in the output region before any benchmark has run.
pub const INITIAL_OUTPUT: &str = "Results will appear here";

/// Display surface; called only on the UI thread.
pub trait ResultSink: Send + Sync {
    /// Replace the output region with `text`.
    fn show_result(&self, kind: BenchmarkKind, text: &str);

    /// Show a transient, dismissible notice.
    fn show_notice(&self, text: &str);
}

/// The stager selected by `config.staging_mode`.
pub fn stager_from_config(config: &RunnerConfig) -> BenchResult<Arc<dyn AssetStager>> {
    Ok(match config.staging_mode {
        StagingMode::Copy => Arc::new(CopyingStager::new(
            DirAssetSource::new(&config.assets_dir),
            &config.staging_dir,
        )?),
        StagingMode::Bundled => Arc::new(BundledStager::new(&config.assets_dir)?),
    })
}

pub struct BenchmarkRunner {
    stager: Arc<dyn AssetStager>,
    bridge: BenchmarkBridge,
    executor: BackgroundExecutor,
}

impl BenchmarkRunner {
    pub fn new(stager: Arc<dyn AssetStager>, bridge: BenchmarkBridge, executor: BackgroundExecutor) -> Self {
        BenchmarkRunner { stager, bridge, executor }
    }

    /// Build a runner from configuration, posting completions to `ui`.
    pub fn from_config(
        config: &RunnerConfig,
        library: Arc<dyn NativeLibrary>,
        ui: UiHandle,
    ) -> BenchResult<Self> {
        DeviceInfo::detect().log();
        let stager = stager_from_config(config)?;
        info!(
            library = library.name(),
            convention = ?library.convention(),
            staging = ?config.staging_mode,
            "benchmark runner ready"
        );
        Ok(Self::new(
            stager,
            BenchmarkBridge::new(library),
            BackgroundExecutor::new(ui, config.worker.clone()),
        ))
    }

    pub fn bridge(&self) -> &BenchmarkBridge {
        &self.bridge
    }

    /// Start `kind` in the background. The outcome reaches `sink` on the UI thread:
    /// a staging failure as a notice, anything else in the output region.
    pub fn run(&self, kind: BenchmarkKind, sink: Arc<dyn ResultSink>) -> JobHandle {
        let stager = Arc::clone(&self.stager);
        let bridge = self.bridge.clone();
        let job = self.executor.dispatch(
            move |token| {
                let staged = stager.stage_pair(kind.artifacts())?;
                if token.is_cancelled() {
                    return Err(BenchError::Message(format!("{kind} cancelled before start")));
                }
                bridge.invoke(&staged.circuit, &staged.witness)
            },
            move |result: BenchResult<String>| match result {
                Err(e) if e.is_staging() => {
                    warn!(benchmark = %kind, error = %e, "staging failed");
                    sink.show_notice(&e.to_string());
                }
                other => sink.show_result(kind, &render_outcome(other)),
            },
        );
        info!(benchmark = %kind, job = job.id, "benchmark started");
        job
    }
}
