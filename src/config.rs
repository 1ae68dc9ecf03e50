use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::native::CallConvention;
use crate::{BenchError, BenchResult};

/// How artifacts reach a native-readable path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagingMode {
    /// Copy from the read-only bundle into `staging_dir` once.
    #[default]
    Copy,
    /// Use bundled files in place.
    Bundled,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Worker threads are named `<thread_name>-<job id>`
    pub thread_name: String,
    /// Proving is stack-hungry; `None` keeps the platform default
    pub stack_size_bytes: Option<usize>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            thread_name: "bench-worker".to_string(),
            stack_size_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub assets_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub staging_mode: StagingMode,
    /// Convention used by the mock library; a linked library reports its own.
    pub convention: CallConvention,
    pub worker: WorkerConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            assets_dir: PathBuf::from("assets"),
            staging_dir: PathBuf::from("staged"),
            staging_mode: StagingMode::default(),
            convention: CallConvention::default(),
            worker: WorkerConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> BenchResult<RunnerConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| BenchError::Config(format!("{}: {e}", path.display())))?;
    toml::from_str(&s).map_err(|e| BenchError::Config(format!("{}: {e}", path.display())))
}
