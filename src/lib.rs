pub mod bridge;
pub mod config;
pub mod device;
pub mod native;
pub mod runner;
pub mod selection;
pub mod shim;
pub mod staging;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    /// Copying a bundled artifact into the staging directory failed.
    #[error("Error copying asset {artifact}: {source}")]
    Staging {
        artifact: String,
        #[source]
        source: std::io::Error,
    },
    /// The native call returned nothing usable or could not be made.
    #[error("native benchmark failed: {0}")]
    NativeInvocation(String),
    #[error("invalid artifact path {}: {reason}", .path.display())]
    InvalidArtifactPath { path: PathBuf, reason: String },
    #[error("benchmark worker panicked: {0}")]
    WorkerPanicked(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl BenchError {
    pub fn staging(artifact: impl Into<String>, source: std::io::Error) -> Self {
        BenchError::Staging { artifact: artifact.into(), source }
    }

    pub fn native(msg: impl Into<String>) -> Self {
        BenchError::NativeInvocation(msg.into())
    }

    /// Staging failures are shown as a dismissible notice rather than in the output region.
    pub fn is_staging(&self) -> bool {
        matches!(self, BenchError::Staging { .. })
    }
}

pub type BenchResult<T> = Result<T, BenchError>;

pub use bridge::BenchmarkBridge;
pub use runner::{BenchmarkRunner, ResultSink};
pub use selection::{ArtifactName, ArtifactPair, BenchmarkKind};
pub use shim::{BackgroundExecutor, UiHandle, UiLoop};
pub use staging::{AssetStager, BundledStager, CopyingStager, DirAssetSource};

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha256::digest;
    digest(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_error_message_names_artifact() {
        let err = BenchError::staging(
            "rsa.r1cs",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such asset"),
        );
        assert!(err.is_staging());
        assert!(err.to_string().starts_with("Error copying asset rsa.r1cs"));
    }

    #[test]
    fn test_native_error_is_not_staging() {
        let err = BenchError::native("null result");
        assert!(!err.is_staging());
        assert_eq!(err.to_string(), "native benchmark failed: null result");
    }
}
