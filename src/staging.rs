//! Asset staging: making bundled artifacts available at absolute, native-readable paths.
//!
//! Two strategies share the [`AssetStager`] contract:
//!
//! - [`CopyingStager`] stream-copies an artifact out of a read-only [`AssetSource`]
//!   into an app-private directory once, then reuses the copy on every later call.
//! - [`BundledStager`] is for platforms whose bundle already lives on the filesystem;
//!   it resolves the bundled file in place and copies nothing.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::selection::{ArtifactName, ArtifactPair};
use crate::{BenchError, BenchResult};

/// Read-only source of bundled artifacts.
pub trait AssetSource: Send + Sync {
    fn open(&self, name: ArtifactName) -> io::Result<Box<dyn Read + Send>>;
}

/// Bundle laid out as a plain directory, one file per artifact name.
#[derive(Debug, Clone)]
pub struct DirAssetSource {
    root: PathBuf,
}

impl DirAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirAssetSource { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirAssetSource {
    fn open(&self, name: ArtifactName) -> io::Result<Box<dyn Read + Send>> {
        let file = File::open(self.root.join(name))?;
        Ok(Box::new(file))
    }
}

/// Absolute paths of a staged circuit description and witness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPair {
    pub circuit: PathBuf,
    pub witness: PathBuf,
}

pub trait AssetStager: Send + Sync {
    /// Ensure `name` exists at its deterministic target path and return that path.
    ///
    /// Calling this repeatedly for the same artifact returns the same path.
    fn ensure_staged(&self, name: ArtifactName) -> BenchResult<PathBuf>;

    /// Stage both halves of a pair. Fails on the first artifact that cannot be staged.
    fn stage_pair(&self, pair: ArtifactPair) -> BenchResult<StagedPair> {
        Ok(StagedPair {
            circuit: self.ensure_staged(pair.circuit)?,
            witness: self.ensure_staged(pair.witness)?,
        })
    }
}

/// Copies artifacts from a bundle into a writable staging directory.
pub struct CopyingStager<S> {
    source: S,
    staging_dir: PathBuf,
}

impl<S: AssetSource> CopyingStager<S> {
    /// `staging_dir` is made absolute against the current directory; it is created lazily.
    pub fn new(source: S, staging_dir: impl AsRef<Path>) -> BenchResult<Self> {
        let staging_dir = std::path::absolute(staging_dir.as_ref()).map_err(|e| {
            BenchError::Config(format!(
                "cannot resolve staging dir {}: {e}",
                staging_dir.as_ref().display()
            ))
        })?;
        Ok(CopyingStager { source, staging_dir })
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn target_path(&self, name: ArtifactName) -> PathBuf {
        self.staging_dir.join(name)
    }

    fn copy_in(&self, name: ArtifactName, target: &Path) -> io::Result<u64> {
        std::fs::create_dir_all(&self.staging_dir)?;
        let mut reader = self.source.open(name)?;
        // Write next to the target and rename, so an interrupted copy never
        // looks staged to the existence check.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.staging_dir)?;
        let copied = io::copy(&mut reader, &mut tmp)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(target).map_err(|e| e.error)?;
        Ok(copied)
    }
}

impl<S: AssetSource> AssetStager for CopyingStager<S> {
    fn ensure_staged(&self, name: ArtifactName) -> BenchResult<PathBuf> {
        let target = self.target_path(name);
        if target.exists() {
            debug!(artifact = %name, path = %target.display(), "artifact already staged");
            return Ok(target);
        }
        let bytes = self
            .copy_in(name, &target)
            .map_err(|e| BenchError::staging(name.as_str(), e))?;
        info!(artifact = %name, bytes, path = %target.display(), "staged artifact");
        Ok(target)
    }
}

/// Resolves artifacts directly inside an on-disk bundle.
#[derive(Debug, Clone)]
pub struct BundledStager {
    bundle_dir: PathBuf,
}

impl BundledStager {
    pub fn new(bundle_dir: impl AsRef<Path>) -> BenchResult<Self> {
        let bundle_dir = std::path::absolute(bundle_dir.as_ref()).map_err(|e| {
            BenchError::Config(format!(
                "cannot resolve bundle dir {}: {e}",
                bundle_dir.as_ref().display()
            ))
        })?;
        Ok(BundledStager { bundle_dir })
    }
}

impl AssetStager for BundledStager {
    fn ensure_staged(&self, name: ArtifactName) -> BenchResult<PathBuf> {
        let path = self.bundle_dir.join(name);
        if !path.is_file() {
            return Err(BenchError::staging(
                name.as_str(),
                io::Error::new(io::ErrorKind::NotFound, "artifact missing from bundle"),
            ));
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::BenchmarkKind;

    const RSA_R1CS: ArtifactName = ArtifactName::new("rsa.r1cs");

    struct FailingSource;

    impl AssetSource for FailingSource {
        fn open(&self, _name: ArtifactName) -> io::Result<Box<dyn Read + Send>> {
            Err(io::Error::other("storage full"))
        }
    }

    #[test]
    fn test_copy_stages_into_target_dir() {
        let bundle = tempfile::tempdir().unwrap();
        let staged = tempfile::tempdir().unwrap();
        std::fs::write(bundle.path().join("rsa.r1cs"), b"r1cs-bytes").unwrap();

        let stager = CopyingStager::new(DirAssetSource::new(bundle.path()), staged.path()).unwrap();
        let path = stager.ensure_staged(RSA_R1CS).unwrap();

        assert!(path.is_absolute());
        assert_eq!(path, staged.path().join("rsa.r1cs"));
        assert_eq!(std::fs::read(&path).unwrap(), b"r1cs-bytes");
        // Source untouched.
        assert_eq!(std::fs::read(bundle.path().join("rsa.r1cs")).unwrap(), b"r1cs-bytes");
    }

    #[test]
    fn test_staging_creates_missing_dir() {
        let bundle = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        std::fs::write(bundle.path().join("rsa.r1cs"), b"x").unwrap();
        let nested = root.path().join("files").join("circuits");

        let stager = CopyingStager::new(DirAssetSource::new(bundle.path()), &nested).unwrap();
        let path = stager.ensure_staged(RSA_R1CS).unwrap();
        assert!(path.starts_with(&nested));
        assert!(path.is_file());
    }

    #[test]
    fn test_missing_source_is_staging_error() {
        let bundle = tempfile::tempdir().unwrap();
        let staged = tempfile::tempdir().unwrap();
        let stager = CopyingStager::new(DirAssetSource::new(bundle.path()), staged.path()).unwrap();

        let err = stager.ensure_staged(RSA_R1CS).unwrap_err();
        assert!(err.is_staging());
        assert!(!staged.path().join("rsa.r1cs").exists());
    }

    #[test]
    fn test_failed_copy_leaves_nothing_staged() {
        let staged = tempfile::tempdir().unwrap();
        let stager = CopyingStager::new(FailingSource, staged.path()).unwrap();

        assert!(stager.ensure_staged(RSA_R1CS).is_err());
        assert_eq!(std::fs::read_dir(staged.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_stage_pair_stops_at_first_failure() {
        let bundle = tempfile::tempdir().unwrap();
        let staged = tempfile::tempdir().unwrap();
        // Witness only; the circuit description is missing.
        std::fs::write(bundle.path().join("rsa.wtns"), b"w").unwrap();
        let stager = CopyingStager::new(DirAssetSource::new(bundle.path()), staged.path()).unwrap();

        let err = stager.stage_pair(BenchmarkKind::Rsa.artifacts()).unwrap_err();
        match err {
            BenchError::Staging { artifact, .. } => assert_eq!(artifact, "rsa.r1cs"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!staged.path().join("rsa.wtns").exists());
    }

    #[test]
    fn test_bundled_stager_is_identity() {
        let bundle = tempfile::tempdir().unwrap();
        std::fs::write(bundle.path().join("rsa.r1cs"), b"x").unwrap();
        let stager = BundledStager::new(bundle.path()).unwrap();

        let first = stager.ensure_staged(RSA_R1CS).unwrap();
        let second = stager.ensure_staged(RSA_R1CS).unwrap();
        assert_eq!(first, bundle.path().join("rsa.r1cs"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_bundled_stager_missing_artifact() {
        let bundle = tempfile::tempdir().unwrap();
        let stager = BundledStager::new(bundle.path()).unwrap();
        assert!(stager.ensure_staged(RSA_R1CS).unwrap_err().is_staging());
    }
}
