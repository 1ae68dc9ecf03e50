//! The benchmark bridge: one native call per invocation, result copied out and released.

use std::ffi::CString;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, info_span};

use crate::native::{CallConvention, EnvChannelScope, NativeArgs, NativeLibrary, NativeResultBuffer};
use crate::{BenchError, BenchResult};

#[derive(Clone)]
pub struct BenchmarkBridge {
    library: Arc<dyn NativeLibrary>,
}

impl BenchmarkBridge {
    pub fn new(library: Arc<dyn NativeLibrary>) -> Self {
        BenchmarkBridge { library }
    }

    pub fn library_name(&self) -> &str {
        self.library.name()
    }

    /// Run the native benchmark on a staged circuit description and witness.
    ///
    /// Both paths must be absolute and name existing files; otherwise the native
    /// library is not called. The returned text is passed through verbatim.
    pub fn invoke(&self, circuit: &Path, witness: &Path) -> BenchResult<String> {
        let _span = info_span!("native_benchmark", library = self.library.name()).entered();
        check_artifact(circuit)?;
        check_artifact(witness)?;
        let convention = self.library.convention();
        debug!(
            library = self.library.name(),
            ?convention,
            circuit = %circuit.display(),
            witness = %witness.display(),
            "invoking native benchmark"
        );

        let start = Instant::now();
        let raw = match convention {
            CallConvention::EnvChannel => {
                let _scope = EnvChannelScope::enter(circuit, witness);
                // SAFETY: args match the convention and the env scope is held.
                unsafe { self.library.run_benchmark(NativeArgs::Env) }
            }
            CallConvention::DirectPaths => {
                let circuit_c = c_path(circuit)?;
                let witness_c = c_path(witness)?;
                // SAFETY: both CStrings outlive the call.
                unsafe {
                    self.library.run_benchmark(NativeArgs::Paths {
                        circuit: &circuit_c,
                        witness: &witness_c,
                    })
                }
            }
        };
        let elapsed = start.elapsed();

        // SAFETY: `raw` was just returned by this library's entry point.
        let buffer = unsafe { NativeResultBuffer::from_raw(self.library.as_ref(), raw) }
            .ok_or_else(|| BenchError::native("native library returned a null result"))?;
        let text = buffer.into_string()?;
        info!(
            library = self.library.name(),
            elapsed_ms = elapsed.as_millis() as u64,
            bytes = text.len(),
            "native benchmark finished"
        );
        Ok(text)
    }
}

fn invalid_path(path: &Path, reason: &str) -> BenchError {
    BenchError::InvalidArtifactPath { path: path.to_path_buf(), reason: reason.to_string() }
}

fn check_artifact(path: &Path) -> BenchResult<()> {
    if !path.is_absolute() {
        return Err(invalid_path(path, "path is not absolute"));
    }
    if !path.is_file() {
        return Err(invalid_path(path, "file does not exist"));
    }
    Ok(())
}

#[cfg(unix)]
fn c_path(path: &Path) -> BenchResult<CString> {
    use std::os::unix::ffi::OsStrExt;
    CString::new(path.as_os_str().as_bytes()).map_err(|_| invalid_path(path, "path contains a NUL byte"))
}

#[cfg(not(unix))]
fn c_path(path: &Path) -> BenchResult<CString> {
    let s = path.to_str().ok_or_else(|| invalid_path(path, "path is not valid UTF-8"))?;
    CString::new(s).map_err(|_| invalid_path(path, "path contains a NUL byte"))
}
