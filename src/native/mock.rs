//! Mock native library for testing and for running the harness without a linked prover.

use std::collections::{HashMap, HashSet};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::env_channel::{CIRCUIT_PATH_VAR, WITNESS_PATH_VAR};
use super::{CallConvention, NativeArgs, NativeLibrary};

/// Output in the shape the native prover reports.
pub const DEFAULT_MOCK_OUTPUT: &str = "Proving time: 1.204s\nProof size: 4096 bytes\nVerification time: 81ms\nproof verification successful!\n";

/// Configuration for mock library responses.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Name to report
    pub name: String,
    /// Convention the mock entry point follows
    pub convention: CallConvention,
    /// Text returned when no per-circuit output matches
    pub output: String,
    /// Text returned keyed by circuit file name
    pub outputs_by_circuit: HashMap<String, String>,
    /// Return a null handle instead of a buffer
    pub returns_null: bool,
    /// Simulated proving time
    pub delay: Option<Duration>,
    /// Panic inside the entry point with this message
    pub panic_message: Option<String>,
}

impl MockConfig {
    pub fn new(name: impl Into<String>) -> Self {
        MockConfig {
            name: name.into(),
            convention: CallConvention::EnvChannel,
            output: DEFAULT_MOCK_OUTPUT.to_string(),
            outputs_by_circuit: HashMap::new(),
            returns_null: false,
            delay: None,
            panic_message: None,
        }
    }

    pub fn with_convention(mut self, convention: CallConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    /// Return `output` whenever the circuit file is named `circuit`.
    pub fn with_circuit_output(mut self, circuit: impl Into<String>, output: impl Into<String>) -> Self {
        self.outputs_by_circuit.insert(circuit.into(), output.into());
        self
    }

    pub fn returns_null(mut self) -> Self {
        self.returns_null = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn panics(mut self, message: impl Into<String>) -> Self {
        self.panic_message = Some(message.into());
        self
    }
}

/// Mock native library.
///
/// Buffers are allocated with `CString::into_raw` and tracked until released, so
/// tests can check that every result is freed exactly once.
pub struct MockLibrary {
    config: MockConfig,
    runs: AtomicUsize,
    frees: AtomicUsize,
    invalid_frees: AtomicUsize,
    live: Mutex<HashSet<usize>>,
    calls: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl MockLibrary {
    pub fn new(config: MockConfig) -> Self {
        MockLibrary {
            config,
            runs: AtomicUsize::new(0),
            frees: AtomicUsize::new(0),
            invalid_frees: AtomicUsize::new(0),
            live: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn default_mock() -> Self {
        Self::new(MockConfig::new("mock"))
    }

    /// Entry point calls so far.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Buffers released so far.
    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }

    /// Release attempts on pointers this mock does not own (double or foreign frees).
    pub fn invalid_frees(&self) -> usize {
        self.invalid_frees.load(Ordering::SeqCst)
    }

    /// Buffers handed out and not yet released.
    pub fn outstanding(&self) -> usize {
        self.live.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Paths seen by the entry point, in call order.
    pub fn calls(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn received_paths(&self, args: NativeArgs<'_>) -> Option<(PathBuf, PathBuf)> {
        match (self.config.convention, args) {
            (CallConvention::EnvChannel, NativeArgs::Env) => {
                let circuit = std::env::var_os(CIRCUIT_PATH_VAR)?;
                let witness = std::env::var_os(WITNESS_PATH_VAR)?;
                Some((circuit.into(), witness.into()))
            }
            (CallConvention::DirectPaths, NativeArgs::Paths { circuit, witness }) => {
                Some((c_path(circuit), c_path(witness)))
            }
            _ => None,
        }
    }

    fn respond(&self, circuit: Option<&Path>) -> &str {
        circuit
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .and_then(|n| self.config.outputs_by_circuit.get(n))
            .unwrap_or(&self.config.output)
    }
}

#[cfg(unix)]
fn c_path(s: &CStr) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(s.to_bytes()))
}

#[cfg(not(unix))]
fn c_path(s: &CStr) -> PathBuf {
    PathBuf::from(s.to_string_lossy().into_owned())
}

impl NativeLibrary for MockLibrary {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn convention(&self) -> CallConvention {
        self.config.convention
    }

    unsafe fn run_benchmark(&self, args: NativeArgs<'_>) -> *mut c_char {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let paths = self.received_paths(args);
        if let (Some(p), Ok(mut calls)) = (&paths, self.calls.lock()) {
            calls.push(p.clone());
        }
        if let Some(delay) = self.config.delay {
            std::thread::sleep(delay);
        }
        if let Some(msg) = &self.config.panic_message {
            panic!("{msg}");
        }
        if self.config.returns_null {
            return std::ptr::null_mut();
        }
        let text = self.respond(paths.as_ref().map(|(c, _)| c.as_path()));
        let Ok(c_text) = CString::new(text) else {
            return std::ptr::null_mut();
        };
        let raw = c_text.into_raw();
        if let Ok(mut live) = self.live.lock() {
            live.insert(raw as usize);
        }
        raw
    }

    unsafe fn free_result(&self, buf: *mut c_char) {
        let owned = self
            .live
            .lock()
            .map(|mut live| live.remove(&(buf as usize)))
            .unwrap_or(false);
        if owned {
            // SAFETY: `buf` came from `CString::into_raw` above and was still live.
            drop(unsafe { CString::from_raw(buf) });
            self.frees.fetch_add(1, Ordering::SeqCst);
        } else {
            self.invalid_frees.fetch_add(1, Ordering::SeqCst);
        }
    }
}
