//! Boundary to the native proving library.
//!
//! The native side exports one benchmark entry point and one deallocator. The
//! entry point comes in two shapes, chosen when the library is built:
//!
//! - **env channel**: takes no arguments and reads the artifact paths from
//!   `CIRCOM_R1CS_PATH` / `CIRCOM_WTNS_PATH`.
//! - **direct paths**: takes both paths as NUL-terminated strings.
//!
//! Either way it returns a NUL-terminated text buffer allocated by the library,
//! which must go back through the paired deallocator exactly once. The
//! [`NativeResultBuffer`] guard owns that obligation.

pub mod buffer;
pub mod env_channel;
#[cfg(any(feature = "linked", feature = "linked-direct"))]
pub mod linked;
pub mod mock;

use std::ffi::CStr;
use std::os::raw::c_char;

use serde::{Deserialize, Serialize};
use tracing::error;

pub use buffer::NativeResultBuffer;
pub use env_channel::{CIRCUIT_PATH_VAR, EnvChannelScope, WITNESS_PATH_VAR};
pub use mock::{MockConfig, MockLibrary};

/// How the native entry point expects to receive artifact paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallConvention {
    /// Paths are read from process environment variables.
    #[default]
    #[serde(rename = "env")]
    EnvChannel,
    /// Paths are passed as call arguments.
    #[serde(rename = "direct")]
    DirectPaths,
}

/// Arguments for one native call, matching a [`CallConvention`].
#[derive(Debug, Clone, Copy)]
pub enum NativeArgs<'a> {
    Env,
    Paths { circuit: &'a CStr, witness: &'a CStr },
}

/// The pair of entry points exported by a native proving library.
pub trait NativeLibrary: Send + Sync {
    fn name(&self) -> &str;

    fn convention(&self) -> CallConvention;

    /// Run the benchmark.
    ///
    /// # Safety
    ///
    /// `args` must match [`NativeLibrary::convention`]; for the env channel the
    /// caller must hold an [`EnvChannelScope`] for the duration of the call. The
    /// returned pointer is either null or a NUL-terminated buffer that stays valid
    /// until passed to [`NativeLibrary::free_result`].
    unsafe fn run_benchmark(&self, args: NativeArgs<'_>) -> *mut c_char;

    /// Release a buffer returned by [`NativeLibrary::run_benchmark`].
    ///
    /// # Safety
    ///
    /// `buf` must be non-null, come from this library, and not have been released yet.
    unsafe fn free_result(&self, buf: *mut c_char);
}

pub type RunFromEnvFn = unsafe extern "C" fn() -> *mut c_char;
pub type RunWithPathsFn = unsafe extern "C" fn(*const c_char, *const c_char) -> *mut c_char;
pub type FreeResultFn = unsafe extern "C" fn(*mut c_char);

#[derive(Debug, Clone, Copy)]
enum RunSymbol {
    FromEnv(RunFromEnvFn),
    WithPaths(RunWithPathsFn),
}

/// A native library described by its raw exported symbols.
#[derive(Debug, Clone, Copy)]
pub struct NativeSymbols {
    name: &'static str,
    run: RunSymbol,
    free: FreeResultFn,
}

impl NativeSymbols {
    /// Library whose entry point reads paths from the env channel.
    pub const fn from_env(name: &'static str, run: RunFromEnvFn, free: FreeResultFn) -> Self {
        NativeSymbols { name, run: RunSymbol::FromEnv(run), free }
    }

    /// Library whose entry point takes both paths as arguments.
    pub const fn with_paths(name: &'static str, run: RunWithPathsFn, free: FreeResultFn) -> Self {
        NativeSymbols { name, run: RunSymbol::WithPaths(run), free }
    }
}

impl NativeLibrary for NativeSymbols {
    fn name(&self) -> &str {
        self.name
    }

    fn convention(&self) -> CallConvention {
        match self.run {
            RunSymbol::FromEnv(_) => CallConvention::EnvChannel,
            RunSymbol::WithPaths(_) => CallConvention::DirectPaths,
        }
    }

    unsafe fn run_benchmark(&self, args: NativeArgs<'_>) -> *mut c_char {
        match (self.run, args) {
            (RunSymbol::FromEnv(run), NativeArgs::Env) => unsafe { run() },
            (RunSymbol::WithPaths(run), NativeArgs::Paths { circuit, witness }) => unsafe {
                run(circuit.as_ptr(), witness.as_ptr())
            },
            _ => {
                error!(library = self.name, "arguments do not match the exported signature");
                std::ptr::null_mut()
            }
        }
    }

    unsafe fn free_result(&self, buf: *mut c_char) {
        unsafe { (self.free)(buf) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    unsafe extern "C" fn run_fixed() -> *mut c_char {
        CString::new("fixed").unwrap().into_raw()
    }

    unsafe extern "C" fn run_echo(circuit: *const c_char, _witness: *const c_char) -> *mut c_char {
        let circuit = unsafe { CStr::from_ptr(circuit) };
        CString::from(circuit).into_raw()
    }

    unsafe extern "C" fn free_cstring(s: *mut c_char) {
        drop(unsafe { CString::from_raw(s) });
    }

    #[test]
    fn test_symbols_report_convention() {
        let env = NativeSymbols::from_env("env", run_fixed, free_cstring);
        let direct = NativeSymbols::with_paths("direct", run_echo, free_cstring);
        assert_eq!(env.convention(), CallConvention::EnvChannel);
        assert_eq!(direct.convention(), CallConvention::DirectPaths);
    }

    #[test]
    fn test_symbols_pass_paths_through() {
        let lib = NativeSymbols::with_paths("direct", run_echo, free_cstring);
        let circuit = CString::new("/data/rsa.r1cs").unwrap();
        let witness = CString::new("/data/rsa.wtns").unwrap();
        let raw = unsafe {
            lib.run_benchmark(NativeArgs::Paths { circuit: &circuit, witness: &witness })
        };
        let buf = unsafe { NativeResultBuffer::from_raw(&lib, raw) }.unwrap();
        assert_eq!(buf.into_string().unwrap(), "/data/rsa.r1cs");
    }

    #[test]
    fn test_mismatched_args_yield_null() {
        let lib = NativeSymbols::from_env("env", run_fixed, free_cstring);
        let circuit = CString::new("a").unwrap();
        let raw = unsafe {
            lib.run_benchmark(NativeArgs::Paths { circuit: &circuit, witness: &circuit })
        };
        assert!(raw.is_null());
    }

    #[test]
    fn test_convention_parses_from_toml_names() {
        #[derive(Deserialize)]
        struct Wrap {
            convention: CallConvention,
        }
        let w: Wrap = toml::from_str("convention = \"direct\"").unwrap();
        assert_eq!(w.convention, CallConvention::DirectPaths);
        let w: Wrap = toml::from_str("convention = \"env\"").unwrap();
        assert_eq!(w.convention, CallConvention::EnvChannel);
    }
}
