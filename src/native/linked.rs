//! Symbols of the native prover (`librust_lib`) linked into the application.
//!
//! The mobile build exports the env-channel entry point: `run_benchmark` reads
//! `CIRCOM_R1CS_PATH` and `CIRCOM_WTNS_PATH`. Builds with `linked-direct` export
//! `run_benchmark_with_paths` instead, taking both paths as arguments. Either way
//! `free_string` releases the result.

use std::os::raw::c_char;

use super::NativeSymbols;

#[cfg(not(feature = "linked-direct"))]
#[link(name = "rust_lib")]
unsafe extern "C" {
    fn run_benchmark() -> *mut c_char;
}

#[cfg(feature = "linked-direct")]
#[link(name = "rust_lib")]
unsafe extern "C" {
    fn run_benchmark_with_paths(circuit: *const c_char, witness: *const c_char) -> *mut c_char;
}

#[link(name = "rust_lib")]
unsafe extern "C" {
    fn free_string(s: *mut c_char);
}

pub const LIBRARY_NAME: &str = "rust_lib";

#[cfg(not(feature = "linked-direct"))]
pub fn linked_library() -> NativeSymbols {
    NativeSymbols::from_env(LIBRARY_NAME, run_benchmark, free_string)
}

#[cfg(feature = "linked-direct")]
pub fn linked_library() -> NativeSymbols {
    NativeSymbols::with_paths(LIBRARY_NAME, run_benchmark_with_paths, free_string)
}
