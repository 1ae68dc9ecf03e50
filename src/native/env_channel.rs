//! Per-call scoping of the environment-variable path channel.
//!
//! The env channel is process-wide state. Every call that uses it holds
//! [`EnvChannelScope`] from setting the variables until the native call returns,
//! so overlapping invocations cannot see each other's paths. Previous values are
//! restored when the scope ends.

use std::ffi::OsString;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

/// Circuit description path read by env-channel libraries.
pub const CIRCUIT_PATH_VAR: &str = "CIRCOM_R1CS_PATH";
/// Witness path read by env-channel libraries.
pub const WITNESS_PATH_VAR: &str = "CIRCOM_WTNS_PATH";

static CHANNEL: Mutex<()> = Mutex::new(());

pub struct EnvChannelScope {
    previous: Saved,
    _lock: MutexGuard<'static, ()>,
}

type Saved = [(&'static str, Option<OsString>); 2];

impl EnvChannelScope {
    /// Block until the channel is free, then publish `circuit` and `witness`.
    pub fn enter(circuit: &Path, witness: &Path) -> Self {
        // A panic while the channel was held cannot leave it half-written in a way
        // the next `enter` does not overwrite.
        let lock = CHANNEL.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = publish(circuit, witness);
        trace!(circuit = %circuit.display(), witness = %witness.display(), "env channel set");
        EnvChannelScope { previous, _lock: lock }
    }
}

impl Drop for EnvChannelScope {
    fn drop(&mut self) {
        // `_lock` is released after this body runs.
        restore(&self.previous);
    }
}

/// Caller must hold CHANNEL.
fn publish(circuit: &Path, witness: &Path) -> Saved {
    let previous = [
        (CIRCUIT_PATH_VAR, std::env::var_os(CIRCUIT_PATH_VAR)),
        (WITNESS_PATH_VAR, std::env::var_os(WITNESS_PATH_VAR)),
    ];
    // SAFETY: this crate only touches these variables while holding CHANNEL.
    unsafe {
        std::env::set_var(CIRCUIT_PATH_VAR, circuit);
        std::env::set_var(WITNESS_PATH_VAR, witness);
    }
    previous
}

/// Caller must hold CHANNEL.
fn restore(saved: &Saved) {
    for (key, value) in saved {
        // SAFETY: see `publish`.
        unsafe {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_publishes_paths() {
        let _scope = EnvChannelScope::enter(Path::new("/s/rsa.r1cs"), Path::new("/s/rsa.wtns"));
        assert_eq!(std::env::var(CIRCUIT_PATH_VAR).unwrap(), "/s/rsa.r1cs");
        assert_eq!(std::env::var(WITNESS_PATH_VAR).unwrap(), "/s/rsa.wtns");
    }

    #[test]
    fn test_restore_puts_back_previous_values() {
        let _lock = CHANNEL.lock().unwrap_or_else(PoisonError::into_inner);
        let original = publish(Path::new("/keep/a.r1cs"), Path::new("/keep/a.wtns"));

        let saved = publish(Path::new("/tmp/b.r1cs"), Path::new("/tmp/b.wtns"));
        assert_eq!(std::env::var(CIRCUIT_PATH_VAR).unwrap(), "/tmp/b.r1cs");
        restore(&saved);
        assert_eq!(std::env::var(CIRCUIT_PATH_VAR).unwrap(), "/keep/a.r1cs");
        assert_eq!(std::env::var(WITNESS_PATH_VAR).unwrap(), "/keep/a.wtns");

        restore(&original);
    }
}
