//! Memory and CPU report logged before benchmarks run.

use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub os: Option<String>,
    pub cpu_model: Option<String>,
    pub logical_cpus: usize,
    pub total_memory_bytes: u64,
    pub available_memory_bytes: u64,
}

impl DeviceInfo {
    pub fn detect() -> Self {
        let sys = system_snapshot();
        DeviceInfo {
            os: System::name(),
            cpu_model: sys.cpus().first().map(|c| c.brand().to_string()),
            logical_cpus: sys.cpus().len(),
            total_memory_bytes: sys.total_memory(),
            available_memory_bytes: sys.available_memory(),
        }
    }

    pub fn log(&self) {
        tracing::info!(
            os = self.os.as_deref().unwrap_or("unknown"),
            cpus = self.logical_cpus,
            total_mb = self.total_memory_bytes / (1024 * 1024),
            available_mb = self.available_memory_bytes / (1024 * 1024),
            "device memory"
        );
    }
}

/// Memory and CPU only; processes are never enumerated.
fn system_snapshot() -> System {
    System::new_with_specifics(
        RefreshKind::new()
            .with_memory(MemoryRefreshKind::everything())
            .with_cpu(CpuRefreshKind::new()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_reports_memory() {
        let info = DeviceInfo::detect();
        assert!(info.total_memory_bytes > 0);
        assert!(info.logical_cpus > 0);
    }

    #[test]
    fn test_snapshot_skips_process_table() {
        let sys = system_snapshot();
        assert!(sys.processes().is_empty());
        assert!(sys.total_memory() > 0);
    }
}
