use sysinfo::{Pid, System};

/// Samples this process's resident memory. Observability only.
pub struct MemorySampler {
    system: System,
    pid: Option<Pid>,
}

impl MemorySampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }

    /// Resident set size in MiB, if the platform reports it.
    pub fn resident_mb(&mut self) -> Option<f64> {
        let pid = self.pid?;
        if !self.system.refresh_process(pid) {
            return None;
        }
        self.system
            .process(pid)
            .map(|p| p.memory() as f64 / 1024.0 / 1024.0)
    }
}

impl Default for MemorySampler {
    fn default() -> Self {
        Self::new()
    }
}
