//! Memory backpressure for the classification loop.
//!
//! After every classified document the governor compares used memory against a
//! ceiling and, above the configured ratio, sleeps for a fixed delay so freed
//! buffers can be returned before the next document is read. It never forces
//! reclamation itself.

use std::sync::Mutex;
use std::time::Duration;

use sysinfo::System;
use tracing::{debug, info};

pub const DEFAULT_PRESSURE_RATIO: f64 = 0.7;
pub const DEFAULT_BACKPRESSURE_DELAY: Duration = Duration::from_millis(5000);

/// Source of the current memory reading.
pub trait MemoryProbe: Send + Sync {
    /// Bytes currently in use by this process.
    fn used_bytes(&self) -> u64;

    /// Ceiling the usage is measured against.
    fn ceiling_bytes(&self) -> u64;
}

/// Resident set size of the current process, via `sysinfo`.
pub struct ProcessMemoryProbe {
    system: Mutex<System>,
    ceiling_bytes: u64,
}

impl ProcessMemoryProbe {
    /// Without an explicit ceiling, the cgroup memory limit is used when the
    /// process runs under one, total system memory otherwise.
    pub fn new(ceiling_bytes: Option<u64>) -> Self {
        let mut system = System::new();
        system.refresh_memory();
        let ceiling_bytes = ceiling_bytes.unwrap_or_else(|| {
            default_ceiling(
                system.cgroup_limits().map(|limits| limits.total_memory),
                system.total_memory(),
            )
        });
        debug!(ceiling_bytes, "Memory ceiling selected");
        Self {
            system: Mutex::new(system),
            ceiling_bytes,
        }
    }
}

/// An unlimited cgroup can report a limit above physical memory.
fn default_ceiling(cgroup_limit: Option<u64>, total_memory: u64) -> u64 {
    match cgroup_limit {
        Some(limit) if limit > 0 && (total_memory == 0 || limit < total_memory) => limit,
        _ => total_memory,
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn used_bytes(&self) -> u64 {
        let Ok(pid) = sysinfo::get_current_pid() else {
            return 0;
        };
        let Ok(mut system) = self.system.lock() else {
            return 0;
        };
        system.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[pid]), true);
        system.process(pid).map(sysinfo::Process::memory).unwrap_or(0)
    }

    fn ceiling_bytes(&self) -> u64 {
        self.ceiling_bytes
    }
}

/// Pressure policy: pause for `delay` whenever usage exceeds `ratio` of the ceiling.
pub struct BackpressureGovernor {
    probe: Box<dyn MemoryProbe>,
    ratio: f64,
    delay: Duration,
}

impl BackpressureGovernor {
    pub fn new(probe: Box<dyn MemoryProbe>, ratio: f64, delay: Duration) -> Self {
        Self {
            probe,
            ratio,
            delay,
        }
    }

    /// Used / ceiling. A zero ceiling reads as no pressure.
    #[allow(clippy::cast_precision_loss)]
    pub fn utilization(&self) -> f64 {
        let ceiling = self.probe.ceiling_bytes();
        if ceiling == 0 {
            return 0.0;
        }
        self.probe.used_bytes() as f64 / ceiling as f64
    }

    /// Pause to take before the next step, if any.
    pub fn assess(&self) -> Option<Duration> {
        let utilization = self.utilization();
        if utilization > self.ratio {
            Some(self.delay)
        } else {
            debug!(utilization, "Memory within bounds");
            None
        }
    }

    /// Returns whether a pause was taken.
    pub async fn throttle(&self) -> bool {
        match self.assess() {
            Some(delay) => {
                info!(
                    utilization = self.utilization(),
                    delay_ms = delay.as_millis() as u64,
                    "Memory pressure, pausing classification"
                );
                tokio::time::sleep(delay).await;
                true
            }
            None => false,
        }
    }
}
