//! Host memory sampling for the metrics-collection loop.
//!
//! Feeds both the awareness handler's sustained-breach gate and the
//! self-optimization handler's threshold check, so both subsystems judge
//! memory pressure off the same sample.

use std::sync::Mutex;

use sysinfo::System;

/// Wraps a [`System`] snapshot behind a mutex so one sampler can be shared
/// across the metrics-collection loop without re-enumerating the process
/// table on every refresh.
pub struct ProcessMetrics {
    system: Mutex<System>,
}

impl ProcessMetrics {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self { system: Mutex::new(system) }
    }

    /// Percentage of total system memory currently in use, in `[0, 100]`.
    pub fn memory_pct(&self) -> f64 {
        let mut system = self.system.lock().expect("process metrics poisoned");
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            return 0.0;
        }
        (system.used_memory() as f64 / total as f64) * 100.0
    }
}

impl Default for ProcessMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_pct_is_within_bounds() {
        let metrics = ProcessMetrics::new();
        let pct = metrics.memory_pct();
        assert!((0.0..=100.0).contains(&pct));
    }
}
