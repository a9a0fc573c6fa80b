//! Status snapshot of the agent process
//!
//! A [`StatusSnapshot`] is refreshed right before every command sent to the
//! Kernel, so the status the Kernel sees is never older than one round trip.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use ct_core::time::{elapsed_between, now_not_before};
use ct_protocol::StatusReport;

/// Memory usage of a process, in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemorySample {
    /// Resident set size
    pub consumed: u64,
    /// Virtual memory size
    pub allocated: u64,
}

/// Samples memory usage of the current process
pub struct ProcessMemory {
    system: System,
    pid: Option<Pid>,
}

impl ProcessMemory {
    /// Create a probe for the current process
    pub fn current() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!("Cannot inspect current process, reporting zero memory: {}", e);
                None
            }
        };

        Self {
            system: System::new(),
            pid,
        }
    }

    /// Take a sample. Reads zero if the process cannot be inspected.
    pub fn sample(&mut self) -> MemorySample {
        let Some(pid) = self.pid else {
            return MemorySample::default();
        };

        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::new().with_memory(),
        );

        self.system
            .process(pid)
            .map(|process| MemorySample {
                consumed: process.memory(),
                allocated: process.virtual_memory(),
            })
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for ProcessMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessMemory").field("pid", &self.pid).finish()
    }
}

/// Point-in-time status of the agent
#[derive(Debug)]
pub struct StatusSnapshot {
    /// Set once at construction
    started_at: DateTime<Utc>,
    /// Never decreases
    updated_at: DateTime<Utc>,
    memory: MemorySample,
    probe: ProcessMemory,
}

impl StatusSnapshot {
    /// Create a snapshot of the current process, starting now
    pub fn new() -> Self {
        let mut probe = ProcessMemory::current();
        let memory = probe.sample();
        let now = Utc::now();

        Self {
            started_at: now,
            updated_at: now,
            memory,
            probe,
        }
    }

    /// Re-read process metrics and move the refresh time to now
    pub fn refresh(&mut self) {
        self.memory = self.probe.sample();
        self.updated_at = now_not_before(self.updated_at);
    }

    /// When the agent started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the snapshot was last refreshed
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Memory usage at the last refresh
    pub fn memory(&self) -> MemorySample {
        self.memory
    }

    /// Time between start and the last refresh
    pub fn uptime(&self) -> Duration {
        elapsed_between(self.started_at, self.updated_at)
    }

    /// The snapshot in wire form
    pub fn report(&self) -> StatusReport {
        StatusReport {
            started_at: self.started_at,
            updated_at: self.updated_at,
            consumed_memory: self.memory.consumed,
            allocated_memory: self.memory.allocated,
        }
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_is_monotonic() {
        let mut snapshot = StatusSnapshot::new();
        let started = snapshot.started_at();
        let mut previous = snapshot.updated_at();

        for _ in 0..50 {
            snapshot.refresh();
            assert!(snapshot.updated_at() >= previous);
            assert_eq!(snapshot.started_at(), started);
            previous = snapshot.updated_at();
        }
    }

    #[test]
    fn test_refresh_survives_clock_step_back() {
        let mut snapshot = StatusSnapshot::new();
        // Pretend an earlier refresh saw a clock that was ahead
        let ahead = Utc::now() + chrono::Duration::minutes(10);
        snapshot.updated_at = ahead;

        snapshot.refresh();
        assert_eq!(snapshot.updated_at(), ahead);
    }

    #[test]
    fn test_uptime_grows() {
        let mut snapshot = StatusSnapshot::new();
        std::thread::sleep(Duration::from_millis(10));
        snapshot.refresh();
        assert!(snapshot.uptime() >= Duration::from_millis(10));
    }

    #[test]
    fn test_current_process_has_memory() {
        let mut probe = ProcessMemory::current();
        let sample = probe.sample();
        assert!(sample.consumed > 0);
        assert!(sample.allocated >= sample.consumed);
    }

    #[test]
    fn test_refresh_samples_memory() {
        let mut snapshot = StatusSnapshot::new();
        snapshot.refresh();
        let memory = snapshot.memory();
        assert!(memory.consumed > 0);
        assert!(memory.allocated >= memory.consumed);
    }

    #[test]
    fn test_report_matches_snapshot() {
        let mut snapshot = StatusSnapshot::new();
        snapshot.refresh();
        let report = snapshot.report();

        assert_eq!(report.started_at, snapshot.started_at());
        assert_eq!(report.updated_at, snapshot.updated_at());
        assert_eq!(report.consumed_memory, snapshot.memory().consumed);
        assert_eq!(report.allocated_memory, snapshot.memory().allocated);
    }
}
