//! Resident-memory snapshots of the current process.
//!
//! Snapshots are taken between pipeline stages (declare, compile, dump,
//! solve) so the growth each stage causes can be attributed to it.

use std::time::Instant;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::trace;

/// Memory state of this process at one point of the pipeline.
#[derive(Debug, Clone)]
pub struct MemorySnapshot {
    /// Resident set size in bytes
    pub rss_bytes: u64,
    pub timestamp: Instant,
    /// Stage label, e.g. "compile" or "highs_dump"
    pub stage: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    ProcessNotFound { pid: u32 },
}

impl MemoryError {
    pub fn code(&self) -> &'static str {
        match self {
            MemoryError::ProcessNotFound { .. } => "TOOLS_PROCESS_NOT_FOUND",
        }
    }
}

impl std::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryError::ProcessNotFound { pid } => {
                write!(f, "[{}] failed to locate process {pid}", self.code())
            }
        }
    }
}

impl std::error::Error for MemoryError {}

impl MemorySnapshot {
    /// Capture the resident set size of this process.
    ///
    /// # Errors
    ///
    /// Returns an error if the current process cannot be located.
    pub fn capture(stage: &str) -> Result<Self, MemoryError> {
        let raw_pid = std::process::id();
        let pid = Pid::from_u32(raw_pid);

        // Refresh this process only.
        let mut sys = System::new();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        let process = sys
            .process(pid)
            .ok_or(MemoryError::ProcessNotFound { pid: raw_pid })?;

        Ok(MemorySnapshot {
            rss_bytes: process.memory(),
            timestamp: Instant::now(),
            stage: stage.to_string(),
        })
    }

    /// RSS growth from `earlier` to `self`, in bytes (negative on shrink).
    pub fn diff(&self, earlier: &Self) -> i64 {
        signed_delta(earlier.rss_bytes, self.rss_bytes)
    }
}

/// Best-effort RSS reading; `None` when the platform cannot report it.
pub fn capture_rss_bytes(stage: &str) -> Option<u64> {
    match MemorySnapshot::capture(stage) {
        Ok(snapshot) => Some(snapshot.rss_bytes),
        Err(err) => {
            trace!(
                component = "memory",
                operation = "capture",
                status = "error",
                stage,
                error = %err,
                "RSS unavailable"
            );
            None
        }
    }
}

/// Growth between two optional readings.
pub fn rss_delta(before: Option<u64>, after: Option<u64>) -> Option<i64> {
    Some(signed_delta(before?, after?))
}

fn signed_delta(before: u64, after: u64) -> i64 {
    if after >= before {
        i64::try_from(after - before).unwrap_or(i64::MAX)
    } else {
        i64::try_from(before - after).map_or(i64::MIN, |shrink| -shrink)
    }
}

/// Ordered snapshots across several stages.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    snapshots: Vec<MemorySnapshot>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns an error if the snapshot could not be captured.
    pub fn record(&mut self, stage: &str) -> Result<(), MemoryError> {
        let snapshot = MemorySnapshot::capture(stage)?;
        self.snapshots.push(snapshot);
        Ok(())
    }

    pub fn snapshots(&self) -> &[MemorySnapshot] {
        &self.snapshots
    }

    /// Growth between the last two snapshots.
    pub fn last_diff(&self) -> Option<i64> {
        match self.snapshots.as_slice() {
            [.., previous, last] => Some(last.diff(previous)),
            _ => None,
        }
    }

    /// The stage with the largest growth over its predecessor.
    pub fn peak_growth(&self) -> Option<(&str, i64)> {
        self.snapshots
            .windows(2)
            .map(|pair| (pair[1].stage.as_str(), pair[1].diff(&pair[0])))
            .max_by_key(|(_, growth)| *growth)
    }
}
