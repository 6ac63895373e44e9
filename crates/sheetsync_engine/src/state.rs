//! Worker state and statistics.

use std::fmt;

/// Lifecycle state of the reconciliation worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No mirror client has ever been acquired.
    Unauthenticated,
    /// Holding a working client.
    Syncing,
    /// The last re-acquisition failed; still using the previous client.
    Degraded,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WorkerState::Unauthenticated => "unauthenticated",
            WorkerState::Syncing => "syncing",
            WorkerState::Degraded => "degraded",
        })
    }
}

/// Counters kept by the worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Events applied to the mirror.
    pub events_applied: u64,
    /// Events that needed no mirror write (unknown delete, no data).
    pub events_noop: u64,
    /// Events dropped because no client was held.
    pub events_dropped: u64,
    /// Events whose mirror write failed.
    pub apply_failures: u64,
    /// Completed full resyncs.
    pub resyncs: u64,
    /// Failed full resyncs.
    pub resync_failures: u64,
    /// Failed client acquisitions.
    pub acquire_failures: u64,
}
