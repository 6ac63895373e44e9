//! Replication stream over the store's change log.
//!
//! Polls records after the current position in commit order and drives the
//! ingestion filter with each of them. The position only moves forward.

use crate::error::{EngineError, EngineResult};
use crate::ingest::{IngestionFilter, Verdict};
use sheetsync_protocol::SyncPosition;
use sheetsync_store::Store;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, warn};

/// Counters for one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// Records read from the log.
    pub read: usize,
    /// Records turned into events.
    pub forwarded: usize,
    /// Records written by the engine itself.
    pub suppressed: usize,
    /// Records that could not be decoded or classified.
    pub skipped: usize,
}

/// Tails the change log from a start position.
pub struct ChangeLogStream {
    store: Arc<Store>,
    filter: IngestionFilter,
    position: SyncPosition,
    batch_size: usize,
    poll_interval: Duration,
    stop: Arc<AtomicBool>,
}

impl ChangeLogStream {
    /// Creates a stream resuming after `position`.
    pub fn new(store: Arc<Store>, filter: IngestionFilter, position: SyncPosition) -> Self {
        Self {
            store,
            filter,
            position,
            batch_size: 100,
            poll_interval: Duration::from_millis(500),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sets the maximum records read per poll.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Sets how long to sleep when caught up.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Returns the current position.
    pub fn position(&self) -> &SyncPosition {
        &self.position
    }

    /// Returns a flag that stops [`ChangeLogStream::run`] when set.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Reads one batch and ingests it.
    ///
    /// Undecodable records are logged and skipped. Fails with
    /// [`EngineError::QueueClosed`] once the worker is gone.
    pub fn poll_once(&mut self) -> EngineResult<PollOutcome> {
        let records = self
            .store
            .changes_since(self.position.offset, self.batch_size)?;
        let mut outcome = PollOutcome {
            read: records.len(),
            ..PollOutcome::default()
        };

        for record in records {
            match &record.decoded {
                Ok(change) => match self.filter.ingest(change)? {
                    Verdict::Forwarded(_) => outcome.forwarded += 1,
                    Verdict::Suppressed => outcome.suppressed += 1,
                    Verdict::Skipped(_) => outcome.skipped += 1,
                },
                Err(e) => {
                    warn!(seq = record.seq, error = %e, "Skipping undecodable change record");
                    outcome.skipped += 1;
                }
            }
            self.position = self.position.advanced_to(record.seq);
        }
        Ok(outcome)
    }

    /// Polls until stopped or until the event queue closes.
    pub fn run(mut self) {
        info!(position = %self.position, table = %self.filter.table(), "Change stream starting");
        while !self.stop.load(Ordering::SeqCst) {
            match self.poll_once() {
                Ok(outcome) if outcome.read > 0 => continue,
                Ok(_) => std::thread::sleep(self.poll_interval),
                Err(EngineError::QueueClosed) => {
                    info!("Event queue closed, change stream stopping");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, position = %self.position, "Change log read failed");
                    std::thread::sleep(self.poll_interval);
                }
            }
        }
        info!(position = %self.position, "Change stream stopped");
    }

    /// Runs the stream on a dedicated thread.
    pub fn spawn(self) -> EngineResult<JoinHandle<()>> {
        let handle = std::thread::Builder::new()
            .name("sheetsync-change-stream".to_string())
            .spawn(move || self.run())?;
        Ok(handle)
    }
}
