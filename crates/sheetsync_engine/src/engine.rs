//! Wiring: position capture, change stream, event queue and worker.

use crate::config::EngineConfig;
use crate::credentials::{auth_channel, AuthNotifier, CredentialProvider};
use crate::error::{EngineError, EngineResult};
use crate::ingest::{event_channel, IngestionFilter};
use crate::policy::policy_for;
use crate::position::capture_start_position;
use crate::state::WorkerStats;
use crate::stream::ChangeLogStream;
use crate::worker::ReconciliationWorker;
use sheetsync_protocol::SyncPosition;
use sheetsync_store::Store;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::watch;
use tracing::info;

/// The assembled sync engine, not yet running.
pub struct SyncEngine<P: CredentialProvider> {
    config: EngineConfig,
    store: Arc<Store>,
    provider: P,
}

impl<P: CredentialProvider + 'static> SyncEngine<P> {
    /// Creates an engine over `store`.
    pub fn new(config: EngineConfig, store: Arc<Store>, provider: P) -> Self {
        Self {
            config,
            store,
            provider,
        }
    }

    /// Captures the start position and starts the worker and stream threads.
    ///
    /// Fails if the start position cannot be read or a thread cannot be
    /// spawned.
    pub fn start(self) -> EngineResult<EngineHandle> {
        let position = capture_start_position(&self.store)?;

        let (events_tx, events_rx) = event_channel(self.config.queue_capacity);
        let (notifier, signal) = auth_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let worker = ReconciliationWorker::new(self.provider, self.store.clone())
            .with_policy(policy_for(&self.config.retry))
            .with_shutdown(shutdown_rx)
            .spawn(events_rx, signal)?;

        let stream = ChangeLogStream::new(
            self.store,
            IngestionFilter::new(self.config.watched_table.clone(), events_tx),
            position.clone(),
        )
        .with_batch_size(self.config.stream_batch_size)
        .with_poll_interval(self.config.poll_interval);
        let stop = stream.stop_flag();
        let stream = stream.spawn()?;

        info!(position = %position, spreadsheet = %self.config.spreadsheet_id, "Sync engine started");
        Ok(EngineHandle {
            position,
            notifier,
            shutdown,
            stop,
            stream,
            worker,
        })
    }
}

/// A running engine.
pub struct EngineHandle {
    position: SyncPosition,
    notifier: AuthNotifier,
    shutdown: watch::Sender<bool>,
    stop: Arc<AtomicBool>,
    stream: JoinHandle<()>,
    worker: JoinHandle<WorkerStats>,
}

impl EngineHandle {
    /// Position the change stream started from.
    pub fn start_position(&self) -> &SyncPosition {
        &self.position
    }

    /// A notifier for the login-completion hook.
    pub fn notifier(&self) -> AuthNotifier {
        self.notifier.clone()
    }

    /// Stops the change stream, lets the worker drain the queue, and
    /// returns the worker's counters.
    ///
    /// Mirror calls already in flight are not interrupted. A worker still
    /// waiting for its first login stops waiting and drops the queued events.
    pub fn shutdown(self) -> EngineResult<WorkerStats> {
        self.stop.store(true, Ordering::SeqCst);
        // the worker may be gone already
        let _ = self.shutdown.send(true);
        drop(self.notifier);
        self.stream
            .join()
            .map_err(|_| EngineError::Io(std::io::Error::other("change stream thread panicked")))?;
        let stats = self
            .worker
            .join()
            .map_err(|_| EngineError::Io(std::io::Error::other("worker thread panicked")))?;
        info!(?stats, "Sync engine stopped");
        Ok(stats)
    }
}
