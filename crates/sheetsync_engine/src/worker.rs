//! The reconciliation worker.
//!
//! A single consumer of the event queue that owns the mirror client. It
//! waits on two inputs, the hot-reload signal and the event queue, and
//! handles one item at a time:
//!
//! ```text
//!            acquire ok                     hot-reload ok
//! Unauthenticated ───────▶ Syncing ◀──────────────────────┐
//!        │                    │   hot-reload fails        │
//!        │ acquire fails      └──────────────▶ Degraded ──┘
//!        ▼
//!  wait for one auth signal, retry once
//! ```
//!
//! Entering `Syncing` always runs a full resync. Events arriving while no
//! client is held are dropped; the next resync repairs the gap. A shutdown
//! signal ends the wait for login so the queue can still be drained.

use crate::credentials::{AuthSignal, CredentialProvider};
use crate::error::{EngineError, EngineResult};
use crate::ingest::EventReceiver;
use crate::locate::locate;
use crate::mirror::{self, MirrorClient};
use crate::policy::{ApplyPolicy, NoRetry};
use crate::state::{WorkerState, WorkerStats};
use sheetsync_protocol::{ChangeAction, ChangeEvent};
use sheetsync_store::Store;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// What happened to one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A new row was appended.
    Appended,
    /// An existing row was overwritten.
    Updated,
    /// A row was removed.
    Deleted,
    /// Nothing to write.
    NoOp,
    /// No client was held.
    Dropped,
    /// The mirror write failed.
    Failed,
}

/// Single-owner reconciliation worker.
pub struct ReconciliationWorker<P: CredentialProvider> {
    provider: P,
    store: Arc<Store>,
    client: Option<Box<dyn MirrorClient>>,
    state: WorkerState,
    policy: Box<dyn ApplyPolicy>,
    stats: WorkerStats,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<P: CredentialProvider> ReconciliationWorker<P> {
    /// Creates a worker with no client and the no-retry policy.
    pub fn new(provider: P, store: Arc<Store>) -> Self {
        Self {
            provider,
            store,
            client: None,
            state: WorkerState::Unauthenticated,
            policy: Box::new(NoRetry),
            stats: WorkerStats::default(),
            shutdown: None,
        }
    }

    /// Sets the retry policy for mirror writes.
    pub fn with_policy(mut self, policy: Box<dyn ApplyPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Stops waiting for login once `shutdown` turns true.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Current state.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Counters so far.
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Tries to acquire a client; on success it replaces the current one and
    /// runs a full resync.
    ///
    /// On failure the previous client, if any, stays in use.
    pub fn reacquire(&mut self) -> bool {
        match self.provider.acquire() {
            Ok(client) => {
                mirror::ensure_header_or_warn(client.as_ref());
                self.client = Some(client);
                self.state = WorkerState::Syncing;
                info!("Mirror client acquired");
                self.resync();
                true
            }
            Err(e) => {
                self.stats.acquire_failures += 1;
                if self.client.is_some() {
                    self.state = WorkerState::Degraded;
                    warn!(error = %e, "Mirror client refresh failed, keeping previous client");
                } else {
                    warn!(error = %e, "Mirror client unavailable");
                }
                false
            }
        }
    }

    /// Startup: acquire, or wait for one auth signal and try once more.
    pub async fn start(&mut self, auth: &mut AuthSignal) {
        if self.reacquire() {
            return;
        }
        info!("Worker stalled, waiting for login");
        let logged_in = match self.shutdown.as_mut() {
            Some(shutdown) => tokio::select! {
                signal = auth.recv() => signal.is_some(),
                _ = shutdown.wait_for(|stop| *stop) => {
                    info!("Shutdown requested before login");
                    false
                }
            },
            None => auth.recv().await.is_some(),
        };
        if logged_in {
            info!("Login completed, resuming");
            self.reacquire();
        }
    }

    fn client(&self) -> EngineResult<&dyn MirrorClient> {
        self.client.as_deref().ok_or(EngineError::NotConnected)
    }

    /// Handles a hot-reload notification.
    pub fn hot_reload(&mut self) {
        info!("Hot reload: refreshing mirror client");
        self.reacquire();
    }

    /// Overwrites the mirror's data region with every store row.
    pub fn resync(&mut self) -> bool {
        let client = match self.client() {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Resync skipped");
                return false;
            }
        };
        match full_resync(client, &self.store) {
            Ok(rows) => {
                self.stats.resyncs += 1;
                info!(rows, "Full resync complete");
                true
            }
            Err(e) => {
                self.stats.resync_failures += 1;
                error!(error = %e, "Full resync failed");
                false
            }
        }
    }

    /// Applies one event to the mirror.
    pub fn handle_event(&mut self, event: &ChangeEvent) -> ApplyOutcome {
        let client = match self.client() {
            Ok(client) => client,
            Err(e) => {
                self.stats.events_dropped += 1;
                warn!(key = %event.key, action = %event.action, error = %e, "Skipping event");
                return ApplyOutcome::Dropped;
            }
        };

        debug!(key = %event.key, action = %event.action, actor = %event.attribution, "Processing event");
        let mut outcome = ApplyOutcome::NoOp;
        let result = self.policy.run(&mut || {
            outcome = apply_event(client, event)?;
            Ok(())
        });

        match result {
            Ok(()) => {
                match outcome {
                    ApplyOutcome::NoOp => self.stats.events_noop += 1,
                    _ => self.stats.events_applied += 1,
                }
                outcome
            }
            Err(e) => {
                self.stats.apply_failures += 1;
                warn!(key = %event.key, action = %event.action, error = %e, "Mirror apply failed, event dropped");
                ApplyOutcome::Failed
            }
        }
    }

    /// Runs until the event queue closes and returns the final counters.
    pub async fn run(mut self, mut events: EventReceiver, mut auth: AuthSignal) -> WorkerStats {
        self.start(&mut auth).await;
        info!(state = %self.state, "Reconciliation worker running");

        loop {
            tokio::select! {
                biased;
                Some(()) = auth.recv() => self.hot_reload(),
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle_event(&event);
                    }
                    None => {
                        info!("Event queue closed, worker stopping");
                        break;
                    }
                },
            }
        }
        self.stats
    }
}

impl<P: CredentialProvider + 'static> ReconciliationWorker<P> {
    /// Runs the worker on a dedicated thread with its own single-threaded
    /// runtime.
    pub fn spawn(
        self,
        events: EventReceiver,
        auth: AuthSignal,
    ) -> EngineResult<JoinHandle<WorkerStats>> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let handle = std::thread::Builder::new()
            .name("sheetsync-worker".to_string())
            .spawn(move || runtime.block_on(self.run(events, auth)))?;
        Ok(handle)
    }
}

fn apply_event(client: &dyn MirrorClient, event: &ChangeEvent) -> EngineResult<ApplyOutcome> {
    match event.action {
        ChangeAction::Delete => match locate(client, &event.key)? {
            Some(row) => {
                client.delete_row(row)?;
                info!(key = %event.key, row = row + 1, "Deleted mirror row");
                Ok(ApplyOutcome::Deleted)
            }
            None => {
                debug!(key = %event.key, "Key not in mirror, skipping delete");
                Ok(ApplyOutcome::NoOp)
            }
        },
        ChangeAction::Insert | ChangeAction::Update => {
            if !event.has_data() {
                debug!(key = %event.key, "Event carries no data columns");
                return Ok(ApplyOutcome::NoOp);
            }
            let values = mirror::event_row(event, &mirror::now_timestamp());
            match locate(client, &event.key)? {
                Some(row) => {
                    client.update_row(row, mirror::update_slice(&values))?;
                    info!(key = %event.key, row = row + 1, updated_by = %event.attribution, "Synced mirror row");
                    Ok(ApplyOutcome::Updated)
                }
                None => {
                    client.append_row(&values)?;
                    info!(key = %event.key, updated_by = %event.attribution, "Appended mirror row");
                    Ok(ApplyOutcome::Appended)
                }
            }
        }
    }
}

/// Clears the mirror's data region and rewrites it from the store.
///
/// Returns the number of rows written. The store is read before anything is
/// cleared.
pub fn full_resync(client: &dyn MirrorClient, store: &Store) -> EngineResult<usize> {
    let products = store.list_products().map_err(EngineError::from)?;
    let timestamp = mirror::now_timestamp();
    let rows: Vec<_> = products
        .iter()
        .map(|product| mirror::resync_row(product, &timestamp))
        .collect();

    client.clear_data()?;
    client.write_rows(&rows)?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{auth_channel, MemoryCredentials};
    use crate::memory::{MemoryMirror, MirrorOp};
    use crate::policy::BackoffRetry;
    use crate::RetryConfig;
    use sheetsync_protocol::{Attribution, CellValue, Column};
    use sheetsync_store::NewProduct;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn store_with(rows: &[(&str, &str, Option<&str>)]) -> Arc<Store> {
        let store = Store::open_in_memory().unwrap();
        for (uuid, name, actor) in rows {
            store
                .create_product(
                    &NewProduct::new(*name, 1, 2.5, false).with_uuid(*uuid),
                    &Attribution::from_actor(*actor),
                )
                .unwrap();
        }
        Arc::new(store)
    }

    fn event(key: &str, action: ChangeAction, name: Option<&str>) -> ChangeEvent {
        let mut fields = BTreeMap::new();
        if let Some(name) = name {
            fields.insert(Column::ProductName, CellValue::from(name));
            fields.insert(Column::Quantity, CellValue::Integer(4));
        }
        ChangeEvent::new(key, action, fields, Attribution::from_actor(Some("ana@example.com")))
    }

    fn worker(mirror: &MemoryMirror, store: Arc<Store>) -> ReconciliationWorker<MemoryCredentials> {
        ReconciliationWorker::new(MemoryCredentials::authorized(mirror.clone()), store)
    }

    #[test]
    fn acquire_writes_header_and_resyncs() {
        let mirror = MemoryMirror::new();
        let mut worker = worker(&mirror, store_with(&[("k1", "A", Some("ana")), ("k2", "B", None)]));

        assert!(worker.reacquire());
        assert_eq!(worker.state(), WorkerState::Syncing);
        assert_eq!(mirror.header()[0], CellValue::from("UUID"));

        let rows = mirror.data_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], CellValue::from("k1"));
        assert_eq!(rows[1][0], CellValue::from("k2"));
        // create_product defaults a missing actor to system
        assert_eq!(rows[1][6], CellValue::from("system"));
        assert_eq!(worker.stats().resyncs, 1);
    }

    #[test]
    fn resync_replaces_drifted_rows() {
        let mirror = MemoryMirror::with_rows(vec![
            vec![CellValue::from("UUID")],
            vec![CellValue::from("stale")],
            vec![CellValue::from("k1"), CellValue::from("old name")],
        ]);
        let mut worker = worker(&mirror, store_with(&[("k1", "A", Some("ana"))]));
        worker.reacquire();

        let rows = mirror.data_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], CellValue::from("A"));
        assert_eq!(rows[0][6], CellValue::from("ana"));
        assert_eq!(mirror.header(), vec![CellValue::from("UUID")]);
    }

    #[test]
    fn events_without_client_are_dropped() {
        let mirror = MemoryMirror::new();
        let mut worker =
            ReconciliationWorker::new(MemoryCredentials::new(mirror.clone()), store_with(&[]));
        assert!(!worker.reacquire());
        assert_eq!(worker.state(), WorkerState::Unauthenticated);

        let outcome = worker.handle_event(&event("k1", ChangeAction::Insert, Some("A")));
        assert_eq!(outcome, ApplyOutcome::Dropped);
        assert_eq!(worker.stats().events_dropped, 1);
        assert!(mirror.ops().is_empty());
    }

    #[test]
    fn insert_appends_then_update_overwrites() {
        let mirror = MemoryMirror::new();
        let mut worker = worker(&mirror, store_with(&[]));
        worker.reacquire();

        assert_eq!(
            worker.handle_event(&event("k1", ChangeAction::Insert, Some("A"))),
            ApplyOutcome::Appended
        );
        assert_eq!(
            worker.handle_event(&event("k1", ChangeAction::Update, Some("B"))),
            ApplyOutcome::Updated
        );

        let rows = mirror.data_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], CellValue::from("k1"));
        assert_eq!(rows[0][1], CellValue::from("B"));
        assert_eq!(rows[0][6], CellValue::from("ana@example.com"));
    }

    #[test]
    fn update_of_unknown_key_appends() {
        let mirror = MemoryMirror::new();
        let mut worker = worker(&mirror, store_with(&[]));
        worker.reacquire();
        assert_eq!(
            worker.handle_event(&event("k9", ChangeAction::Update, Some("Z"))),
            ApplyOutcome::Appended
        );
    }

    #[test]
    fn delete_is_idempotent() {
        let mirror = MemoryMirror::new();
        let mut worker = worker(&mirror, store_with(&[("k1", "A", None)]));
        worker.reacquire();
        mirror.clear_ops();

        assert_eq!(
            worker.handle_event(&event("k1", ChangeAction::Delete, None)),
            ApplyOutcome::Deleted
        );
        assert_eq!(
            worker.handle_event(&event("k1", ChangeAction::Delete, None)),
            ApplyOutcome::NoOp
        );
        assert_eq!(
            mirror.ops(),
            vec![MirrorOp::ReadKeys, MirrorOp::Delete(1), MirrorOp::ReadKeys]
        );
        assert!(mirror.data_rows().is_empty());
        assert_eq!(worker.stats().apply_failures, 0);
    }

    #[test]
    fn event_without_data_is_noop() {
        let mirror = MemoryMirror::new();
        let mut worker = worker(&mirror, store_with(&[]));
        worker.reacquire();
        mirror.clear_ops();

        assert_eq!(
            worker.handle_event(&event("k1", ChangeAction::Update, None)),
            ApplyOutcome::NoOp
        );
        assert!(mirror.ops().is_empty());
    }

    #[test]
    fn apply_failure_drops_event() {
        let mirror = MemoryMirror::new();
        let mut worker = worker(&mirror, store_with(&[]));
        worker.reacquire();
        mirror.set_failing(true);

        assert_eq!(
            worker.handle_event(&event("k1", ChangeAction::Insert, Some("A"))),
            ApplyOutcome::Failed
        );
        assert_eq!(worker.stats().apply_failures, 1);

        mirror.set_failing(false);
        assert_eq!(
            worker.handle_event(&event("k2", ChangeAction::Insert, Some("B"))),
            ApplyOutcome::Appended
        );
        assert!(mirror.find("k1").is_none());
    }

    #[test]
    fn failed_refresh_keeps_previous_client() {
        let mirror = MemoryMirror::new();
        let creds = Arc::new(MemoryCredentials::authorized(mirror.clone()));
        let mut worker = ReconciliationWorker::new(creds.clone(), store_with(&[]));
        worker.reacquire();

        creds.revoke();
        worker.hot_reload();
        assert_eq!(worker.state(), WorkerState::Degraded);
        assert_eq!(
            worker.handle_event(&event("k1", ChangeAction::Insert, Some("A"))),
            ApplyOutcome::Appended
        );

        creds.authorize();
        worker.hot_reload();
        assert_eq!(worker.state(), WorkerState::Syncing);
        assert_eq!(worker.stats().resyncs, 2);
    }

    #[test]
    fn resync_failure_is_absorbed() {
        let mirror = MemoryMirror::new();
        let mut worker = worker(&mirror, store_with(&[("k1", "A", None)]));
        worker.reacquire();
        mirror.set_failing(true);

        assert!(!worker.resync());
        assert_eq!(worker.stats().resync_failures, 1);
        assert_eq!(worker.state(), WorkerState::Syncing);
    }

    #[test]
    fn backoff_policy_gives_up_on_persistent_failure() {
        let mirror = MemoryMirror::new();
        let policy = BackoffRetry::new(
            RetryConfig::new(3)
                .with_initial_delay(Duration::from_millis(1))
                .with_jitter(false),
        );
        let mut worker = worker(&mirror, store_with(&[])).with_policy(Box::new(policy));
        worker.reacquire();
        mirror.set_failing(true);

        assert_eq!(
            worker.handle_event(&event("k1", ChangeAction::Insert, Some("A"))),
            ApplyOutcome::Failed
        );
    }

    #[tokio::test]
    async fn start_waits_for_login() {
        let mirror = MemoryMirror::new();
        let creds = Arc::new(MemoryCredentials::new(mirror.clone()));
        let mut worker = ReconciliationWorker::new(creds.clone(), store_with(&[("k1", "A", None)]));
        let (notifier, mut signal) = auth_channel();

        let login = creds.clone();
        tokio::spawn(async move {
            login.authorize();
            notifier.notify();
        });

        worker.start(&mut signal).await;
        assert_eq!(worker.state(), WorkerState::Syncing);
        assert_eq!(creds.attempts(), 2);
        assert_eq!(mirror.data_rows().len(), 1);
    }

    #[tokio::test]
    async fn start_retries_once_after_signal() {
        let mirror = MemoryMirror::new();
        let creds = Arc::new(MemoryCredentials::new(mirror.clone()));
        let mut worker = ReconciliationWorker::new(creds.clone(), store_with(&[]));
        let (notifier, mut signal) = auth_channel();

        notifier.notify();
        worker.start(&mut signal).await;
        assert_eq!(worker.state(), WorkerState::Unauthenticated);
        assert_eq!(creds.attempts(), 2);
    }

    #[test]
    fn missing_client_reports_not_connected() {
        let worker =
            ReconciliationWorker::new(MemoryCredentials::new(MemoryMirror::new()), store_with(&[]));
        assert!(matches!(worker.client(), Err(EngineError::NotConnected)));
    }

    #[tokio::test]
    async fn shutdown_ends_wait_for_login() {
        let mirror = MemoryMirror::new();
        let creds = Arc::new(MemoryCredentials::new(mirror.clone()));
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut worker =
            ReconciliationWorker::new(creds.clone(), store_with(&[])).with_shutdown(stop_rx);
        // the notifier stays alive, so only the shutdown signal can end the wait
        let (_notifier, mut signal) = auth_channel();

        tokio::spawn(async move {
            let _ = stop_tx.send(true);
        });

        worker.start(&mut signal).await;
        assert_eq!(worker.state(), WorkerState::Unauthenticated);
        assert_eq!(creds.attempts(), 1);
        assert_eq!(
            worker.handle_event(&event("k1", ChangeAction::Insert, Some("A"))),
            ApplyOutcome::Dropped
        );
        assert!(mirror.ops().is_empty());
    }

    #[tokio::test]
    async fn start_gives_up_when_notifier_is_gone() {
        let mirror = MemoryMirror::new();
        let creds = Arc::new(MemoryCredentials::new(mirror));
        let mut worker = ReconciliationWorker::new(creds.clone(), store_with(&[]));
        let (notifier, mut signal) = auth_channel();
        drop(notifier);

        worker.start(&mut signal).await;
        assert_eq!(creds.attempts(), 1);
    }
}
