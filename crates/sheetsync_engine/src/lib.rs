//! # sheetsync engine
//!
//! Keeps the `product` table and a spreadsheet mirror convergent.
//!
//! This crate provides:
//! - Change ingestion with self-write suppression
//! - A bounded event queue between ingestion and the worker
//! - The mirror client trait, an in-memory mirror and a Sheets-over-HTTP mirror
//! - Row location by key scan
//! - The reconciliation worker with full resync and credential hot-reload
//! - Start position capture and the change-log stream
//! - A pluggable retry policy for mirror writes
//!
//! ## Architecture
//!
//! ```text
//! store commit ─▶ change_log ─▶ ChangeLogStream ─▶ IngestionFilter
//!                                                     │ blocking send
//!                                                     ▼
//!         login hook ─▶ AuthNotifier ─▶ ReconciliationWorker ─▶ mirror
//! ```
//!
//! ## Key Invariants
//!
//! - A change attributed to the sentinel never becomes an event
//! - Events are applied one at a time in change-log order
//! - Ingestion never drops a change to relieve pressure; it blocks instead
//! - Only the worker touches the mirror client
//! - Entering `Syncing` always runs a full resync

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod credentials;
mod engine;
mod error;
mod http;
mod ingest;
mod locate;
mod memory;
mod mirror;
mod policy;
mod position;
mod state;
mod stream;
mod worker;

pub use config::{EngineConfig, RetryConfig, DEFAULT_QUEUE_CAPACITY};
pub use credentials::{
    auth_channel, AuthNotifier, AuthSignal, CredentialProvider, MemoryCredentials,
    StoredTokenProvider,
};
pub use engine::{EngineHandle, SyncEngine};
pub use error::{EngineError, EngineResult};
pub use http::{
    HttpClient, HttpRequest, HttpResponse, Method, SheetTarget, SheetsMirror, SHEETS_API_BASE,
};
pub use ingest::{classify, event_channel, EventReceiver, EventSender, IngestionFilter, Verdict};
pub use locate::locate;
pub use memory::{MemoryMirror, MirrorOp};
pub use mirror::{
    ensure_header, event_row, now_timestamp, resync_row, update_slice, MirrorClient, HEADER,
    ROW_WIDTH, TIMESTAMP_FORMAT,
};
pub use policy::{policy_for, ApplyPolicy, BackoffRetry, NoRetry};
pub use position::capture_start_position;
pub use state::{WorkerState, WorkerStats};
pub use stream::{ChangeLogStream, PollOutcome};
pub use worker::{full_resync, ApplyOutcome, ReconciliationWorker};
