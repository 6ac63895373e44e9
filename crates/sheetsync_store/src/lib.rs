//! # sheetsync store
//!
//! The authoritative relational store.
//!
//! This crate provides:
//! - The `product` table and its schema migrations
//! - A trigger-maintained change log with a resumable position
//! - Product reads and writes with explicit actor attribution
//! - Per-field upserts inside one transaction for mirror edit batches
//! - OAuth token persistence for the mirror credential provider
//!
//! ## Change log
//!
//! Every insert, update and delete on `product` appends a full row image to
//! `change_log` from inside the same transaction, so the log order is the
//! commit order. `current_position()` reads the head of that log and
//! `changes_since()` replays everything after a position.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod changelog;
mod error;
mod migrations;
mod store;
mod tokens;

pub use changelog::{ChangeRecord, CHANGE_LOG_FILE};
pub use error::{StoreError, StoreResult};
pub use migrations::CURRENT_VERSION;
pub use store::{EditTransaction, NewProduct, Store};
pub use tokens::{OAuthToken, StoredToken};
