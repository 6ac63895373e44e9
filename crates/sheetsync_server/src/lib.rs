//! # sheetsync server
//!
//! Request handlers for the sheetsync HTTP surface.
//!
//! This crate provides:
//! - The reverse batch webhook: shape-tolerant decoding, field whitelist,
//!   one transaction per batch with per-edit failure tolerance
//! - The login-completion hook that stores a token and wakes the worker
//! - Path routing independent of any HTTP framework
//!
//! # Responses
//!
//! | Case | Status | Body |
//! |---|---|---|
//! | Method other than POST | 405 | error text |
//! | Undecodable JSON or oversized batch | 400 | error text |
//! | Empty batch | 200 | empty |
//! | Transaction begin or commit failed | 500 | error text |
//! | Otherwise | 200 | `Processed N updates` |

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod batch;
mod config;
mod error;
mod handler;
mod login;
mod server;

pub use batch::{apply_batch, BatchOutcome};
pub use config::{ServerConfig, DEFAULT_MAX_BATCH_EDITS};
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler, Response};
pub use login::{LoginCompletion, LoginHook};
pub use server::SyncServer;
