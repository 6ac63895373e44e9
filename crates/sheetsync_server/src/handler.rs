//! Request handlers for the webhook and login endpoints.

use crate::batch::{apply_batch, BatchOutcome};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::login::{LoginCompletion, LoginHook};
use sheetsync_protocol::decode_batch;
use sheetsync_store::Store;
use std::sync::Arc;
use tracing::{error, warn};

/// A transport-neutral HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code.
    pub status: u16,
    /// Plain text body.
    pub body: String,
}

impl Response {
    /// 200 with a body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// 200 with an empty body.
    pub fn empty() -> Self {
        Self::ok(String::new())
    }

    /// Maps an error to its status code.
    pub fn from_error(err: &ServerError) -> Self {
        Self {
            status: err.status_code(),
            body: err.to_string(),
        }
    }
}

/// Context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Authoritative store.
    pub store: Arc<Store>,
    login: LoginHook,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, store: Arc<Store>, login: LoginHook) -> Self {
        Self {
            config,
            store,
            login,
        }
    }
}

/// Handler for webhook and login requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Decodes and applies a batch body.
    pub fn handle_batch(&self, body: &[u8]) -> ServerResult<BatchOutcome> {
        let edits = decode_batch(body).map_err(|e| {
            warn!(error = %e, "Webhook decode error");
            ServerError::InvalidRequest("Invalid JSON format".into())
        })?;

        let limit = self.context.config.max_batch_edits;
        if edits.len() > limit {
            return Err(ServerError::BatchTooLarge {
                size: edits.len(),
                limit,
            });
        }
        if edits.is_empty() {
            return Ok(BatchOutcome::default());
        }

        apply_batch(&self.context.store, &edits)
    }

    /// Handles a call to the reverse batch webhook.
    pub fn handle_webhook(&self, method: &str, body: &[u8]) -> Response {
        if !method.eq_ignore_ascii_case("POST") {
            return Response::from_error(&ServerError::MethodNotAllowed(method.to_string()));
        }

        match self.handle_batch(body) {
            Ok(outcome) if outcome.received == 0 => Response::empty(),
            Ok(outcome) => Response::ok(outcome.message()),
            Err(e) => {
                if e.is_server_error() {
                    error!(error = %e, "Transaction failed");
                }
                Response::from_error(&e)
            }
        }
    }

    /// Handles a login-completion callback carrying an exchanged token.
    pub fn handle_login(&self, method: &str, body: &[u8]) -> Response {
        if !method.eq_ignore_ascii_case("POST") {
            return Response::from_error(&ServerError::MethodNotAllowed(method.to_string()));
        }

        let completion: LoginCompletion = match serde_json::from_slice(body) {
            Ok(completion) => completion,
            Err(e) => {
                return Response::from_error(&ServerError::InvalidRequest(e.to_string()));
            }
        };
        let (email, token) = completion.into_parts();
        match self.context.login.complete(&email, &token) {
            Ok(_) => Response::ok("Login successful. Sync starting."),
            Err(e) => Response::from_error(&e),
        }
    }
}
