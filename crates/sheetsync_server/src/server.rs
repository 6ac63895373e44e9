//! Request routing over the handlers.

use crate::batch::BatchOutcome;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerContext, RequestHandler, Response};
use crate::login::LoginHook;
use sheetsync_engine::AuthNotifier;
use sheetsync_store::Store;
use std::sync::Arc;
use tracing::debug;

/// The sheetsync request surface.
///
/// Owns no listener: an HTTP front end passes method, path and body to
/// [`SyncServer::route`] and writes back the returned [`Response`].
///
/// # Example
///
/// ```
/// use sheetsync_server::{SyncServer, ServerConfig};
/// use sheetsync_store::Store;
/// use std::sync::Arc;
///
/// let store = Arc::new(Store::open_in_memory().unwrap());
/// let server = SyncServer::new(ServerConfig::default(), store, None);
///
/// let response = server.route("POST", "/api/webhook/sheets", b"[]");
/// assert_eq!(response.status, 200);
/// ```
pub struct SyncServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl SyncServer {
    /// Creates a server over `store`, waking the worker through `notifier`
    /// on login.
    pub fn new(config: ServerConfig, store: Arc<Store>, notifier: Option<AuthNotifier>) -> Self {
        let login = LoginHook::new(store.clone(), notifier);
        let context = Arc::new(HandlerContext::new(config, store, login));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Dispatches a request by path.
    pub fn route(&self, method: &str, path: &str, body: &[u8]) -> Response {
        debug!(method, path, bytes = body.len(), "Request");
        let config = &self.context.config;
        if path == config.webhook_path {
            self.handler.handle_webhook(method, body)
        } else if path == config.login_path {
            self.handler.handle_login(method, body)
        } else {
            Response::from_error(&ServerError::NotFound(path.to_string()))
        }
    }

    /// Applies a batch body directly.
    pub fn apply_edits(&self, body: &[u8]) -> ServerResult<BatchOutcome> {
        self.handler.handle_batch(body)
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }
}
