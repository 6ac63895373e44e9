//! Login completion hook.

use crate::error::{ServerError, ServerResult};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sheetsync_engine::AuthNotifier;
use sheetsync_store::{OAuthToken, Store};
use std::sync::Arc;
use tracing::info;

/// Token hand-off sent once the external OAuth exchange has finished.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginCompletion {
    /// Account the token belongs to.
    pub user_email: String,
    /// Bearer token.
    pub access_token: String,
    /// Refresh token, empty if none was issued.
    #[serde(default)]
    pub refresh_token: String,
    /// Token type.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Expiry instant.
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl LoginCompletion {
    /// Splits into the account email and the token to store.
    pub fn into_parts(self) -> (String, OAuthToken) {
        (
            self.user_email,
            OAuthToken {
                access_token: self.access_token,
                refresh_token: self.refresh_token,
                token_type: self.token_type,
                expiry: self.expiry,
            },
        )
    }
}

/// Stores tokens and wakes the worker.
pub struct LoginHook {
    store: Arc<Store>,
    notifier: Option<AuthNotifier>,
}

impl LoginHook {
    /// Creates a hook. Without a notifier tokens are stored but nobody is
    /// told about them.
    pub fn new(store: Arc<Store>, notifier: Option<AuthNotifier>) -> Self {
        Self { store, notifier }
    }

    /// Persists the token and fires the hot-reload notification.
    ///
    /// Returns whether a notification was delivered.
    pub fn complete(&self, user_email: &str, token: &OAuthToken) -> ServerResult<bool> {
        if user_email.is_empty() {
            return Err(ServerError::InvalidRequest("user_email is required".into()));
        }
        if token.access_token.is_empty() {
            return Err(ServerError::InvalidRequest("access_token is required".into()));
        }

        self.store.upsert_token(user_email, token)?;
        info!(user = %user_email, "Token stored");

        Ok(self.notifier.as_ref().map(AuthNotifier::notify).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetsync_engine::auth_channel;

    fn token(access: &str, refresh: &str) -> OAuthToken {
        OAuthToken {
            access_token: access.into(),
            refresh_token: refresh.into(),
            token_type: "Bearer".into(),
            expiry: None,
        }
    }

    #[test]
    fn stores_token_and_notifies() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let (notifier, mut signal) = auth_channel();
        let hook = LoginHook::new(store.clone(), Some(notifier));

        assert!(hook.complete("ana@example.com", &token("at-1", "rt-1")).unwrap());
        assert!(signal.try_recv());

        // second notification while the first is pending is coalesced
        assert!(hook.complete("ana@example.com", &token("at-2", "")).unwrap());
        assert!(!hook.complete("ana@example.com", &token("at-3", "")).unwrap());

        let stored = store.latest_token().unwrap().unwrap();
        assert_eq!(stored.user_email, "ana@example.com");
        assert_eq!(stored.token.access_token, "at-3");
        assert_eq!(stored.token.refresh_token, "rt-1");
    }

    #[test]
    fn rejects_incomplete_tokens() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let hook = LoginHook::new(store.clone(), None);
        assert!(hook.complete("", &token("at", "")).is_err());
        assert!(hook.complete("ana@example.com", &token("", "")).is_err());
        assert!(store.latest_token().unwrap().is_none());
    }

    #[test]
    fn completion_payload_defaults() {
        let payload: LoginCompletion =
            serde_json::from_str(r#"{"user_email":"ana@example.com","access_token":"at"}"#).unwrap();
        let (email, token) = payload.into_parts();
        assert_eq!(email, "ana@example.com");
        assert_eq!(token.token_type, "Bearer");
        assert!(token.refresh_token.is_empty());
        assert!(token.expiry.is_none());
    }
}
