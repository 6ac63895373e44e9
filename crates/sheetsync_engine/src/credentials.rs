//! Credential provider and the hot-reload notification channel.

use crate::error::{EngineError, EngineResult};
use crate::http::{HttpClient, SheetTarget, SheetsMirror};
use crate::memory::MemoryMirror;
use crate::mirror::MirrorClient;
use sheetsync_store::Store;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Hands out mirror clients built from the current credential.
///
/// The engine only observes whether a usable credential exists; token
/// exchange and refresh live behind this trait.
pub trait CredentialProvider: Send + Sync {
    /// Builds a mirror client, or fails if no usable credential exists.
    fn acquire(&self) -> EngineResult<Box<dyn MirrorClient>>;
}

impl<P: CredentialProvider + ?Sized> CredentialProvider for Arc<P> {
    fn acquire(&self) -> EngineResult<Box<dyn MirrorClient>> {
        (**self).acquire()
    }
}

/// Creates the single-slot hot-reload channel.
pub fn auth_channel() -> (AuthNotifier, AuthSignal) {
    let (tx, rx) = mpsc::channel(1);
    (AuthNotifier { tx }, AuthSignal { rx })
}

/// Producer side of the hot-reload channel.
///
/// Never blocks: a notification sent while another is pending is dropped.
#[derive(Debug, Clone)]
pub struct AuthNotifier {
    tx: mpsc::Sender<()>,
}

impl AuthNotifier {
    /// Signals that authentication just completed.
    ///
    /// Returns false if a notification was already pending or the worker is
    /// gone.
    pub fn notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(())) => {
                debug!("Auth notification already pending");
                false
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                warn!("Auth notification dropped, worker is not running");
                false
            }
        }
    }
}

/// Consumer side of the hot-reload channel. Owned by the worker.
#[derive(Debug)]
pub struct AuthSignal {
    rx: mpsc::Receiver<()>,
}

impl AuthSignal {
    /// Waits for the next notification. `None` once every notifier is gone.
    pub async fn recv(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    /// Takes a pending notification without waiting.
    pub fn try_recv(&mut self) -> bool {
        self.rx.try_recv().is_ok()
    }
}

/// Builds Sheets mirror clients from the most recently stored OAuth token.
pub struct StoredTokenProvider<C: HttpClient> {
    store: Arc<Store>,
    target: SheetTarget,
    client: Arc<C>,
}

impl<C: HttpClient> StoredTokenProvider<C> {
    /// Creates a provider for `target`.
    pub fn new(store: Arc<Store>, target: SheetTarget, client: Arc<C>) -> Self {
        Self {
            store,
            target,
            client,
        }
    }
}

impl<C: HttpClient + 'static> CredentialProvider for StoredTokenProvider<C> {
    fn acquire(&self) -> EngineResult<Box<dyn MirrorClient>> {
        if self.target.spreadsheet_id.is_empty() {
            return Err(EngineError::Protocol("spreadsheet id is not configured".into()));
        }
        let stored = self
            .store
            .latest_token()?
            .ok_or_else(|| EngineError::Unauthenticated("no token stored, log in first".into()))?;

        if stored.token.is_expired_at(chrono::Utc::now()) && stored.token.refresh_token.is_empty() {
            return Err(EngineError::Unauthenticated(format!(
                "token for {} expired and cannot be refreshed",
                stored.user_email
            )));
        }

        debug!(user = %stored.user_email, "Building Sheets mirror client");
        Ok(Box::new(SheetsMirror::new(
            self.target.clone(),
            stored.token.access_token,
            self.client.clone(),
        )))
    }
}

/// A provider handing out clones of one [`MemoryMirror`].
///
/// Starts unauthenticated unless built with [`MemoryCredentials::authorized`].
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    mirror: MemoryMirror,
    authorized: AtomicBool,
    attempts: AtomicU32,
}

impl MemoryCredentials {
    /// Creates an unauthenticated provider for `mirror`.
    pub fn new(mirror: MemoryMirror) -> Self {
        Self {
            mirror,
            authorized: AtomicBool::new(false),
            attempts: AtomicU32::new(0),
        }
    }

    /// Creates an authenticated provider for `mirror`.
    pub fn authorized(mirror: MemoryMirror) -> Self {
        let provider = Self::new(mirror);
        provider.authorize();
        provider
    }

    /// Makes subsequent acquisitions succeed.
    pub fn authorize(&self) {
        self.authorized.store(true, Ordering::SeqCst);
    }

    /// Makes subsequent acquisitions fail.
    pub fn revoke(&self) {
        self.authorized.store(false, Ordering::SeqCst);
    }

    /// Number of acquisition attempts so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// The mirror handed out.
    pub fn mirror(&self) -> &MemoryMirror {
        &self.mirror
    }
}

impl CredentialProvider for MemoryCredentials {
    fn acquire(&self) -> EngineResult<Box<dyn MirrorClient>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.authorized.load(Ordering::SeqCst) {
            return Err(EngineError::Unauthenticated("no credential".into()));
        }
        Ok(Box::new(self.mirror.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpRequest, HttpResponse};
    use chrono::{Duration, Utc};
    use sheetsync_store::OAuthToken;

    struct NullClient;

    impl HttpClient for NullClient {
        fn send(&self, _request: HttpRequest) -> Result<HttpResponse, String> {
            Ok(HttpResponse {
                status: 200,
                body: b"{}".to_vec(),
            })
        }
    }

    fn provider(store: Arc<Store>) -> StoredTokenProvider<NullClient> {
        StoredTokenProvider::new(store, SheetTarget::new("sheet-1", "Sheet1"), Arc::new(NullClient))
    }

    #[test]
    fn notifier_is_single_slot() {
        let (notifier, mut signal) = auth_channel();
        assert!(notifier.notify());
        assert!(!notifier.notify());
        assert!(signal.try_recv());
        assert!(!signal.try_recv());
        assert!(notifier.notify());
    }

    #[test]
    fn notifier_without_worker() {
        let (notifier, signal) = auth_channel();
        drop(signal);
        assert!(!notifier.notify());
    }

    #[test]
    fn memory_credentials_toggle() {
        let creds = MemoryCredentials::new(MemoryMirror::new());
        assert!(matches!(creds.acquire(), Err(EngineError::Unauthenticated(_))));
        creds.authorize();
        assert!(creds.acquire().is_ok());
        creds.revoke();
        assert!(creds.acquire().is_err());
        assert_eq!(creds.attempts(), 3);
    }

    #[test]
    fn stored_token_provider_needs_a_token() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let provider = provider(store.clone());
        assert!(matches!(provider.acquire(), Err(EngineError::Unauthenticated(_))));

        store
            .upsert_token(
                "ana@example.com",
                &OAuthToken {
                    access_token: "a".into(),
                    refresh_token: "r".into(),
                    token_type: "Bearer".into(),
                    expiry: None,
                },
            )
            .unwrap();
        assert!(provider.acquire().is_ok());
    }

    #[test]
    fn expired_token_without_refresh_is_unusable() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        store
            .upsert_token(
                "ana@example.com",
                &OAuthToken {
                    access_token: "a".into(),
                    refresh_token: String::new(),
                    token_type: "Bearer".into(),
                    expiry: Some(Utc::now() - Duration::hours(2)),
                },
            )
            .unwrap();
        assert!(matches!(provider(store).acquire(), Err(EngineError::Unauthenticated(_))));
    }

    #[test]
    fn missing_spreadsheet_id() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let provider =
            StoredTokenProvider::new(store, SheetTarget::new("", "Sheet1"), Arc::new(NullClient));
        assert!(matches!(provider.acquire(), Err(EngineError::Protocol(_))));
    }
}
