//! Session termination: best-effort remote invalidation, then unconditional
//! local credential removal.
//!
//! Flow Overview: read the credential; when present, ask the backend once to
//! invalidate it and record any failure as a warning; always clear the local
//! credential; report failure only when that local removal fails.

use reqwest::{header::AUTHORIZATION, Client, StatusCode};
use serde::Serialize;
use std::{future::Future, pin::Pin};
use thiserror::Error;
use tracing::{debug, error, instrument, warn};
use url::Url;

use super::store::{SessionStore, SessionToken};
use crate::gateway::upstream::endpoint_url;

pub const LOGOUT_PATH: &str = "/auth/logout";

#[derive(Debug, Error)]
pub enum InvalidationError {
    #[error("logout request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("logout rejected with status {0}")]
    Status(StatusCode),
}

/// Remote half of the logout workflow.
pub trait SessionInvalidator: Send + Sync {
    fn invalidate<'a>(
        &'a self,
        token: &'a SessionToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), InvalidationError>> + Send + 'a>>;
}

/// Calls `POST <backend>/auth/logout` with the bearer credential attached.
#[derive(Clone, Debug)]
pub struct HttpInvalidator {
    client: Client,
    logout_url: String,
}

impl HttpInvalidator {
    #[must_use]
    pub fn new(client: Client, backend_url: &Url) -> Self {
        Self {
            client,
            logout_url: endpoint_url(backend_url, LOGOUT_PATH),
        }
    }

    #[instrument(skip(self, token), fields(url = %self.logout_url))]
    async fn post_logout(&self, token: &SessionToken) -> Result<(), InvalidationError> {
        let response = self
            .client
            .post(&self.logout_url)
            .header(AUTHORIZATION, format!("Bearer {}", token.expose()))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("Remote session invalidated");
            Ok(())
        } else {
            Err(InvalidationError::Status(status))
        }
    }
}

impl SessionInvalidator for HttpInvalidator {
    fn invalidate<'a>(
        &'a self,
        token: &'a SessionToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), InvalidationError>> + Send + 'a>> {
        Box::pin(self.post_logout(token))
    }
}

/// Result of a logout; `warning` carries the advisory remote failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LogoutOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Terminate the session held by `store`.
pub async fn logout<S, I>(store: &mut S, invalidator: &I) -> LogoutOutcome
where
    S: SessionStore + ?Sized,
    I: SessionInvalidator + ?Sized,
{
    let mut outcome = LogoutOutcome::default();

    // Logging out an anonymous session skips the remote call entirely.
    if let Some(token) = store.token() {
        if let Err(err) = invalidator.invalidate(&token).await {
            warn!("Remote session invalidation failed: {err}");
            outcome.warning = Some(err.to_string());
        }
    } else {
        debug!("No session credential, skipping remote invalidation");
    }

    match store.clear() {
        Ok(()) => outcome.success = true,
        Err(err) => {
            error!("{err}");
            outcome.error = Some(err.to_string());
        }
    }

    outcome
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::session::store::SessionError;
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[derive(Default)]
    struct MemoryStore {
        token: Option<SessionToken>,
        fail_clear: bool,
    }

    impl MemoryStore {
        fn with_token(token: &str) -> Self {
            Self {
                token: Some(SessionToken::new(token)),
                fail_clear: false,
            }
        }
    }

    impl SessionStore for MemoryStore {
        fn token(&self) -> Option<SessionToken> {
            self.token.clone()
        }

        fn clear(&mut self) -> Result<(), SessionError> {
            if self.fail_clear {
                return Err(SessionError::Storage("storage unavailable".to_string()));
            }
            self.token = None;
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingInvalidator {
        calls: AtomicUsize,
        fail: bool,
    }

    impl SessionInvalidator for CountingInvalidator {
        fn invalidate<'a>(
            &'a self,
            _token: &'a SessionToken,
        ) -> Pin<Box<dyn Future<Output = Result<(), InvalidationError>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if self.fail {
                    Err(InvalidationError::Status(StatusCode::BAD_GATEWAY))
                } else {
                    Ok(())
                }
            })
        }
    }

    #[tokio::test]
    async fn anonymous_logout_succeeds_without_remote_call() {
        let mut store = MemoryStore::default();
        let invalidator = CountingInvalidator::default();

        let outcome = logout(&mut store, &invalidator).await;

        assert_eq!(
            outcome,
            LogoutOutcome {
                success: true,
                error: None,
                warning: None
            }
        );
        assert_eq!(invalidator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remote_failure_still_clears_local_credential() {
        let mut store = MemoryStore::with_token("abc");
        let invalidator = CountingInvalidator {
            fail: true,
            ..CountingInvalidator::default()
        };

        let outcome = logout(&mut store, &invalidator).await;

        assert!(outcome.success);
        assert!(outcome.warning.is_some());
        assert!(store.token().is_none());
        assert_eq!(invalidator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn local_removal_failure_is_reported() {
        let mut store = MemoryStore {
            token: Some(SessionToken::new("abc")),
            fail_clear: true,
        };
        let invalidator = CountingInvalidator::default();

        let outcome = logout(&mut store, &invalidator).await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("storage unavailable"));
        assert_eq!(invalidator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn http_invalidator_posts_bearer_credential() -> anyhow::Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .and(header("authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let invalidator = HttpInvalidator::new(Client::new(), &Url::parse(&server.uri())?);
        let mut store = MemoryStore::with_token("abc");

        let outcome = logout(&mut store, &invalidator).await;

        assert!(outcome.success);
        assert!(outcome.warning.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_warning() -> anyhow::Result<()> {
        // Nothing listens on this port once the listener is dropped.
        let port = match TcpListener::bind("127.0.0.1:0") {
            Ok(listener) => listener.local_addr()?.port(),
            Err(_) => return Ok(()),
        };
        let backend = Url::parse(&format!("http://127.0.0.1:{port}"))?;
        let invalidator = HttpInvalidator::new(Client::new(), &backend);
        let mut store = MemoryStore::with_token("abc");

        let outcome = logout(&mut store, &invalidator).await;

        assert!(outcome.success);
        assert!(outcome.warning.unwrap().contains("logout request failed"));
        assert!(store.token().is_none());
        Ok(())
    }
}
