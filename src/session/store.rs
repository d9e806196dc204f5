//! Request-scoped session credential storage backed by a named cookie.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_SESSION_COOKIE: &str = "session";

/// Opaque bearer token identifying the principal to the backend.
#[derive(Clone)]
pub struct SessionToken(SecretString);

impl SessionToken {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to remove session credential: {0}")]
    Storage(String),
}

/// Read/clear access to the authoritative session credential.
pub trait SessionStore {
    fn token(&self) -> Option<SessionToken>;

    /// Remove the credential.
    ///
    /// # Errors
    /// Returns `SessionError::Storage` when the removal cannot be recorded.
    fn clear(&mut self) -> Result<(), SessionError>;
}

/// Look up a cookie by name across every `Cookie` header; malformed pairs are
/// skipped rather than failing the lookup.
#[must_use]
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let Some((key, val)) = pair.trim().split_once('=') else {
                continue;
            };
            if key.trim() == name {
                return Some(val.trim().to_string());
            }
        }
    }
    None
}

/// Name and attributes of the session cookie.
#[derive(Clone, Debug)]
pub struct SessionCookie {
    name: String,
    secure: bool,
}

impl SessionCookie {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secure: false,
        }
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Find the cookie value in every `Cookie` header of the request.
    #[must_use]
    pub fn extract(&self, headers: &HeaderMap) -> Option<String> {
        cookie_value(headers, &self.name)
    }

    /// Build a `Set-Cookie` value that expires the session cookie.
    ///
    /// # Errors
    /// Returns `InvalidHeaderValue` when the cookie name cannot be encoded.
    pub fn expired(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", self.name);
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}

impl Default for SessionCookie {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_COOKIE)
    }
}

/// Session store for a single request; the token is read once from the
/// `Cookie` header and removal is recorded as a pending `Set-Cookie`.
#[derive(Debug)]
pub struct CookieSession {
    cookie: SessionCookie,
    token: Option<SessionToken>,
    removal: Option<HeaderValue>,
}

impl CookieSession {
    #[must_use]
    pub fn from_headers(cookie: &SessionCookie, headers: &HeaderMap) -> Self {
        let token = cookie
            .extract(headers)
            .filter(|value| !value.is_empty())
            .map(SessionToken::new);
        Self {
            cookie: cookie.clone(),
            token,
            removal: None,
        }
    }

    /// The `Set-Cookie` value recorded by `clear`, if any.
    pub fn take_removal(&mut self) -> Option<HeaderValue> {
        self.removal.take()
    }
}

impl SessionStore for CookieSession {
    fn token(&self) -> Option<SessionToken> {
        self.token.clone()
    }

    fn clear(&mut self) -> Result<(), SessionError> {
        let removal = self
            .cookie
            .expired()
            .map_err(|err| SessionError::Storage(err.to_string()))?;
        self.token = None;
        self.removal = Some(removal);
        Ok(())
    }
}
