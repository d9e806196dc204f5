use once_cell::sync::Lazy;
use regex::Regex;

use super::store::SessionStore;

const MAX_TOKEN_LEN: usize = 4096;

static TOKEN_CHARSET: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._~+/=-]+$").ok());

/// Syntactic check only; signature and expiry belong to the backend.
#[must_use]
pub fn valid_token(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_TOKEN_LEN
        && TOKEN_CHARSET
            .as_ref()
            .is_some_and(|charset| charset.is_match(token))
}

/// Whether the store holds a syntactically valid session token.
///
/// Absent and malformed credentials are not errors; they simply mean the
/// request is anonymous.
#[must_use]
pub fn is_authenticated<S: SessionStore + ?Sized>(store: &S) -> bool {
    store
        .token()
        .is_some_and(|token| valid_token(token.expose()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::session::store::{CookieSession, SessionCookie};
    use axum::http::{header::COOKIE, HeaderMap, HeaderValue};

    fn session(cookie_header: Option<&str>) -> CookieSession {
        let mut headers = HeaderMap::new();
        if let Some(value) = cookie_header {
            headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        }
        CookieSession::from_headers(&SessionCookie::default(), &headers)
    }

    #[test]
    fn valid_token_accepts_jwt_shaped_values() {
        assert!(valid_token("eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiIxIn0.c2ln"));
        assert!(valid_token("01HZX3Q5V9A7M2N4P6R8T0W2Y4"));
        assert!(valid_token("abc+/="));
    }

    #[test]
    fn valid_token_rejects_malformed_values() {
        assert!(!valid_token(""));
        assert!(!valid_token("has space"));
        assert!(!valid_token("quote\"d"));
        assert!(!valid_token("comma,separated"));
        assert!(!valid_token(&"a".repeat(MAX_TOKEN_LEN + 1)));
    }

    #[test]
    fn absent_credential_is_anonymous() {
        assert!(!is_authenticated(&session(None)));
        assert!(!is_authenticated(&session(Some("other=1"))));
        assert!(!is_authenticated(&session(Some("session="))));
    }

    #[test]
    fn malformed_credential_is_anonymous() {
        assert!(!is_authenticated(&session(Some("session=a{b}c"))));
        assert!(!is_authenticated(&session(Some("session=\"quoted\""))));
    }

    #[test]
    fn valid_credential_is_authenticated() {
        assert!(is_authenticated(&session(Some("session=abc.def-ghi_jkl"))));
    }
}
