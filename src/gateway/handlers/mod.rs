pub mod health;
pub use self::health::health;

pub mod identity;
pub use self::identity::{identity_get, identity_post};

pub mod locale;
pub use self::locale::locale;

pub mod proxy;
pub use self::proxy::{proxy, public, public_preflight};

pub mod session;
pub use self::session::{logout, require_session, session_status};

pub mod theme;
pub use self::theme::{theme, theme_update};

// common functions for the handlers
use axum::http::{header::AUTHORIZATION, HeaderMap, Uri};

pub const PROXY_PREFIX: &str = "/api/proxy";
pub const PUBLIC_PREFIX: &str = "/api/public";
pub const AUTH_PREFIX: &str = "/api/auth";

/// Backend path the public prefix is rewritten onto.
pub const PUBLIC_BACKEND_PREFIX: &str = "/public";

/// Path of `uri` after the gateway `prefix`, or the whole path when it does
/// not carry the prefix.
pub(crate) fn path_suffix<'a>(uri: &'a Uri, prefix: &str) -> &'a str {
    let path = uri.path();
    path.strip_prefix(prefix).unwrap_or(path)
}

pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
