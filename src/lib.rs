//! # Portico (session-aware request gateway)
//!
//! `portico` sits between the browser and the backend API of the admin and
//! storefront application. It owns no business logic; everything it forwards is
//! an opaque payload.
//!
//! ## Sessions
//!
//! The session is a single `HttpOnly` cookie holding an opaque bearer token. The
//! guard only checks that a syntactically valid token is present; signature and
//! expiry are the backend's call. When the backend answers `401` or `403` the
//! gateway redirects the browser to the login route instead of relaying the body.
//!
//! ## Synchronization
//!
//! Two best-effort flows ride along with the session: the display theme (fetched
//! once, then kept current from an update channel) and the display language
//! (negotiated once per mount from a stored preference or geolocation). Neither
//! gates request handling, and both fall back to built-in defaults when the
//! backend is unavailable.

pub mod cli;
pub mod gateway;
pub mod session;
pub mod sync;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
