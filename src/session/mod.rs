//! Session credential handling: the cookie-backed store, the authentication
//! guard, and the logout workflow. Token material must never be logged; the
//! `SessionToken` debug output is redacted.

mod guard;
pub mod logout;
mod store;

pub use guard::{is_authenticated, valid_token};
pub use logout::{logout, HttpInvalidator, InvalidationError, LogoutOutcome, SessionInvalidator};
pub use store::{
    cookie_value, CookieSession, SessionCookie, SessionError, SessionStore, SessionToken,
    DEFAULT_SESSION_COOKIE,
};
