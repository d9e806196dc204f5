//! Best-effort synchronization flows that ride along with the session.
//!
//! The theme is continuous (fetch once, then follow an update channel) while the
//! locale is negotiated once per mount. Neither ever blocks request handling,
//! and both fall back to built-in defaults when the backend cannot be reached.

pub mod locale;
pub mod theme;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
}
