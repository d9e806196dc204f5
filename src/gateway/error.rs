use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Failures surfaced to the caller. Backend auth verdicts are not errors and
/// never end up here.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("path escapes its upstream scope: {0}")]
    InvalidPath(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnreachable(#[source] reqwest::Error),
    #[error("failed to read upstream response: {0}")]
    UpstreamBody(#[source] reqwest::Error),
}

impl GatewayError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidPath(_) => StatusCode::BAD_REQUEST,
            Self::UpstreamUnreachable(_) | Self::UpstreamBody(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::InvalidPath(_) => {
                warn!("{self}");
                "invalid path"
            }
            Self::UpstreamUnreachable(_) | Self::UpstreamBody(_) => {
                error!("{self}");
                // Transport details stay in the logs.
                "upstream unavailable"
            }
        };

        (self.status(), Json(json!({ "error": message }))).into_response()
    }
}
