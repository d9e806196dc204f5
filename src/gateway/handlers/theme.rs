use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use secrecy::ExposeSecret;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use super::extract_bearer_token;
use crate::{gateway::state::GatewayState, sync::theme::ThemeConfig};

pub async fn theme(state: Extension<Arc<GatewayState>>) -> impl IntoResponse {
    Json(state.theme().snapshot().await)
}

/// Backend push endpoint; disabled unless an update token is configured.
pub async fn theme_update(
    headers: HeaderMap,
    state: Extension<Arc<GatewayState>>,
    payload: Result<Json<ThemeConfig>, JsonRejection>,
) -> Response {
    let Some(expected) = state.config().theme_update_token() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match extract_bearer_token(&headers) {
        Some(token) if token == expected.expose_secret() => {}
        _ => {
            warn!("Rejected theme update with missing or wrong token");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let Json(config) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection.into_response(),
    };

    let receivers = state.theme_updates().publish(config);
    debug!("Theme update delivered to {receivers} subscribers");

    (StatusCode::ACCEPTED, Json(json!({ "receivers": receivers }))).into_response()
}
