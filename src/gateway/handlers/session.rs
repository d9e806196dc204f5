//! Session endpoints: the session status check, logout, and the guard that
//! keeps anonymous browsers away from page routes.

use axum::{
    extract::{Extension, Request, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::{
    gateway::state::GatewayState,
    session::{self, is_authenticated, CookieSession},
};

// Missing or malformed cookies are reported as "no session", never as an error.
pub async fn session_status(
    headers: HeaderMap,
    state: Extension<Arc<GatewayState>>,
) -> impl IntoResponse {
    let session = CookieSession::from_headers(&state.session_cookie(), &headers);
    if is_authenticated(&session) {
        (StatusCode::OK, Json(json!({ "authenticated": true }))).into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

pub async fn logout(headers: HeaderMap, state: Extension<Arc<GatewayState>>) -> impl IntoResponse {
    let mut session = CookieSession::from_headers(&state.session_cookie(), &headers);

    let outcome = session::logout(&mut session, state.invalidator()).await;

    let mut response_headers = HeaderMap::new();
    if let Some(removal) = session.take_removal() {
        response_headers.insert(SET_COOKIE, removal);
    }

    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, response_headers, Json(outcome)).into_response()
}

/// Redirect to the login route unless the request carries a valid session.
pub async fn require_session(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Response {
    let cookie = state.session_cookie();
    let session = CookieSession::from_headers(&cookie, request.headers());
    if is_authenticated(&session) {
        return next.run(request).await;
    }

    debug!(
        "No valid {} cookie for {}, redirecting",
        cookie.name(),
        request.uri().path()
    );
    Redirect::to(state.config().login_path()).into_response()
}
