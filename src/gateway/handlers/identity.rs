use axum::{
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, Uri},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{path_suffix, AUTH_PREFIX};
use crate::gateway::{identity::IdentityRequest, state::GatewayState};

fn identity_request(uri: &Uri, headers: HeaderMap, body: Bytes) -> IdentityRequest {
    IdentityRequest {
        path: path_suffix(uri, AUTH_PREFIX).to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    }
}

pub async fn identity_get(
    uri: Uri,
    headers: HeaderMap,
    state: Extension<Arc<GatewayState>>,
) -> Response {
    state
        .identity()
        .get(identity_request(&uri, headers, Bytes::new()))
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

pub async fn identity_post(
    uri: Uri,
    headers: HeaderMap,
    state: Extension<Arc<GatewayState>>,
    body: Bytes,
) -> Response {
    state
        .identity()
        .post(identity_request(&uri, headers, body))
        .await
        .unwrap_or_else(IntoResponse::into_response)
}
