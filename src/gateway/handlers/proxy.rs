use axum::{
    body::Bytes,
    extract::Extension,
    http::{
        header::{HeaderName, HOST},
        HeaderMap, Method, Uri,
    },
    response::Response,
};
use std::sync::Arc;

use super::{path_suffix, PROXY_PREFIX, PUBLIC_BACKEND_PREFIX, PUBLIC_PREFIX};
use crate::gateway::{
    proxy::{cors_headers, preflight, ProxyRequest},
    state::GatewayState,
};

const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

fn proxy_request(method: Method, uri: &Uri, prefix: &str, headers: HeaderMap, body: Bytes) -> ProxyRequest {
    ProxyRequest {
        method,
        suffix: path_suffix(uri, prefix).to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    }
}

fn forwarded_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut extra = HeaderMap::new();
    if let Some(host) = inbound.get(HOST) {
        extra.insert(X_FORWARDED_HOST, host.clone());
    }
    extra
}

/// `ANY /api/proxy/*path`; preflights never reach the backend.
pub async fn proxy(
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    state: Extension<Arc<GatewayState>>,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return preflight();
    }

    let extra = forwarded_headers(&headers);
    let request = proxy_request(method, &uri, PROXY_PREFIX, headers, body);

    state.proxy().forward(request, "", &extra).await
}

/// `GET /api/public/*path` → `<backend>/public/<path>`, with CORS headers.
pub async fn public(
    uri: Uri,
    headers: HeaderMap,
    state: Extension<Arc<GatewayState>>,
) -> Response {
    let extra = forwarded_headers(&headers);
    let request = proxy_request(Method::GET, &uri, PUBLIC_PREFIX, headers, Bytes::new());

    let mut response = state
        .proxy()
        .forward(request, PUBLIC_BACKEND_PREFIX, &extra)
        .await;

    response.headers_mut().extend(cors_headers());
    response
}

pub async fn public_preflight() -> Response {
    preflight()
}
