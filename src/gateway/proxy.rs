//! Backend API proxy.
//!
//! Flow Overview: read the session credential once, rewrite the inbound path
//! onto the backend base URL, re-issue the request with the same method and
//! body, then inspect the backend status. `401` and `403` turn into a redirect
//! to the login route and the backend body is dropped; anything else is relayed
//! unchanged. Transport failures become a `502` and are never retried, since
//! the inbound method may not be idempotent. A suffix that would resolve
//! outside the backend scope is answered with `400` and never sent.

use axum::{
    body::{Body, Bytes},
    http::{
        header::{
            HeaderName, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, CACHE_CONTROL, CONNECTION, CONTENT_LENGTH,
            CONTENT_TYPE, HOST, PRAGMA, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, SET_COOKIE, TE,
            TRAILER, TRANSFER_ENCODING, UPGRADE,
        },
        HeaderMap, HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Redirect, Response},
};
use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{error::GatewayError, upstream::scoped_url};
use crate::session::{CookieSession, SessionCookie, SessionStore, SessionToken};

/// Outbound headers that `extra_headers` may not overwrite once set.
const PROTECTED_HEADERS: [HeaderName; 2] = [CONTENT_TYPE, AUTHORIZATION];

/// Backend verdict on a proxied call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProxyVerdict {
    Relay,
    Rejected,
}

impl ProxyVerdict {
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Self::Rejected
        } else {
            Self::Relay
        }
    }
}

/// An inbound request to be re-issued against the backend.
#[derive(Debug)]
pub struct ProxyRequest {
    pub method: Method,
    /// Inbound path with the gateway prefix already removed.
    pub suffix: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone, Debug)]
pub struct Proxy {
    client: Client,
    backend: Url,
    login_path: String,
    session_cookie: SessionCookie,
    clear_on_reject: bool,
}

impl Proxy {
    #[must_use]
    pub fn new(client: Client, backend: Url, login_path: String) -> Self {
        Self {
            client,
            backend,
            login_path,
            session_cookie: SessionCookie::default(),
            clear_on_reject: true,
        }
    }

    #[must_use]
    pub fn with_session_cookie(mut self, cookie: SessionCookie) -> Self {
        self.session_cookie = cookie;
        self
    }

    #[must_use]
    pub fn with_clear_on_reject(mut self, clear: bool) -> Self {
        self.clear_on_reject = clear;
        self
    }

    /// # Errors
    /// `GatewayError::InvalidPath` if `suffix` would resolve outside
    /// `<backend><backend_path_override>`.
    pub fn target_url(
        &self,
        backend_path_override: &str,
        suffix: &str,
        query: Option<&str>,
    ) -> Result<Url, GatewayError> {
        scoped_url(&self.backend, backend_path_override, suffix, query)
    }

    /// Forward `request` to `<backend><backend_path_override>/<suffix>`.
    #[instrument(skip_all, fields(method = %request.method, suffix = %request.suffix))]
    pub async fn forward(
        &self,
        request: ProxyRequest,
        backend_path_override: &str,
        extra_headers: &HeaderMap,
    ) -> Response {
        let mut session = CookieSession::from_headers(&self.session_cookie, &request.headers);
        let token = session.token();

        let url = match self.target_url(
            backend_path_override,
            &request.suffix,
            request.query.as_deref(),
        ) {
            Ok(url) => url,
            Err(err) => return err.into_response(),
        };
        let headers = outbound_headers(&request.headers, token.as_ref(), extra_headers);

        debug!("Forwarding to {url}");

        let response = match self
            .client
            .request(request.method, url)
            .headers(headers)
            .body(request.body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return GatewayError::UpstreamUnreachable(err).into_response(),
        };

        match ProxyVerdict::from_status(response.status()) {
            ProxyVerdict::Rejected => self.redirect_to_login(&mut session, response.status()),
            ProxyVerdict::Relay => relay(response)
                .await
                .unwrap_or_else(IntoResponse::into_response),
        }
    }

    fn redirect_to_login(&self, session: &mut CookieSession, status: StatusCode) -> Response {
        debug!("Backend rejected the session ({status}), redirecting to {}", self.login_path);

        let mut response = Redirect::to(&self.login_path).into_response();

        if self.clear_on_reject {
            match session.clear() {
                Ok(()) => {
                    if let Some(removal) = session.take_removal() {
                        response.headers_mut().append(SET_COOKIE, removal);
                    }
                }
                Err(err) => warn!("Failed to expire rejected session: {err}"),
            }
        }

        response
    }
}

/// Static permissive CORS header set for the public read endpoint.
#[must_use]
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers
}

/// Answer a preflight locally: no backend call, no session check.
#[must_use]
pub fn preflight() -> Response {
    (StatusCode::NO_CONTENT, cors_headers()).into_response()
}

pub(crate) fn is_hop_by_hop(name: &HeaderName) -> bool {
    name == CONNECTION
        || name == PROXY_AUTHENTICATE
        || name == PROXY_AUTHORIZATION
        || name == TE
        || name == TRAILER
        || name == TRANSFER_ENCODING
        || name == UPGRADE
        || name.as_str() == "keep-alive"
}

/// Copy inbound headers that are safe to forward upstream.
pub(crate) fn forwardable_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in inbound {
        if is_hop_by_hop(name) || name == HOST || name == CONTENT_LENGTH {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

fn outbound_headers(
    inbound: &HeaderMap,
    token: Option<&SessionToken>,
    extra_headers: &HeaderMap,
) -> HeaderMap {
    let mut headers = forwardable_headers(inbound);

    if let Some(token) = token {
        match HeaderValue::from_str(&format!("Bearer {}", token.expose())) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => debug!("Session token is not a valid header value, not attaching"),
        }
    }

    for name in extra_headers.keys() {
        if PROTECTED_HEADERS.contains(name) && headers.contains_key(name) {
            continue;
        }
        headers.remove(name);
        for value in extra_headers.get_all(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    // Every call must reach the backend.
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

    headers
}

/// Relay status, headers and body of an upstream response unchanged.
pub(crate) async fn relay(response: reqwest::Response) -> Result<Response, GatewayError> {
    let status = response.status();
    let mut headers = HeaderMap::new();
    for (name, value) in response.headers() {
        if !is_hop_by_hop(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    let body = response.bytes().await.map_err(GatewayError::UpstreamBody)?;

    let mut relayed = Response::new(Body::from(body));
    *relayed.status_mut() = status;
    *relayed.headers_mut() = headers;
    Ok(relayed)
}
