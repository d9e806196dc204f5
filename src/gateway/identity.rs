//! Delegation seam for the identity-protocol handshake. The gateway owns no
//! protocol logic: status, headers (`Set-Cookie`, `Location`) and body from the
//! identity service reach the browser untouched.

use axum::{
    body::Bytes,
    http::{HeaderMap, Method},
    response::Response,
};
use reqwest::Client;
use std::{future::Future, pin::Pin};
use tracing::instrument;
use url::Url;

use super::{
    error::GatewayError,
    proxy::{forwardable_headers, relay},
    upstream::scoped_url,
};

pub type IdentityResult = Result<Response, GatewayError>;

/// A handshake request, with the gateway's auth prefix removed from the path.
#[derive(Debug)]
pub struct IdentityRequest {
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub trait IdentityProvider: Send + Sync {
    /// Challenge and callback retrieval.
    fn get<'a>(
        &'a self,
        request: IdentityRequest,
    ) -> Pin<Box<dyn Future<Output = IdentityResult> + Send + 'a>>;

    /// Credential submission.
    fn post<'a>(
        &'a self,
        request: IdentityRequest,
    ) -> Pin<Box<dyn Future<Output = IdentityResult> + Send + 'a>>;
}

/// Forwards the handshake to an external identity service over HTTP.
#[derive(Clone, Debug)]
pub struct RemoteIdentityProvider {
    client: Client,
    base: Url,
}

impl RemoteIdentityProvider {
    #[must_use]
    pub fn new(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    #[instrument(skip(self, request), fields(path = %request.path))]
    async fn delegate(&self, method: Method, request: IdentityRequest) -> IdentityResult {
        let url = scoped_url(&self.base, "", &request.path, request.query.as_deref())?;

        let response = self
            .client
            .request(method, url)
            .headers(forwardable_headers(&request.headers))
            .body(request.body)
            .send()
            .await
            .map_err(GatewayError::UpstreamUnreachable)?;

        relay(response).await
    }
}

impl IdentityProvider for RemoteIdentityProvider {
    fn get<'a>(
        &'a self,
        request: IdentityRequest,
    ) -> Pin<Box<dyn Future<Output = IdentityResult> + Send + 'a>> {
        Box::pin(self.delegate(Method::GET, request))
    }

    fn post<'a>(
        &'a self,
        request: IdentityRequest,
    ) -> Pin<Box<dyn Future<Output = IdentityResult> + Send + 'a>> {
        Box::pin(self.delegate(Method::POST, request))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::{
        header::{LOCATION, SET_COOKIE},
        StatusCode,
    };
    use std::net::TcpListener;
    use wiremock::matchers::{body_string, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn request(path: &str, query: Option<&str>, body: &'static str) -> IdentityRequest {
        IdentityRequest {
            path: path.to_string(),
            query: query.map(ToString::to_string),
            headers: HeaderMap::new(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[tokio::test]
    async fn callback_redirect_and_cookie_are_propagated() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/callback/google"))
            .and(query_param("code", "xyz"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", "/dashboard")
                    .insert_header("set-cookie", "session=new-token; Path=/; HttpOnly"),
            )
            .mount(&server)
            .await;

        let provider = RemoteIdentityProvider::new(
            crate::gateway::upstream::http_client().unwrap(),
            Url::parse(&server.uri()).unwrap(),
        );
        let response = provider
            .get(request("/callback/google", Some("code=xyz"), ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/dashboard");
        assert!(response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("session=new-token"));
    }

    #[tokio::test]
    async fn error_status_and_body_are_not_normalized() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/callback/credentials"))
            .and(body_string("username=a&password=b"))
            .respond_with(ResponseTemplate::new(401).set_body_string("CredentialsSignin"))
            .expect(1)
            .mount(&server)
            .await;

        let provider =
            RemoteIdentityProvider::new(Client::new(), Url::parse(&server.uri()).unwrap());
        let response = provider
            .post(request("callback/credentials", None, "username=a&password=b"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body.as_ref(), b"CredentialsSignin");
    }

    #[tokio::test]
    async fn unreachable_identity_service_is_an_error() {
        let port = match TcpListener::bind("127.0.0.1:0") {
            Ok(listener) => listener.local_addr().unwrap().port(),
            Err(_) => return,
        };
        let provider = RemoteIdentityProvider::new(
            Client::new(),
            Url::parse(&format!("http://127.0.0.1:{port}")).unwrap(),
        );

        let result = provider.get(request("/session", None, "")).await;

        assert!(matches!(result, Err(GatewayError::UpstreamUnreachable(_))));
    }
}
