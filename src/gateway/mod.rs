//! HTTP surface of the gateway: routing, the session guard for page routes, and
//! the server lifecycle.

pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod proxy;
pub mod state;
pub mod upstream;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{any, get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

use self::{
    config::GatewayConfig,
    handlers::{AUTH_PREFIX, PROXY_PREFIX, PUBLIC_PREFIX},
    state::GatewayState,
};

/// Build the gateway router with every API route registered.
#[must_use]
pub fn router(state: Arc<GatewayState>) -> Router {
    let max_body_bytes = state.config().max_body_bytes();

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/session", get(handlers::session_status))
        .route("/api/logout", post(handlers::logout))
        .route(
            &format!("{AUTH_PREFIX}/*path"),
            get(handlers::identity_get).post(handlers::identity_post),
        )
        .route(&format!("{PROXY_PREFIX}/*path"), any(handlers::proxy))
        .route(
            &format!("{PUBLIC_PREFIX}/*path"),
            get(handlers::public).options(handlers::public_preflight),
        )
        .route("/api/theme", get(handlers::theme))
        .route("/api/theme/updates", post(handlers::theme_update))
        .route("/api/locale", get(handlers::locale))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// Put `pages` behind the session guard; anonymous requests are redirected
/// to the login route before any page handler runs.
#[must_use]
pub fn protect(pages: Router, state: Arc<GatewayState>) -> Router {
    pages.route_layer(middleware::from_fn_with_state(
        state,
        handlers::require_session,
    ))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, config: GatewayConfig) -> Result<()> {
    let client = upstream::http_client().context("Failed to build HTTP client")?;
    let state = Arc::new(GatewayState::new(config, &client));

    let theme = state
        .theme()
        .mount(state.theme_source(), state.theme_updates())
        .await;

    let app = router(Arc::clone(&state));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // A pending initial fetch may still complete; its result is ignored.
    drop(theme.unmount());

    info!("Gracefully shutdown");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
