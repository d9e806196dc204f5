//! Shared outbound HTTP client and URL helpers for backend calls.

use super::error::GatewayError;
use crate::APP_USER_AGENT;
use reqwest::{redirect::Policy, Client};
use url::Url;

/// Build the client used for every backend and identity service call.
/// Redirects are relayed to the browser, never followed here.
///
/// # Errors
/// Returns error if the TLS backend cannot be initialized
pub fn http_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(APP_USER_AGENT)
        .redirect(Policy::none())
        .build()
}

/// Join a base URL and a path without doubling or dropping slashes.
#[must_use]
pub fn endpoint_url(base: &Url, path: &str) -> String {
    let base = base.as_str().trim_end_matches('/');
    let path = path.trim();

    if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

// `.` or `..`, in any mix of literal and `%2e` forms.
fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

/// Resolve an untrusted `suffix` under `<base><scope>` and return the final URL.
///
/// The URL parser folds dot segments, so a suffix such as `%2e%2e/admin` would
/// otherwise climb out of `scope`. Those are refused up front, and the parsed
/// result must still sit under the scope on the same origin.
///
/// # Errors
/// `GatewayError::InvalidPath` if the suffix holds a dot segment or the
/// resolved URL leaves the scope.
pub fn scoped_url(
    base: &Url,
    scope: &str,
    suffix: &str,
    query: Option<&str>,
) -> Result<Url, GatewayError> {
    if suffix.split(['/', '\\']).any(is_dot_segment) {
        return Err(GatewayError::InvalidPath(suffix.to_string()));
    }

    let root = endpoint_url(base, scope);
    let path = format!(
        "{}/{}",
        scope.trim_end_matches('/'),
        suffix.trim_start_matches('/')
    );
    let mut target = endpoint_url(base, &path);
    if let Some(query) = query.filter(|query| !query.is_empty()) {
        target.push('?');
        target.push_str(query);
    }

    let invalid = || GatewayError::InvalidPath(suffix.to_string());
    let root = Url::parse(&root).map_err(|_| invalid())?;
    let url = Url::parse(&target).map_err(|_| invalid())?;

    let root_path = root.path().trim_end_matches('/');
    let inside = url.path() == root_path || url.path().starts_with(&format!("{root_path}/"));
    if url.origin() != base.origin() || !inside {
        return Err(invalid());
    }

    Ok(url)
}
