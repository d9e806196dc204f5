use axum::{
    extract::{Extension, Query},
    http::{
        header::{InvalidHeaderValue, SET_COOKIE},
        HeaderMap, HeaderValue,
    },
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use crate::{
    gateway::state::GatewayState,
    session::{cookie_value, CookieSession, SessionStore},
    sync::locale::{negotiate, Language, PreferenceStore},
};

pub const LOCALE_COOKIE: &str = "locale";
const LOCALE_COOKIE_MAX_AGE: u64 = 60 * 60 * 24 * 365;

#[derive(Debug, Default, Deserialize)]
pub struct LocaleQuery {
    /// Language currently shown by the browser.
    active: Option<String>,
}

/// Preference backed by the `locale` cookie; writes become a `Set-Cookie`.
#[derive(Debug, Default)]
struct CookiePreferences {
    /// Raw cookie value, which may name a language we cannot display.
    raw: Option<String>,
    written: Option<Language>,
}

impl CookiePreferences {
    fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            raw: cookie_value(headers, LOCALE_COOKIE)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            written: None,
        }
    }
}

impl PreferenceStore for CookiePreferences {
    fn stored(&self) -> Option<Language> {
        self.raw.as_deref().and_then(Language::from_code)
    }

    fn store(&mut self, language: Language) {
        self.written = Some(language);
    }

    fn has_preference(&self) -> bool {
        self.raw.is_some()
    }
}

fn locale_cookie(language: Language, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{LOCALE_COOKIE}={}; Path=/; SameSite=Lax; Max-Age={LOCALE_COOKIE_MAX_AGE}",
        language.code()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Negotiate the display language for one browser mount.
pub async fn locale(
    headers: HeaderMap,
    query: Query<LocaleQuery>,
    state: Extension<Arc<GatewayState>>,
) -> impl IntoResponse {
    let active = query
        .active
        .as_deref()
        .and_then(Language::from_code)
        .unwrap_or(Language::FALLBACK);

    let token = CookieSession::from_headers(&state.session_cookie(), &headers).token();
    let mut preferences = CookiePreferences::from_headers(&headers);

    let negotiated = negotiate(&mut preferences, state.geolocator(), token.as_ref(), active).await;

    let mut response_headers = HeaderMap::new();
    if let Some(language) = preferences.written {
        match locale_cookie(language, state.config().cookie_secure()) {
            Ok(cookie) => {
                response_headers.insert(SET_COOKIE, cookie);
            }
            Err(err) => error!("Failed to build locale cookie: {err}"),
        }
    }

    (response_headers, Json(negotiated))
}
