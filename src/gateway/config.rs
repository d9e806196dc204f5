//! Gateway configuration resolved from CLI flags and `PORTICO_*` variables.

use secrecy::SecretString;
use url::Url;

use crate::{session::DEFAULT_SESSION_COOKIE, sync::theme::DEFAULT_THEME_PATH};

pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    backend_url: Url,
    identity_url: Url,
    login_path: String,
    session_cookie: String,
    cookie_secure: bool,
    clear_session_on_reject: bool,
    max_body_bytes: usize,
    theme_path: String,
    theme_update_token: Option<SecretString>,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(backend_url: Url, identity_url: Url) -> Self {
        Self {
            backend_url,
            identity_url,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            cookie_secure: false,
            clear_session_on_reject: true,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            theme_path: DEFAULT_THEME_PATH.to_string(),
            theme_update_token: None,
        }
    }

    #[must_use]
    pub fn with_login_path(mut self, path: String) -> Self {
        self.login_path = path;
        self
    }

    #[must_use]
    pub fn with_session_cookie(mut self, name: String) -> Self {
        self.session_cookie = name;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_clear_session_on_reject(mut self, clear: bool) -> Self {
        self.clear_session_on_reject = clear;
        self
    }

    #[must_use]
    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_theme_path(mut self, path: String) -> Self {
        self.theme_path = path;
        self
    }

    #[must_use]
    pub fn with_theme_update_token(mut self, token: Option<SecretString>) -> Self {
        self.theme_update_token = token;
        self
    }

    #[must_use]
    pub fn backend_url(&self) -> &Url {
        &self.backend_url
    }

    #[must_use]
    pub fn identity_url(&self) -> &Url {
        &self.identity_url
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn session_cookie(&self) -> &str {
        &self.session_cookie
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    #[must_use]
    pub fn clear_session_on_reject(&self) -> bool {
        self.clear_session_on_reject
    }

    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    #[must_use]
    pub fn theme_path(&self) -> &str {
        &self.theme_path
    }

    #[must_use]
    pub fn theme_update_token(&self) -> Option<&SecretString> {
        self.theme_update_token.as_ref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn urls() -> (Url, Url) {
        (
            Url::parse("https://api.example.com").unwrap(),
            Url::parse("https://id.example.com").unwrap(),
        )
    }

    #[test]
    fn defaults() {
        let (backend, identity) = urls();
        let config = GatewayConfig::new(backend, identity);
        assert_eq!(config.login_path(), "/login");
        assert_eq!(config.session_cookie(), "session");
        assert_eq!(config.theme_path(), "/theme");
        assert!(config.clear_session_on_reject());
        assert!(!config.cookie_secure());
        assert_eq!(config.max_body_bytes(), DEFAULT_MAX_BODY_BYTES);
        assert!(config.theme_update_token().is_none());
    }

    #[test]
    fn builders_override_defaults() {
        let (backend, identity) = urls();
        let config = GatewayConfig::new(backend, identity)
            .with_login_path("/signin".to_string())
            .with_session_cookie("sid".to_string())
            .with_cookie_secure(true)
            .with_clear_session_on_reject(false)
            .with_max_body_bytes(1024)
            .with_theme_path("/config/theme".to_string())
            .with_theme_update_token(Some(SecretString::from("push-secret")));

        assert_eq!(config.login_path(), "/signin");
        assert_eq!(config.session_cookie(), "sid");
        assert!(config.cookie_secure());
        assert!(!config.clear_session_on_reject());
        assert_eq!(config.max_body_bytes(), 1024);
        assert_eq!(config.theme_path(), "/config/theme");
        assert_eq!(
            config.theme_update_token().unwrap().expose_secret(),
            "push-secret"
        );
    }
}
