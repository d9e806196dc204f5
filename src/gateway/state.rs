use reqwest::Client;
use std::sync::Arc;

use super::{
    config::GatewayConfig,
    identity::{IdentityProvider, RemoteIdentityProvider},
    proxy::Proxy,
};
use crate::{
    session::{HttpInvalidator, SessionCookie, SessionInvalidator},
    sync::{
        locale::{Geolocator, HttpGeolocator},
        theme::{HttpThemeSource, ThemeBroadcaster, ThemeSource, ThemeSync},
    },
};

/// Everything the handlers share; collaborators are trait objects so tests
/// can swap them out.
pub struct GatewayState {
    config: GatewayConfig,
    proxy: Proxy,
    identity: Arc<dyn IdentityProvider>,
    invalidator: Arc<dyn SessionInvalidator>,
    geolocator: Arc<dyn Geolocator>,
    theme_source: Arc<dyn ThemeSource>,
    theme: ThemeSync,
    theme_updates: ThemeBroadcaster,
}

impl GatewayState {
    #[must_use]
    pub fn new(config: GatewayConfig, client: &Client) -> Self {
        let session_cookie = session_cookie(&config);
        let proxy = Proxy::new(
            client.clone(),
            config.backend_url().clone(),
            config.login_path().to_string(),
        )
        .with_session_cookie(session_cookie)
        .with_clear_on_reject(config.clear_session_on_reject());

        Self {
            proxy,
            identity: Arc::new(RemoteIdentityProvider::new(
                client.clone(),
                config.identity_url().clone(),
            )),
            invalidator: Arc::new(HttpInvalidator::new(client.clone(), config.backend_url())),
            geolocator: Arc::new(HttpGeolocator::new(client.clone(), config.backend_url())),
            theme_source: Arc::new(HttpThemeSource::new(
                client.clone(),
                config.backend_url(),
                config.theme_path(),
            )),
            theme: ThemeSync::new(),
            theme_updates: ThemeBroadcaster::new(),
            config,
        }
    }

    #[must_use]
    pub fn with_identity_provider(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    #[must_use]
    pub fn with_invalidator(mut self, invalidator: Arc<dyn SessionInvalidator>) -> Self {
        self.invalidator = invalidator;
        self
    }

    #[must_use]
    pub fn with_geolocator(mut self, geolocator: Arc<dyn Geolocator>) -> Self {
        self.geolocator = geolocator;
        self
    }

    #[must_use]
    pub fn with_theme_source(mut self, source: Arc<dyn ThemeSource>) -> Self {
        self.theme_source = source;
        self
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    #[must_use]
    pub fn proxy(&self) -> &Proxy {
        &self.proxy
    }

    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn invalidator(&self) -> &dyn SessionInvalidator {
        self.invalidator.as_ref()
    }

    #[must_use]
    pub fn geolocator(&self) -> &dyn Geolocator {
        self.geolocator.as_ref()
    }

    #[must_use]
    pub fn theme_source(&self) -> Arc<dyn ThemeSource> {
        Arc::clone(&self.theme_source)
    }

    #[must_use]
    pub fn theme(&self) -> &ThemeSync {
        &self.theme
    }

    #[must_use]
    pub fn theme_updates(&self) -> &ThemeBroadcaster {
        &self.theme_updates
    }

    #[must_use]
    pub fn session_cookie(&self) -> SessionCookie {
        session_cookie(&self.config)
    }
}

fn session_cookie(config: &GatewayConfig) -> SessionCookie {
    SessionCookie::new(config.session_cookie()).with_secure(config.cookie_secure())
}
