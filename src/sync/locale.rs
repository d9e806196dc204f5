//! One-shot display language negotiation.
//!
//! Precedence is fixed: a stored preference always wins, then the language of
//! the country reported by geolocation, then whatever is already active
//! (`en` unless the caller says otherwise). There is no update channel.

use reqwest::{header::AUTHORIZATION, Client};
use serde::{Deserialize, Serialize};
use std::{future::Future, pin::Pin};
use tracing::{debug, instrument, warn};
use url::Url;

use super::SyncError;
use crate::{gateway::upstream::endpoint_url, session::SessionToken};

pub const GEOLOCATION_PATH: &str = "/geolocation";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Es,
    Fr,
    De,
    Pt,
    It,
}

impl Language {
    pub const FALLBACK: Self = Self::En;

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::Fr => "fr",
            Self::De => "de",
            Self::Pt => "pt",
            Self::It => "it",
        }
    }

    /// Parse a locale code; region suffixes such as `fr-CA` are accepted.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code.trim().split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Self::En),
            "es" => Some(Self::Es),
            "fr" => Some(Self::Fr),
            "de" => Some(Self::De),
            "pt" => Some(Self::Pt),
            "it" => Some(Self::It),
            _ => None,
        }
    }

    /// Default language for an ISO 3166-1 alpha-2 country code.
    #[must_use]
    pub fn for_country(country_code: &str) -> Option<Self> {
        match country_code.trim().to_ascii_uppercase().as_str() {
            "US" | "GB" | "CA" | "AU" | "NZ" | "IE" | "ZA" => Some(Self::En),
            "ES" | "MX" | "AR" | "CO" | "CL" | "PE" | "VE" | "UY" | "EC" | "BO" | "PY" | "CR"
            | "GT" | "DO" => Some(Self::Es),
            "FR" | "BE" | "LU" | "MC" | "SN" | "CI" => Some(Self::Fr),
            "DE" | "AT" | "CH" | "LI" => Some(Self::De),
            "PT" | "BR" | "AO" | "MZ" => Some(Self::Pt),
            "IT" | "SM" | "VA" => Some(Self::It),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageSource {
    Stored,
    Geolocation,
    Fallback,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Negotiated {
    pub language: Language,
    pub source: LanguageSource,
    /// Whether a new preference was persisted during this negotiation.
    pub persisted: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GeoLocation {
    pub country_code: String,
    pub country_name: String,
}

/// Where an explicit language choice lives.
pub trait PreferenceStore {
    fn stored(&self) -> Option<Language>;
    fn store(&mut self, language: Language);

    /// Whether any choice was recorded, including one `stored` cannot parse.
    fn has_preference(&self) -> bool {
        self.stored().is_some()
    }
}

pub trait Geolocator: Send + Sync {
    /// Resolve the country associated with the session, if any.
    fn locate<'a>(
        &'a self,
        token: Option<&'a SessionToken>,
    ) -> Pin<Box<dyn Future<Output = Result<Option<GeoLocation>, SyncError>> + Send + 'a>>;
}

/// Asks the backend for the account's country via `GET <backend>/geolocation`.
#[derive(Clone, Debug)]
pub struct HttpGeolocator {
    client: Client,
    url: String,
}

impl HttpGeolocator {
    #[must_use]
    pub fn new(client: Client, backend_url: &Url) -> Self {
        Self {
            client,
            url: endpoint_url(backend_url, GEOLOCATION_PATH),
        }
    }

    #[instrument(skip(self, token), fields(url = %self.url))]
    async fn lookup(&self, token: Option<&SessionToken>) -> Result<Option<GeoLocation>, SyncError> {
        // Account data is only reachable with a session.
        let Some(token) = token else {
            return Ok(None);
        };

        let response = self
            .client
            .get(&self.url)
            .header(AUTHORIZATION, format!("Bearer {}", token.expose()))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status(status));
        }
        Ok(Some(response.json::<GeoLocation>().await?))
    }
}

impl Geolocator for HttpGeolocator {
    fn locate<'a>(
        &'a self,
        token: Option<&'a SessionToken>,
    ) -> Pin<Box<dyn Future<Output = Result<Option<GeoLocation>, SyncError>> + Send + 'a>> {
        Box::pin(self.lookup(token))
    }
}

/// Resolve the display language for one mount.
pub async fn negotiate<P, G>(
    preferences: &mut P,
    geolocator: &G,
    token: Option<&SessionToken>,
    active: Language,
) -> Negotiated
where
    P: PreferenceStore + ?Sized,
    G: Geolocator + ?Sized,
{
    if let Some(language) = preferences.stored() {
        return Negotiated {
            language,
            source: LanguageSource::Stored,
            persisted: false,
        };
    }

    // An unsupported choice is still the user's; keep what is shown and leave it alone.
    if preferences.has_preference() {
        debug!("Stored language preference is not supported, keeping {active:?}");
        return Negotiated {
            language: active,
            source: LanguageSource::Stored,
            persisted: false,
        };
    }

    let keep_active = Negotiated {
        language: active,
        source: LanguageSource::Fallback,
        persisted: false,
    };

    let location = match geolocator.locate(token).await {
        Ok(Some(location)) => location,
        Ok(None) => return keep_active,
        Err(err) => {
            warn!("Geolocation lookup failed: {err}");
            return keep_active;
        }
    };

    let Some(language) = Language::for_country(&location.country_code) else {
        debug!(
            "No default language for {} ({})",
            location.country_code, location.country_name
        );
        return keep_active;
    };

    let persisted = language != active;
    if persisted {
        preferences.store(language);
    }

    Negotiated {
        language,
        source: LanguageSource::Geolocation,
        persisted,
    }
}
