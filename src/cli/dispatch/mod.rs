use crate::{
    cli::{
        actions::{server::Args, Action},
        commands::{session, theme},
    },
    gateway::config::{GatewayConfig, DEFAULT_LOGIN_PATH, DEFAULT_MAX_BODY_BYTES},
};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use url::Url;

fn parse_base_url(matches: &clap::ArgMatches, name: &str) -> Result<Url> {
    let raw = matches
        .get_one::<String>(name)
        .with_context(|| format!("missing required argument: --{name}"))?;
    let url = Url::parse(raw).with_context(|| format!("Invalid --{name}: {raw}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow!("--{name} must be an http(s) URL: {raw}"));
    }
    Ok(url)
}

/// # Errors
/// Returns an error if required arguments are missing or a URL is invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let backend_url = parse_base_url(matches, "backend-url")?;
    let identity_url = parse_base_url(matches, "identity-url")?;

    let login_path = matches
        .get_one::<String>(session::ARG_LOGIN_PATH)
        .cloned()
        .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string());
    if !login_path.starts_with('/') {
        return Err(anyhow!("--login-path must start with '/': {login_path}"));
    }

    let mut config = GatewayConfig::new(backend_url, identity_url)
        .with_login_path(login_path)
        .with_cookie_secure(matches.get_flag(session::ARG_COOKIE_SECURE))
        .with_clear_session_on_reject(
            matches
                .get_one::<bool>(session::ARG_CLEAR_SESSION_ON_REJECT)
                .copied()
                .unwrap_or(true),
        )
        .with_max_body_bytes(
            matches
                .get_one::<usize>("max-body-bytes")
                .copied()
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
        )
        .with_theme_update_token(
            matches
                .get_one::<String>(theme::ARG_THEME_UPDATE_TOKEN)
                .filter(|token| !token.is_empty())
                .map(|token| SecretString::from(token.clone())),
        );

    if let Some(name) = matches.get_one::<String>(session::ARG_SESSION_COOKIE) {
        config = config.with_session_cookie(name.clone());
    }
    if let Some(path) = matches.get_one::<String>(theme::ARG_THEME_PATH) {
        config = config.with_theme_path(path.clone());
    }

    Ok(Action::Server(Args { port, config }))
}
