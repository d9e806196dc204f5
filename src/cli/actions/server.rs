use crate::gateway::{self, config::GatewayConfig};
use anyhow::Result;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub config: GatewayConfig,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to bind or stops with an error.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    gateway::new(args.port, args.config).await
}

fn log_startup_args(args: &Args) {
    let config = &args.config;
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("backend_url", config.backend_url().to_string()),
        ("identity_url", config.identity_url().to_string()),
        ("login_path", config.login_path().to_string()),
        ("session_cookie", config.session_cookie().to_string()),
        ("cookie_secure", config.cookie_secure().to_string()),
        (
            "clear_session_on_reject",
            config.clear_session_on_reject().to_string(),
        ),
        ("max_body_bytes", config.max_body_bytes().to_string()),
        ("theme_path", config.theme_path().to_string()),
        (
            "theme_updates",
            if config.theme_update_token().is_some() {
                "enabled".to_string()
            } else {
                "disabled".to_string()
            },
        ),
    ];
    info!("{}", format_entries("Startup configuration", &entries));
}

fn format_entries(title: &str, entries: &[(&str, String)]) -> String {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\n{title}:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    message
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}
