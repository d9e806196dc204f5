use clap::{Arg, Command};

use crate::sync::theme::DEFAULT_THEME_PATH;

pub const ARG_THEME_PATH: &str = "theme-path";
pub const ARG_THEME_UPDATE_TOKEN: &str = "theme-update-token";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_THEME_PATH)
                .long(ARG_THEME_PATH)
                .help("Backend path serving the theme configuration")
                .default_value(DEFAULT_THEME_PATH)
                .env("PORTICO_THEME_PATH"),
        )
        .arg(
            Arg::new(ARG_THEME_UPDATE_TOKEN)
                .long(ARG_THEME_UPDATE_TOKEN)
                .help("Bearer token the backend must present to push theme updates")
                .long_help(
                    "Bearer token the backend must present on POST /api/theme/updates. Theme updates are disabled when unset.",
                )
                .env("PORTICO_THEME_UPDATE_TOKEN")
                .hide_env_values(true),
        )
}
