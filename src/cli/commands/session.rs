use clap::{builder::BoolishValueParser, Arg, ArgAction, Command};

use crate::{gateway::config::DEFAULT_LOGIN_PATH, session::DEFAULT_SESSION_COOKIE};

pub const ARG_LOGIN_PATH: &str = "login-path";
pub const ARG_SESSION_COOKIE: &str = "session-cookie";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";
pub const ARG_CLEAR_SESSION_ON_REJECT: &str = "clear-session-on-reject";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LOGIN_PATH)
                .long(ARG_LOGIN_PATH)
                .help("Route browsers are sent to when the session is missing or rejected")
                .default_value(DEFAULT_LOGIN_PATH)
                .env("PORTICO_LOGIN_PATH"),
        )
        .arg(
            Arg::new(ARG_SESSION_COOKIE)
                .long(ARG_SESSION_COOKIE)
                .help("Name of the cookie holding the session token")
                .default_value(DEFAULT_SESSION_COOKIE)
                .env("PORTICO_SESSION_COOKIE"),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark cookies written by the gateway as Secure (HTTPS only)")
                .env("PORTICO_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_CLEAR_SESSION_ON_REJECT)
                .long(ARG_CLEAR_SESSION_ON_REJECT)
                .help("Expire the session cookie when the backend answers 401 or 403")
                .env("PORTICO_CLEAR_SESSION_ON_REJECT")
                .default_value("true")
                .value_parser(BoolishValueParser::new()),
        )
}
