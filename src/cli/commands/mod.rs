pub mod logging;
pub mod session;
pub mod theme;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("portico")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("PORTICO_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("backend-url")
                .short('b')
                .long("backend-url")
                .help("Base URL of the backend API, example: https://api.tld/v1")
                .env("PORTICO_BACKEND_URL")
                .required(true),
        )
        .arg(
            Arg::new("identity-url")
                .short('i')
                .long("identity-url")
                .help("Base URL of the identity service handling the login handshake")
                .env("PORTICO_IDENTITY_URL")
                .required(true),
        )
        .arg(
            Arg::new("max-body-bytes")
                .long("max-body-bytes")
                .help("Largest inbound request body accepted, in bytes")
                .default_value("10485760")
                .env("PORTICO_MAX_BODY_BYTES")
                .value_parser(clap::value_parser!(usize)),
        );

    let command = session::with_args(command);
    let command = theme::with_args(command);
    logging::with_args(command)
}
