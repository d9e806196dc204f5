use clap::{builder::ValueParser, Arg, ArgAction, Command};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

/// Log levels by verbosity; each `-v` moves one step right.
const LEVELS: [Level; 5] = [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE];

/// Level for a verbosity count. Counts past the table stay at `TRACE`.
#[must_use]
pub fn level_for(verbosity: u8) -> Level {
    LEVELS[usize::from(verbosity).min(LEVELS.len() - 1)]
}

// Accepts a level name or a verbosity count, as `PORTICO_LOG_LEVEL=debug` or `=3`.
fn parse_verbosity(value: &str) -> Result<u8, String> {
    let value = value.trim();
    let position = match value.parse::<usize>() {
        Ok(count) => (count < LEVELS.len()).then_some(count),
        Err(_) => LEVELS
            .iter()
            .position(|level| level.as_str().eq_ignore_ascii_case(value)),
    };

    position
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| {
            format!("invalid log level '{value}', expected error, warn, info, debug or trace")
        })
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(parse_verbosity)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Raise log verbosity from ERROR; repeat up to -vvvv for TRACE")
            .env("PORTICO_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_for_walks_the_table_and_saturates() {
        assert_eq!(level_for(0), Level::ERROR);
        assert_eq!(level_for(1), Level::WARN);
        assert_eq!(level_for(2), Level::INFO);
        assert_eq!(level_for(3), Level::DEBUG);
        assert_eq!(level_for(4), Level::TRACE);
        assert_eq!(level_for(u8::MAX), Level::TRACE);
    }

    #[test]
    fn names_and_counts_select_the_same_level() {
        for (count, name) in ["error", "WARN", "Info", "debug", "trace"].into_iter().enumerate() {
            let from_name = parse_verbosity(name).ok();
            assert_eq!(from_name, u8::try_from(count).ok());
            assert_eq!(parse_verbosity(&count.to_string()).ok(), from_name);
        }
    }

    #[test]
    fn unknown_levels_are_rejected() {
        assert!(parse_verbosity("verbose").is_err());
        assert!(parse_verbosity("5").is_err());
        assert!(parse_verbosity("").is_err());
    }
}
