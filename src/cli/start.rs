use crate::cli::{actions::Action, commands, dispatch, telemetry};
use anyhow::Result;

/// Start the CLI: parse arguments, initialize logging, return the action.
///
/// # Errors
/// Returns an error if telemetry initialization or argument handling fails.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    let verbosity_level = match matches.get_one::<u8>("verbosity").map_or(0, |&v| v) {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    telemetry::init(Some(verbosity_level))?;

    dispatch::handler(&matches)
}
