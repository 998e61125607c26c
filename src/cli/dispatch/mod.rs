use crate::cli::actions::{server::Args, Action};
use anyhow::{Context, Result};

/// Map parsed arguments to an [`Action`].
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(3000);

    let auth_mode = matches
        .get_one::<String>("auth-mode")
        .cloned()
        .context("missing argument: --auth-mode")?;

    let host_url = matches
        .get_one::<String>("host-url")
        .cloned()
        .context("missing argument: --host-url")?;

    let provider_url = matches
        .get_one::<String>("provider-url")
        .cloned()
        .context("missing argument: --provider-url")?;

    let user_config = matches.get_one::<String>("user-config").cloned();

    let users_file = matches
        .get_one::<String>("users-file")
        .cloned()
        .context("missing argument: --users-file")?;

    Ok(Action::Server(Args {
        port,
        auth_mode,
        host_url,
        provider_url,
        user_config,
        users_file,
    }))
}
