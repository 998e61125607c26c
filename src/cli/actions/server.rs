use crate::api::{
    self,
    config::{AuthMode, ServiceConfig},
    session::SessionStore,
    users::UserDirectory,
    AppState,
};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub auth_mode: String,
    pub host_url: String,
    pub provider_url: String,
    pub user_config: Option<String>,
    pub users_file: String,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the configuration is invalid, the user database cannot
/// be loaded, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_mode = AuthMode::parse(&args.auth_mode);
    let config = ServiceConfig::new(auth_mode, &args.host_url, &args.provider_url)?;

    let users = match &args.user_config {
        Some(inline) => UserDirectory::from_inline(inline)
            .context("failed to load users from USER_CONFIG")?,
        None => {
            let directory = UserDirectory::from_file(Path::new(&args.users_file))?;
            info!("Loaded users from {}", args.users_file);
            directory
        }
    };

    log_startup_args(&args, auth_mode);

    let state = AppState {
        config,
        sessions: SessionStore::new(),
        users,
    };

    api::new(args.port, state).await
}

fn log_startup_args(args: &Args, auth_mode: AuthMode) {
    let entries = [
        ("port", args.port.to_string()),
        ("auth_mode", auth_mode.to_string()),
        ("host_url", args.host_url.clone()),
        ("provider_url", args.provider_url.clone()),
        ("user_config_set", args.user_config.is_some().to_string()),
        ("users_file", args.users_file.clone()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = String::from("Startup configuration:");
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }

    info!("{message}");
}
