use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

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

    Command::new("pinauth")
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
                .default_value("3000")
                .env("PINAUTH_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("auth-mode")
                .long("auth-mode")
                .help("User population consulted for PIN verification: federated, internal, second_factor (anything else consults both)")
                .default_value("federated")
                .env("AUTH_MODE"),
        )
        .arg(
            Arg::new("host-url")
                .long("host-url")
                .help("Public base URL of this service, used in the PIN-entry redirect")
                .default_value("http://localhost:3000")
                .env("HOST_URL"),
        )
        .arg(
            Arg::new("provider-url")
                .long("provider-url")
                .help("Base URL of the identity provider that drives the flow")
                .default_value("https://localhost:9443")
                .env("BASE_WSO2_IAM_PROVIDER_URL"),
        )
        .arg(
            Arg::new("user-config")
                .long("user-config")
                .help("Inline JSON user database; takes precedence over the users file")
                .env("USER_CONFIG"),
        )
        .arg(
            Arg::new("users-file")
                .long("users-file")
                .help("Path to the JSON user database, consulted when no inline config is set")
                .default_value("data/users.json")
                .env("PINAUTH_USERS_FILE"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("PINAUTH_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
