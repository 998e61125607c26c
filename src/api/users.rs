//! User database loaded once at startup.
//!
//! Users come either inline from the `USER_CONFIG` environment variable or
//! from a local JSON file, split into a `federated` and an `internal`
//! population. `AUTH_MODE` decides which population PIN verification consults.

use crate::api::config::AuthMode;
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{fs, path::Path};

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    // SecretString keeps the PIN out of Debug output and logs.
    pin: SecretString,
    #[serde(default)]
    pub email: Option<String>,
}

impl User {
    #[must_use]
    pub fn pin_matches(&self, candidate: &str) -> bool {
        self.pin.expose_secret() == candidate
    }

    /// User fields safe to hand back to the identity platform (no PIN).
    #[must_use]
    pub fn claims(&self) -> Value {
        json!({
            "id": self.id,
            "username": self.username,
            "email": self.email,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserDirectory {
    #[serde(default)]
    federated: Vec<User>,
    #[serde(default)]
    internal: Vec<User>,
}

impl UserDirectory {
    /// Parse the inline `USER_CONFIG` JSON.
    ///
    /// # Errors
    /// Returns an error when the JSON is malformed; fatal at startup.
    pub fn from_inline(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("malformed USER_CONFIG JSON")
    }

    /// Load the fallback users file.
    ///
    /// # Errors
    /// Returns an error when the file is missing or malformed; fatal at startup.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read users file {}", path.display()))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("malformed users file {}", path.display()))
    }

    /// The population consulted for the given mode: federated, internal, or
    /// the concatenation of both with federated entries first.
    #[must_use]
    pub fn database(&self, mode: AuthMode) -> Vec<&User> {
        match mode {
            AuthMode::Federated => self.federated.iter().collect(),
            AuthMode::Internal => self.internal.iter().collect(),
            AuthMode::SecondFactor | AuthMode::Other => {
                self.federated.iter().chain(self.internal.iter()).collect()
            }
        }
    }

    #[must_use]
    pub fn find_by_pin(&self, mode: AuthMode, pin: &str) -> Option<&User> {
        self.database(mode)
            .into_iter()
            .find(|user| user.pin_matches(pin))
    }

    #[must_use]
    pub fn find_by_username(&self, mode: AuthMode, username: &str) -> Option<&User> {
        self.database(mode)
            .into_iter()
            .find(|user| user.username == username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "federated": [
            {"id": "u-1", "username": "ana", "pin": "1234", "email": "ana@example.com"},
            {"id": "u-2", "username": "bruno", "pin": "2468"}
        ],
        "internal": [
            {"id": "u-3", "username": "carol", "pin": "5678"}
        ]
    }"#;

    fn usernames(users: &[&User]) -> Vec<String> {
        users.iter().map(|user| user.username.clone()).collect()
    }

    #[test]
    fn federated_mode_selects_federated_list() {
        let directory = UserDirectory::from_inline(SAMPLE).expect("parse");
        let users = directory.database(AuthMode::Federated);
        assert_eq!(usernames(&users), vec!["ana", "bruno"]);
    }

    #[test]
    fn internal_mode_selects_internal_list() {
        let directory = UserDirectory::from_inline(SAMPLE).expect("parse");
        let users = directory.database(AuthMode::Internal);
        assert_eq!(usernames(&users), vec!["carol"]);
    }

    #[test]
    fn other_modes_concatenate_federated_first() {
        let directory = UserDirectory::from_inline(SAMPLE).expect("parse");

        for mode in [AuthMode::SecondFactor, AuthMode::Other] {
            let users = directory.database(mode);
            assert_eq!(usernames(&users), vec!["ana", "bruno", "carol"]);
        }
    }

    #[test]
    fn lookup_by_pin_and_username() {
        let directory = UserDirectory::from_inline(SAMPLE).expect("parse");

        let user = directory
            .find_by_pin(AuthMode::Other, "5678")
            .expect("carol");
        assert_eq!(user.username, "carol");

        assert!(directory.find_by_pin(AuthMode::Federated, "5678").is_none());
        assert!(directory.find_by_pin(AuthMode::Other, "0000").is_none());

        let user = directory
            .find_by_username(AuthMode::Federated, "ana")
            .expect("ana");
        assert_eq!(user.id, "u-1");
    }

    #[test]
    fn claims_never_expose_the_pin() {
        let directory = UserDirectory::from_inline(SAMPLE).expect("parse");
        let user = directory
            .find_by_username(AuthMode::Federated, "ana")
            .expect("ana");

        let claims = user.claims();
        assert_eq!(claims["username"], "ana");
        assert_eq!(claims["email"], "ana@example.com");
        assert!(claims.get("pin").is_none());

        // Debug output is redacted as well.
        let debug = format!("{user:?}");
        assert!(!debug.contains("1234"), "PIN leaked in Debug: {debug}");
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let directory = UserDirectory::from_inline("{}").expect("parse");
        assert!(directory.database(AuthMode::Other).is_empty());
    }

    #[test]
    fn malformed_inline_config_is_an_error() {
        assert!(UserDirectory::from_inline("not json").is_err());
    }

    #[test]
    fn missing_users_file_is_an_error() {
        assert!(UserDirectory::from_file(Path::new("/nonexistent/users.json")).is_err());
    }
}
