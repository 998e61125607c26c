//! Runtime configuration: authentication mode and service URLs.

use anyhow::{Context, Result};
use std::fmt;
use url::Url;

/// Which user population PIN verification consults, selected once at startup
/// via `AUTH_MODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Federated,
    Internal,
    /// The platform already authenticated the user; the PIN is a second
    /// factor verified against that same user.
    SecondFactor,
    /// Any other value: both populations are consulted, federated first.
    Other,
}

impl AuthMode {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "federated" => Self::Federated,
            "internal" => Self::Internal,
            "second_factor" => Self::SecondFactor,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Federated => "federated",
            Self::Internal => "internal",
            Self::SecondFactor => "second_factor",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub auth_mode: AuthMode,
    /// Public base URL of this service, used to build the PIN-entry redirect.
    pub host_url: Url,
    /// Base URL of the identity provider that initiated the flow.
    pub provider_url: Url,
}

impl ServiceConfig {
    /// Parse and validate the configured URLs.
    ///
    /// # Errors
    /// Returns an error when either URL is malformed; this is fatal at startup.
    pub fn new(auth_mode: AuthMode, host_url: &str, provider_url: &str) -> Result<Self> {
        let host_url = Url::parse(host_url).context("invalid HOST_URL")?;
        let provider_url =
            Url::parse(provider_url).context("invalid BASE_WSO2_IAM_PROVIDER_URL")?;

        Ok(Self {
            auth_mode,
            host_url,
            provider_url,
        })
    }

    /// Redirect target sent back on the first authenticate call:
    /// `{HOST_URL}/api/pin-entry?flowId={flow_id}`.
    ///
    /// # Errors
    /// Returns an error when the base URL cannot be a base (never the case for
    /// the http(s) URLs accepted at startup).
    pub fn pin_entry_url(&self, flow_id: &str) -> Result<String> {
        let mut url = self
            .host_url
            .join("/api/pin-entry")
            .context("invalid HOST_URL")?;
        url.query_pairs_mut().append_pair("flowId", flow_id);

        Ok(url.into())
    }

    /// Where the PIN-entry page sends the user once the flow is resolved.
    ///
    /// # Errors
    /// Returns an error when the provider URL cannot be a base.
    pub fn provider_return_url(&self, flow_id: &str) -> Result<String> {
        let mut url = self
            .provider_url
            .join("/commonauth")
            .context("invalid BASE_WSO2_IAM_PROVIDER_URL")?;
        url.query_pairs_mut().append_pair("flowId", flow_id);

        Ok(url.into())
    }
}
