//! Login pipeline errors

use crate::settings::ConfigurationError;
use crate::tokens::TokenError;
use thiserror::Error;

/// Errors surfaced by the login pipeline
///
/// None of these are retried automatically: authorization codes and provider
/// tokens are single-use, so the only recovery is a fresh login.
#[derive(Debug, Error)]
pub enum LoginError {
    /// Any failure in the two GitHub exchanges
    #[error("upstream authentication failed: {0}")]
    UpstreamAuth(String),
    /// Missing or invalid signing material or client credentials
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A platform token presented back to us did not verify
    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),
}

impl LoginError {
    pub(crate) fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamAuth(msg.into())
    }

    /// Short machine-readable code used in HTTP error bodies
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UpstreamAuth(_) => "upstream_auth_failed",
            Self::Configuration(_) => "server_error",
            Self::InvalidToken(_) => "invalid_token",
        }
    }
}

impl From<ConfigurationError> for LoginError {
    fn from(err: ConfigurationError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<reqwest::Error> for LoginError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::UpstreamAuth("provider request timed out".to_string())
        } else {
            // Without the URL, which may carry the provider host and query
            Self::UpstreamAuth(format!("provider request failed: {}", err.without_url()))
        }
    }
}
