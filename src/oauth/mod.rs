//! GitHub OAuth module
//!
//! This module holds the values that flow through the two provider exchanges
//! and the gateway that performs them. Nothing here is persisted: every value
//! lives for the duration of a single login call.

pub mod authorize;
pub mod gateway;

pub use authorize::build_authorize_url;
pub use gateway::{GitHubGateway, ProviderGateway};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Login request body posted by the browser after GitHub redirects back
#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub code: Option<String>,
}

/// One-time code handed back by GitHub after user consent
///
/// The gateway takes it by value, so a code cannot be exchanged twice
/// within the same pipeline.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationCode(String);

impl AuthorizationCode {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AuthorizationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthorizationCode(<{} chars>)", self.0.len())
    }
}

/// Bearer credential scoped to the GitHub API
///
/// Only `ProviderGateway::exchange_code_for_token` creates one, and
/// `ProviderGateway::fetch_identity` consumes it.
pub struct ProviderAccessToken(String);

impl ProviderAccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ProviderAccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProviderAccessToken(<redacted>)")
    }
}

/// The provider's durable identifier for the authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub external_id: String,
    pub login: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl VerifiedIdentity {
    /// Identity carrying only the external id
    #[must_use]
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            login: None,
            name: None,
            email: None,
            avatar_url: None,
        }
    }

    #[must_use]
    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_output_never_contains_secrets() {
        let code = AuthorizationCode::new("abc123");
        let token = ProviderAccessToken::new("gho_secret_value");

        assert!(!format!("{code:?}").contains("abc123"));
        assert!(!format!("{token:?}").contains("gho_secret_value"));
    }

    #[test]
    fn test_blank_code_detection() {
        assert!(AuthorizationCode::new("   ").is_blank());
        assert!(AuthorizationCode::new("").is_blank());
        assert!(!AuthorizationCode::new("abc123").is_blank());
    }
}
