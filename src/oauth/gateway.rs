//! Outbound exchanges against GitHub
//!
//! Two calls, always in this order within one login:
//! 1. authorization code -> provider access token
//! 2. provider access token -> verified identity

use super::{AuthorizationCode, ProviderAccessToken, VerifiedIdentity};
use crate::login::LoginError;
use crate::settings::GitHubSettings;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;

/// Media type GitHub documents for its REST API
pub const GITHUB_JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

/// The two provider exchanges behind one narrow seam
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Exchange a one-time authorization code for a provider access token
    ///
    /// # Errors
    ///
    /// Returns `LoginError::UpstreamAuth` if the provider rejects the code,
    /// answers with a non-success status, or the body has no access token.
    async fn exchange_code_for_token(
        &self,
        code: AuthorizationCode,
    ) -> Result<ProviderAccessToken, LoginError>;

    /// Fetch the identity the provider access token belongs to
    ///
    /// # Errors
    ///
    /// Returns `LoginError::UpstreamAuth` if the token is rejected or the
    /// response cannot be parsed.
    async fn fetch_identity(
        &self,
        token: ProviderAccessToken,
    ) -> Result<VerifiedIdentity, LoginError>;
}

/// Token endpoint response
///
/// GitHub answers a consumed, expired or forged code with `200 OK` and an
/// `error` field instead of a token.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// User endpoint response; only the fields we keep
#[derive(Debug, Deserialize)]
struct UserResponse {
    id: serde_json::Value,
    login: Option<String>,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

impl UserResponse {
    fn into_identity(self) -> Result<VerifiedIdentity, LoginError> {
        let external_id = match self.id {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) if !s.trim().is_empty() => s,
            other => {
                return Err(LoginError::upstream(format!(
                    "identity response has unusable id of type {}",
                    json_type_name(&other)
                )))
            }
        };
        Ok(VerifiedIdentity {
            external_id,
            login: self.login,
            name: self.name,
            email: self.email,
            avatar_url: self.avatar_url,
        })
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// `ProviderGateway` backed by GitHub's OAuth and REST endpoints
#[derive(Clone)]
pub struct GitHubGateway {
    http_client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    token_url: String,
    user_url: String,
    user_agent: String,
}

impl GitHubGateway {
    /// Build a gateway with its own HTTP client bounded by the configured timeout
    ///
    /// # Errors
    ///
    /// Returns `LoginError::Configuration` if the settings are invalid or the
    /// HTTP client cannot be constructed.
    pub fn new(settings: &GitHubSettings) -> Result<Self, LoginError> {
        settings.validate()?;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()
            .map_err(|e| LoginError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(settings, http_client))
    }

    /// Build a gateway around an injected HTTP client
    #[must_use]
    pub fn with_client(settings: &GitHubSettings, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_uri: settings.redirect_uri.clone(),
            token_url: settings.token_url.clone(),
            user_url: settings.user_url.clone(),
            user_agent: settings.user_agent.clone(),
        }
    }
}

#[async_trait]
impl ProviderGateway for GitHubGateway {
    async fn exchange_code_for_token(
        &self,
        code: AuthorizationCode,
    ) -> Result<ProviderAccessToken, LoginError> {
        let mut params = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code.as_str()),
        ];
        if !self.redirect_uri.is_empty() {
            params.push(("redirect_uri", self.redirect_uri.as_str()));
        }

        let response = self
            .http_client
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, &self.user_agent)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoginError::upstream(format!(
                "token exchange failed with status {status}"
            )));
        }

        let payload: TokenResponse = response
            .json()
            .await
            .map_err(|e| LoginError::upstream(format!("failed to parse token response: {e}")))?;

        if let Some(error) = payload.error {
            let description = payload.error_description.unwrap_or_default();
            return Err(LoginError::upstream(format!(
                "provider rejected authorization code: {error} {description}"
            )));
        }

        match payload.access_token {
            Some(token) if !token.is_empty() => Ok(ProviderAccessToken::new(token)),
            _ => Err(LoginError::upstream(
                "token response did not contain an access token",
            )),
        }
    }

    async fn fetch_identity(
        &self,
        token: ProviderAccessToken,
    ) -> Result<VerifiedIdentity, LoginError> {
        let response = self
            .http_client
            .get(&self.user_url)
            .header(AUTHORIZATION, format!("Bearer {}", token.secret()))
            .header(ACCEPT, GITHUB_JSON_MEDIA_TYPE)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(LoginError::upstream(format!(
                "provider rejected access token with status {status}"
            )));
        }
        if !status.is_success() {
            return Err(LoginError::upstream(format!(
                "identity request failed with status {status}"
            )));
        }

        let payload: UserResponse = response
            .json()
            .await
            .map_err(|e| LoginError::upstream(format!("failed to parse identity response: {e}")))?;

        payload.into_identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_user(value: serde_json::Value) -> Result<VerifiedIdentity, LoginError> {
        let response: UserResponse = serde_json::from_value(value).unwrap();
        response.into_identity()
    }

    #[test]
    fn test_numeric_id_normalised_to_string() {
        let identity = parse_user(json!({"id": 42, "login": "octocat"})).unwrap();
        assert_eq!(identity.external_id, "42");
        assert_eq!(identity.login.as_deref(), Some("octocat"));
        assert!(identity.email.is_none());
    }

    #[test]
    fn test_string_id_kept() {
        let identity = parse_user(json!({"id": "MDQ6VXNlcjE="})).unwrap();
        assert_eq!(identity.external_id, "MDQ6VXNlcjE=");
    }

    #[test]
    fn test_unusable_ids_rejected() {
        for id in [json!(null), json!(""), json!({"nested": 1}), json!(true)] {
            let result = parse_user(json!({ "id": id }));
            assert!(matches!(result, Err(LoginError::UpstreamAuth(_))));
        }
    }

    #[test]
    fn test_token_response_error_shape() {
        let payload: TokenResponse = serde_json::from_value(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        }))
        .unwrap();
        assert!(payload.access_token.is_none());
        assert_eq!(payload.error.as_deref(), Some("bad_verification_code"));
    }
}
