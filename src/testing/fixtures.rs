//! Pre-built test objects

use super::constants::{
    TEST_CLIENT_ID, TEST_CLIENT_SECRET, TEST_ISSUER, TEST_REDIRECT_URI, TEST_SIGNING_SECRET,
};
use crate::login::LoginService;
use crate::oauth::{build_authorize_url, ProviderGateway};
use crate::settings::{
    ApplicationSettings, GitHubSettings, LoggingSettings, PassgateSettings, TokenSettings,
    GITHUB_AUTHORIZE_URL,
};
use crate::tokens::JwtTokenIssuer;
use crate::users::InMemoryUserStore;
use std::sync::Arc;

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Settings that pass validation and point at the real GitHub endpoints
    #[must_use]
    pub fn settings() -> PassgateSettings {
        PassgateSettings {
            application: ApplicationSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: "http://localhost:3000".to_string(),
            },
            github: GitHubSettings {
                client_id: TEST_CLIENT_ID.to_string(),
                client_secret: TEST_CLIENT_SECRET.to_string(),
                redirect_uri: TEST_REDIRECT_URI.to_string(),
                ..GitHubSettings::default()
            },
            tokens: TokenSettings {
                signing_secret: TEST_SIGNING_SECRET.to_string(),
                issuer: TEST_ISSUER.to_string(),
                access_token_ttl_seconds: 30 * 60,
                refresh_token_ttl_seconds: 14 * 24 * 60 * 60,
            },
            logging: LoggingSettings::default(),
        }
    }

    /// Settings whose token and user endpoints live under `base_url`
    ///
    /// Paths mirror GitHub's so mock servers can match on them.
    #[must_use]
    pub fn settings_for_provider(base_url: &str) -> PassgateSettings {
        let mut settings = Self::settings();
        let base_url = base_url.trim_end_matches('/');
        settings.github.token_url = format!("{base_url}/login/oauth/access_token");
        settings.github.user_url = format!("{base_url}/user");
        settings.github.request_timeout_seconds = 2;
        settings
    }

    /// Authorize URL matching [`TestFixtures::settings`]
    #[must_use]
    pub fn authorize_url() -> String {
        build_authorize_url(GITHUB_AUTHORIZE_URL, TEST_CLIENT_ID, TEST_REDIRECT_URI)
    }

    /// Issuer built from fixture token settings
    ///
    /// # Panics
    ///
    /// Panics if the fixture token settings stop validating.
    #[must_use]
    pub fn token_issuer() -> JwtTokenIssuer {
        JwtTokenIssuer::new(&Self::settings().tokens).expect("fixture token settings are valid")
    }

    /// Login service over the given gateway, fixture issuer and an empty store
    #[must_use]
    pub fn login_service(gateway: Arc<dyn ProviderGateway>) -> LoginService {
        LoginService::new(
            gateway,
            Arc::new(Self::token_issuer()),
            Arc::new(InMemoryUserStore::new()),
            Self::authorize_url(),
        )
    }
}
