//! Login service: authorization code in, platform credentials out
//!
//! One call walks the stages below and stops at the first failure:
//!
//! 1. `AwaitingCode` - reject blank codes before touching the network
//! 2. `ExchangingToken` - code -> provider access token
//! 3. `FetchingIdentity` - provider access token -> verified identity
//! 4. `Issuing` - mint both tokens while reconciling the local user
//! 5. `Complete` - assemble the result
//!
//! Nothing is retried: codes and provider tokens are single-use, so the
//! caller recovers by starting a fresh login.
//!
//! Reconciliation runs on its own task and is awaited for at most
//! `reconcile_timeout`. An error, panic or timeout there is logged and the
//! login still completes.

use super::LoginError;
use crate::oauth::{
    build_authorize_url, AuthorizationCode, GitHubGateway, ProviderGateway, VerifiedIdentity,
};
use crate::settings::PassgateSettings;
use crate::tokens::{
    AccessToken, CookieDescriptor, JwtTokenIssuer, TokenClaims, TokenIssuer, TokenKind,
};
use crate::users::IdentityReconciler;
use crate::utils::logging::LoggingHelper;
use anyhow::anyhow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How long a login waits for user reconciliation before returning anyway
pub const DEFAULT_RECONCILE_TIMEOUT: Duration = Duration::from_secs(2);

/// Stages of a single login call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    AwaitingCode,
    ExchangingToken,
    FetchingIdentity,
    Issuing,
    Complete,
}

impl fmt::Display for LoginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoginStage::AwaitingCode => "awaiting_code",
            LoginStage::ExchangingToken => "exchanging_token",
            LoginStage::FetchingIdentity => "fetching_identity",
            LoginStage::Issuing => "issuing",
            LoginStage::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// What a successful login hands back to the HTTP layer
///
/// The refresh token is only reachable through the cookie descriptor.
#[derive(Debug, Clone)]
pub struct LoginResult {
    access_token: AccessToken,
    refresh_cookie: CookieDescriptor,
}

impl LoginResult {
    #[must_use]
    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    #[must_use]
    pub fn refresh_cookie(&self) -> &CookieDescriptor {
        &self.refresh_cookie
    }

    #[must_use]
    pub fn into_parts(self) -> (AccessToken, CookieDescriptor) {
        (self.access_token, self.refresh_cookie)
    }
}

/// Login orchestrator
///
/// Holds only shared, immutable collaborators, so concurrent logins need
/// no coordination.
#[derive(Clone)]
pub struct LoginService {
    gateway: Arc<dyn ProviderGateway>,
    issuer: Arc<dyn TokenIssuer>,
    reconciler: Arc<dyn IdentityReconciler>,
    authorize_url: String,
    reconcile_timeout: Duration,
}

impl LoginService {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn ProviderGateway>,
        issuer: Arc<dyn TokenIssuer>,
        reconciler: Arc<dyn IdentityReconciler>,
        authorize_url: String,
    ) -> Self {
        Self {
            gateway,
            issuer,
            reconciler,
            authorize_url,
            reconcile_timeout: DEFAULT_RECONCILE_TIMEOUT,
        }
    }

    /// Override how long a login waits for reconciliation
    #[must_use]
    pub fn with_reconcile_timeout(mut self, timeout: Duration) -> Self {
        self.reconcile_timeout = timeout;
        self
    }

    /// Wire the GitHub gateway and JWT issuer from validated settings
    ///
    /// # Errors
    ///
    /// Returns `LoginError::Configuration` if any required setting is missing
    /// or invalid. This is meant to run once at startup.
    pub fn from_settings(
        settings: &PassgateSettings,
        reconciler: Arc<dyn IdentityReconciler>,
    ) -> Result<Self, LoginError> {
        settings.validate()?;
        let gateway = GitHubGateway::new(&settings.github)?;
        let issuer = JwtTokenIssuer::new(&settings.tokens)?;

        LoggingHelper::log_provider_configured(
            &settings.github.token_url,
            &settings.github.user_url,
            settings.github.request_timeout_seconds,
        );

        let authorize_url = build_authorize_url(
            &settings.github.authorize_url,
            &settings.github.client_id,
            &settings.github.redirect_uri,
        );
        Ok(Self::new(
            Arc::new(gateway),
            Arc::new(issuer),
            reconciler,
            authorize_url,
        ))
    }

    /// URL that starts the GitHub consent flow
    #[must_use]
    pub fn authorize_url(&self) -> &str {
        &self.authorize_url
    }

    /// Run the full login pipeline for one authorization code
    ///
    /// # Errors
    ///
    /// - `LoginError::UpstreamAuth` if the code is blank or either GitHub
    ///   exchange fails
    /// - `LoginError::Configuration` if the tokens cannot be signed
    ///
    /// A failure to reconcile the local user is logged and does not fail
    /// the login.
    pub async fn login(&self, code: &str) -> Result<LoginResult, LoginError> {
        let correlation_id = uuid::Uuid::new_v4().to_string();
        LoggingHelper::log_login_start(&correlation_id);

        let code = AuthorizationCode::new(code);
        if code.is_blank() {
            let err = LoginError::upstream("authorization code is empty");
            LoggingHelper::log_step_failed(&correlation_id, &LoginStage::AwaitingCode, &err);
            return Err(err);
        }

        LoggingHelper::log_token_exchange_start(&correlation_id);
        let provider_token = self
            .gateway
            .exchange_code_for_token(code)
            .await
            .inspect_err(|e| {
                LoggingHelper::log_step_failed(&correlation_id, &LoginStage::ExchangingToken, e);
            })?;

        LoggingHelper::log_identity_fetch_start(&correlation_id);
        let identity = self
            .gateway
            .fetch_identity(provider_token)
            .await
            .inspect_err(|e| {
                LoggingHelper::log_step_failed(&correlation_id, &LoginStage::FetchingIdentity, e);
            })?;
        LoggingHelper::log_identity_verified(&correlation_id, &identity.external_id);

        let reconciliation = self.spawn_reconciliation(&identity);

        let (access_token, refresh_cookie) = self.mint(&identity).inspect_err(|e| {
            LoggingHelper::log_step_failed(&correlation_id, &LoginStage::Issuing, e);
        })?;

        self.await_reconciliation(reconciliation, &correlation_id, &identity.external_id).await;

        LoggingHelper::log_tokens_issued(
            &correlation_id,
            &LoginStage::Complete,
            &identity.external_id,
        );
        Ok(LoginResult {
            access_token,
            refresh_cookie,
        })
    }

    fn spawn_reconciliation(&self, identity: &VerifiedIdentity) -> JoinHandle<anyhow::Result<()>> {
        let reconciler = Arc::clone(&self.reconciler);
        let identity = identity.clone();
        tokio::spawn(async move { reconciler.ensure_user_exists(&identity).await })
    }

    /// Wait for reconciliation up to the timeout; a task still running
    /// afterwards is left detached
    async fn await_reconciliation(
        &self,
        handle: JoinHandle<anyhow::Result<()>>,
        correlation_id: &str,
        external_id: &str,
    ) {
        let failure = match tokio::time::timeout(self.reconcile_timeout, handle).await {
            Ok(Ok(Ok(()))) => return,
            Ok(Ok(Err(e))) => e,
            Ok(Err(join_error)) => anyhow!("reconciliation task failed: {join_error}"),
            Err(_) => anyhow!(
                "reconciliation still running after {}ms",
                self.reconcile_timeout.as_millis()
            ),
        };
        LoggingHelper::log_reconcile_failed(correlation_id, external_id, &failure);
    }

    fn mint(
        &self,
        identity: &VerifiedIdentity,
    ) -> Result<(AccessToken, CookieDescriptor), LoginError> {
        let access_token = self.issuer.generate_access_token(identity)?;
        let refresh_token = self.issuer.generate_refresh_token(identity)?;
        let refresh_cookie = self.issuer.wrap_refresh_token_as_cookie(&refresh_token);
        Ok((access_token, refresh_cookie))
    }

    /// Mint a new access token for the subject of a valid refresh token
    ///
    /// The refresh token itself is not rotated; it stays valid until it
    /// expires.
    ///
    /// # Errors
    ///
    /// Returns `LoginError::InvalidToken` if the refresh token does not verify.
    pub fn refresh(&self, refresh_token: &str) -> Result<AccessToken, LoginError> {
        let claims = self.issuer.verify(refresh_token, TokenKind::Refresh)?;
        let access_token = self
            .issuer
            .generate_access_token(&VerifiedIdentity::new(claims.sub.clone()))?;
        LoggingHelper::log_token_refreshed(&claims.sub);
        Ok(access_token)
    }

    /// Verify an access token presented to a platform service
    ///
    /// # Errors
    ///
    /// Returns `LoginError::InvalidToken` if the token does not verify.
    pub fn verify_access_token(&self, access_token: &str) -> Result<TokenClaims, LoginError> {
        Ok(self.issuer.verify(access_token, TokenKind::Access)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::constants::TEST_EXTERNAL_ID;
    use crate::testing::fixtures::TestFixtures;
    use crate::testing::mock::{
        CountingTokenIssuer, FailingReconciler, FakeProviderGateway, HangingReconciler,
        IdentityReply, PanickingReconciler, TokenReply,
    };
    use crate::users::InMemoryUserStore;

    struct Harness {
        gateway: Arc<FakeProviderGateway>,
        issuer: Arc<CountingTokenIssuer>,
        store: Arc<InMemoryUserStore>,
        service: LoginService,
    }

    fn harness(gateway: FakeProviderGateway) -> Harness {
        let gateway = Arc::new(gateway);
        let issuer = Arc::new(CountingTokenIssuer::new(TestFixtures::token_issuer()));
        let store = Arc::new(InMemoryUserStore::new());
        let service = LoginService::new(
            gateway.clone(),
            issuer.clone(),
            store.clone(),
            TestFixtures::authorize_url(),
        );
        Harness {
            gateway,
            issuer,
            store,
            service,
        }
    }

    #[tokio::test]
    async fn test_login_binds_both_tokens_to_same_subject() {
        let h = harness(FakeProviderGateway::succeeding("ghp_xyz", TEST_EXTERNAL_ID));

        let result = h.service.login("abc123").await.unwrap();

        let access = h.service.verify_access_token(result.access_token().as_str()).unwrap();
        let refresh = h
            .issuer
            .verify(result.refresh_cookie().value(), TokenKind::Refresh)
            .unwrap();
        assert_eq!(access.sub, TEST_EXTERNAL_ID);
        assert_eq!(refresh.sub, access.sub);
        assert_eq!(result.refresh_cookie().name(), "refresh-token");
        assert_eq!(result.refresh_cookie().max_age_seconds(), 1_209_600);
    }

    #[tokio::test]
    async fn test_identity_step_receives_token_from_same_call() {
        let h = harness(FakeProviderGateway::succeeding("ghp_xyz", TEST_EXTERNAL_ID));

        h.service.login("abc123").await.unwrap();

        assert_eq!(h.gateway.received_codes(), vec!["abc123".to_string()]);
        assert_eq!(h.gateway.received_tokens(), vec!["ghp_xyz".to_string()]);
    }

    #[tokio::test]
    async fn test_rejected_code_never_fetches_identity() {
        let h = harness(FakeProviderGateway::new(
            TokenReply::Reject,
            IdentityReply::Identity(VerifiedIdentity::new(TEST_EXTERNAL_ID)),
        ));

        let err = h.service.login("abc123").await.unwrap_err();

        assert!(matches!(err, LoginError::UpstreamAuth(_)));
        assert_eq!(h.gateway.exchange_calls(), 1);
        assert_eq!(h.gateway.identity_calls(), 0);
        assert_eq!(h.issuer.total_calls(), 0);
        assert_eq!(h.store.user_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_identity_failure_mints_nothing() {
        let h = harness(FakeProviderGateway::new(
            TokenReply::Token("ghp_xyz".to_string()),
            IdentityReply::Reject,
        ));

        let err = h.service.login("abc123").await.unwrap_err();

        assert!(matches!(err, LoginError::UpstreamAuth(_)));
        assert_eq!(h.gateway.identity_calls(), 1);
        assert_eq!(h.issuer.total_calls(), 0);
        assert_eq!(h.store.user_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_blank_code_short_circuits() {
        let h = harness(FakeProviderGateway::succeeding("ghp_xyz", TEST_EXTERNAL_ID));

        let err = h.service.login("   ").await.unwrap_err();

        assert!(matches!(err, LoginError::UpstreamAuth(_)));
        assert_eq!(h.gateway.exchange_calls(), 0);
    }

    #[tokio::test]
    async fn test_reconciler_failure_does_not_abort_login() {
        let gateway = Arc::new(FakeProviderGateway::succeeding("ghp_xyz", TEST_EXTERNAL_ID));
        let reconciler = Arc::new(FailingReconciler::default());
        let service = LoginService::new(
            gateway,
            Arc::new(TestFixtures::token_issuer()),
            reconciler.clone(),
            TestFixtures::authorize_url(),
        );

        let result = service.login("abc123").await.unwrap();

        assert_eq!(reconciler.calls(), 1);
        let claims = service
            .verify_access_token(result.access_token().as_str())
            .unwrap();
        assert_eq!(claims.sub, TEST_EXTERNAL_ID);
    }

    fn service_with_reconciler(reconciler: Arc<dyn IdentityReconciler>) -> LoginService {
        LoginService::new(
            Arc::new(FakeProviderGateway::succeeding("ghp_xyz", TEST_EXTERNAL_ID)),
            Arc::new(TestFixtures::token_issuer()),
            reconciler,
            TestFixtures::authorize_url(),
        )
        .with_reconcile_timeout(Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_hung_reconciler_does_not_hold_back_login() {
        let service = service_with_reconciler(Arc::new(HangingReconciler));

        let result = tokio::time::timeout(Duration::from_secs(2), service.login("abc123"))
            .await
            .expect("login returns while reconciliation is still pending")
            .unwrap();

        let claims = service
            .verify_access_token(result.access_token().as_str())
            .unwrap();
        assert_eq!(claims.sub, TEST_EXTERNAL_ID);
    }

    #[tokio::test]
    async fn test_reconciler_panic_does_not_abort_login() {
        let service = service_with_reconciler(Arc::new(PanickingReconciler));

        let login = tokio::spawn(async move { service.login("abc123").await });
        let result = login.await.expect("login task must not panic");

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_repeat_login_reconciles_once() {
        let h = harness(FakeProviderGateway::succeeding("ghp_xyz", TEST_EXTERNAL_ID));

        h.service.login("first-code").await.unwrap();
        let second = h.service.login("second-code").await;

        assert!(second.is_ok());
        assert_eq!(h.store.user_count().unwrap(), 1);
        assert_eq!(h.gateway.exchange_calls(), 2);
    }

    #[tokio::test]
    async fn test_refresh_mints_access_token_for_same_subject() {
        let h = harness(FakeProviderGateway::succeeding("ghp_xyz", TEST_EXTERNAL_ID));
        let result = h.service.login("abc123").await.unwrap();

        let renewed = h.service.refresh(result.refresh_cookie().value()).unwrap();

        let claims = h.service.verify_access_token(renewed.as_str()).unwrap();
        assert_eq!(claims.sub, TEST_EXTERNAL_ID);
    }

    #[tokio::test]
    async fn test_access_token_cannot_be_used_to_refresh() {
        let h = harness(FakeProviderGateway::succeeding("ghp_xyz", TEST_EXTERNAL_ID));
        let result = h.service.login("abc123").await.unwrap();

        let err = h.service.refresh(result.access_token().as_str()).unwrap_err();
        assert!(matches!(err, LoginError::InvalidToken(_)));
    }

    #[test]
    fn test_from_settings_rejects_missing_secret() {
        let mut settings = TestFixtures::settings();
        settings.github.client_secret = String::new();

        let result = LoginService::from_settings(&settings, Arc::new(InMemoryUserStore::new()));
        assert!(matches!(result, Err(LoginError::Configuration(_))));
    }

    #[test]
    fn test_from_settings_builds_authorize_url() {
        let service = LoginService::from_settings(
            &TestFixtures::settings(),
            Arc::new(InMemoryUserStore::new()),
        )
        .unwrap();
        assert_eq!(service.authorize_url(), TestFixtures::authorize_url());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(LoginStage::ExchangingToken.to_string(), "exchanging_token");
        assert_eq!(LoginStage::Complete.to_string(), "complete");
    }
}
