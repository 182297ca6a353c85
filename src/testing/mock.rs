//! Fake collaborators for exercising the login pipeline without GitHub

use super::constants::TEST_LOGIN;
use crate::login::LoginError;
use crate::oauth::{AuthorizationCode, ProviderAccessToken, ProviderGateway, VerifiedIdentity};
use crate::tokens::{
    AccessToken, CookieDescriptor, JwtTokenIssuer, RefreshToken, TokenClaims, TokenError,
    TokenIssuer, TokenKind,
};
use crate::users::IdentityReconciler;
use anyhow::anyhow;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Scripted reply of the code exchange
#[derive(Debug, Clone)]
pub enum TokenReply {
    Token(String),
    Reject,
}

/// Scripted reply of the identity fetch
#[derive(Debug, Clone)]
pub enum IdentityReply {
    Identity(VerifiedIdentity),
    Reject,
}

/// `ProviderGateway` with scripted replies that records what it was given
pub struct FakeProviderGateway {
    token_reply: TokenReply,
    identity_reply: IdentityReply,
    exchange_calls: AtomicUsize,
    identity_calls: AtomicUsize,
    received_codes: Mutex<Vec<String>>,
    received_tokens: Mutex<Vec<String>>,
}

impl FakeProviderGateway {
    #[must_use]
    pub fn new(token_reply: TokenReply, identity_reply: IdentityReply) -> Self {
        Self {
            token_reply,
            identity_reply,
            exchange_calls: AtomicUsize::new(0),
            identity_calls: AtomicUsize::new(0),
            received_codes: Mutex::new(Vec::new()),
            received_tokens: Mutex::new(Vec::new()),
        }
    }

    /// Gateway where both exchanges succeed
    #[must_use]
    pub fn succeeding(provider_token: &str, external_id: &str) -> Self {
        Self::new(
            TokenReply::Token(provider_token.to_string()),
            IdentityReply::Identity(VerifiedIdentity::new(external_id).with_login(TEST_LOGIN)),
        )
    }

    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn identity_calls(&self) -> usize {
        self.identity_calls.load(Ordering::SeqCst)
    }

    /// Codes passed to the exchange, in call order
    pub fn received_codes(&self) -> Vec<String> {
        self.received_codes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Provider tokens passed to the identity fetch, in call order
    pub fn received_tokens(&self) -> Vec<String> {
        self.received_tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ProviderGateway for FakeProviderGateway {
    async fn exchange_code_for_token(
        &self,
        code: AuthorizationCode,
    ) -> Result<ProviderAccessToken, LoginError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.received_codes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(code.as_str().to_string());

        match &self.token_reply {
            TokenReply::Token(token) => Ok(ProviderAccessToken::new(token.clone())),
            TokenReply::Reject => Err(LoginError::upstream("bad_verification_code")),
        }
    }

    async fn fetch_identity(
        &self,
        token: ProviderAccessToken,
    ) -> Result<VerifiedIdentity, LoginError> {
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        self.received_tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(token.secret().to_string());

        match &self.identity_reply {
            IdentityReply::Identity(identity) => Ok(identity.clone()),
            IdentityReply::Reject => Err(LoginError::upstream("Bad credentials")),
        }
    }
}

/// `TokenIssuer` that delegates to a real issuer and counts minting calls
pub struct CountingTokenIssuer {
    inner: JwtTokenIssuer,
    access_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    cookie_calls: AtomicUsize,
}

impl CountingTokenIssuer {
    #[must_use]
    pub fn new(inner: JwtTokenIssuer) -> Self {
        Self {
            inner,
            access_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            cookie_calls: AtomicUsize::new(0),
        }
    }

    pub fn access_calls(&self) -> usize {
        self.access_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Every minting or packaging call; verification is not counted
    pub fn total_calls(&self) -> usize {
        self.access_calls() + self.refresh_calls() + self.cookie_calls.load(Ordering::SeqCst)
    }
}

impl TokenIssuer for CountingTokenIssuer {
    fn generate_access_token(
        &self,
        identity: &VerifiedIdentity,
    ) -> Result<AccessToken, LoginError> {
        self.access_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.generate_access_token(identity)
    }

    fn generate_refresh_token(
        &self,
        identity: &VerifiedIdentity,
    ) -> Result<RefreshToken, LoginError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.generate_refresh_token(identity)
    }

    fn wrap_refresh_token_as_cookie(&self, token: &RefreshToken) -> CookieDescriptor {
        self.cookie_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.wrap_refresh_token_as_cookie(token)
    }

    fn verify(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, TokenError> {
        self.inner.verify(token, expected)
    }
}

/// Reconciler whose backing store is always unreachable
#[derive(Debug, Default)]
pub struct FailingReconciler {
    calls: AtomicUsize,
}

impl FailingReconciler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityReconciler for FailingReconciler {
    async fn ensure_user_exists(&self, _identity: &VerifiedIdentity) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("user store unavailable"))
    }
}

/// Reconciler whose backing store never answers
#[derive(Debug, Default)]
pub struct HangingReconciler;

#[async_trait]
impl IdentityReconciler for HangingReconciler {
    async fn ensure_user_exists(&self, _identity: &VerifiedIdentity) -> anyhow::Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Reconciler that panics mid-call
#[derive(Debug, Default)]
pub struct PanickingReconciler;

#[async_trait]
impl IdentityReconciler for PanickingReconciler {
    async fn ensure_user_exists(&self, identity: &VerifiedIdentity) -> anyhow::Result<()> {
        panic!("user store crashed while reconciling {}", identity.external_id);
    }
}
