//! Token issuer: mints access and refresh tokens for a verified identity

use super::{
    jwt, AccessToken, CookieDescriptor, RefreshToken, TokenClaims, TokenError, TokenKind,
};
use crate::login::LoginError;
use crate::oauth::VerifiedIdentity;
use crate::settings::{ConfigurationError, TokenSettings};
use chrono::{DateTime, Duration, Utc};

/// Mints and verifies platform tokens
pub trait TokenIssuer: Send + Sync {
    /// Mint a short-lived access token whose subject is the external id
    ///
    /// # Errors
    ///
    /// Returns `LoginError::Configuration` if the token cannot be signed.
    fn generate_access_token(&self, identity: &VerifiedIdentity)
        -> Result<AccessToken, LoginError>;

    /// Mint a long-lived refresh token whose subject is the external id
    ///
    /// # Errors
    ///
    /// Returns `LoginError::Configuration` if the token cannot be signed.
    fn generate_refresh_token(
        &self,
        identity: &VerifiedIdentity,
    ) -> Result<RefreshToken, LoginError>;

    /// Package a refresh token as the browser cookie it travels in
    fn wrap_refresh_token_as_cookie(&self, token: &RefreshToken) -> CookieDescriptor;

    /// Verify signature, issuer, expiry and kind of a presented token
    ///
    /// # Errors
    ///
    /// Returns a `TokenError` describing the first failed check.
    fn verify(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, TokenError>;
}

/// `TokenIssuer` signing HS256 JWTs with a shared secret
#[derive(Clone)]
pub struct JwtTokenIssuer {
    signing_secret: Vec<u8>,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtTokenIssuer {
    /// Create an issuer from validated token settings
    ///
    /// # Errors
    ///
    /// Returns an error if the signing secret is missing or too short, or the
    /// TTLs are not `0 < access < refresh`.
    pub fn new(settings: &TokenSettings) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        let access_ttl = ttl(
            "tokens.access_token_ttl_seconds",
            settings.access_token_ttl_seconds,
        )?;
        let refresh_ttl = ttl(
            "tokens.refresh_token_ttl_seconds",
            settings.refresh_token_ttl_seconds,
        )?;
        Ok(Self {
            signing_secret: settings.signing_secret.as_bytes().to_vec(),
            issuer: settings.issuer.clone(),
            access_ttl,
            refresh_ttl,
        })
    }

    #[must_use]
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    #[must_use]
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    fn claims_at(
        &self,
        identity: &VerifiedIdentity,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> TokenClaims {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        TokenClaims {
            iss: self.issuer.clone(),
            sub: identity.external_id.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            typ: kind,
        }
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String, LoginError> {
        jwt::encode(claims, &self.signing_secret).map_err(|e| {
            LoginError::Configuration(format!("failed to sign {} token: {e}", claims.typ))
        })
    }

    /// Mint an access token as of `now`
    ///
    /// # Errors
    ///
    /// Returns `LoginError::Configuration` if signing fails.
    pub fn generate_access_token_at(
        &self,
        identity: &VerifiedIdentity,
        now: DateTime<Utc>,
    ) -> Result<AccessToken, LoginError> {
        let claims = self.claims_at(identity, TokenKind::Access, now);
        Ok(AccessToken::new(self.sign(&claims)?, now + self.access_ttl))
    }

    /// Mint a refresh token as of `now`
    ///
    /// # Errors
    ///
    /// Returns `LoginError::Configuration` if signing fails.
    pub fn generate_refresh_token_at(
        &self,
        identity: &VerifiedIdentity,
        now: DateTime<Utc>,
    ) -> Result<RefreshToken, LoginError> {
        let claims = self.claims_at(identity, TokenKind::Refresh, now);
        Ok(RefreshToken::new(self.sign(&claims)?, now + self.refresh_ttl))
    }

    /// Verify a token as of `now`
    ///
    /// # Errors
    ///
    /// Returns a `TokenError` describing the first failed check.
    pub fn verify_at(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, TokenError> {
        let claims: TokenClaims = jwt::decode(token, &self.signing_secret)?;
        if claims.iss != self.issuer {
            return Err(TokenError::WrongIssuer(claims.iss));
        }
        if claims.typ != expected {
            return Err(TokenError::WrongKind {
                expected,
                found: claims.typ,
            });
        }
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn generate_access_token(
        &self,
        identity: &VerifiedIdentity,
    ) -> Result<AccessToken, LoginError> {
        self.generate_access_token_at(identity, Utc::now())
    }

    fn generate_refresh_token(
        &self,
        identity: &VerifiedIdentity,
    ) -> Result<RefreshToken, LoginError> {
        self.generate_refresh_token_at(identity, Utc::now())
    }

    fn wrap_refresh_token_as_cookie(&self, token: &RefreshToken) -> CookieDescriptor {
        CookieDescriptor::refresh_token(token.as_str(), self.refresh_ttl.num_seconds())
    }

    fn verify(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, expected, Utc::now())
    }
}

fn ttl(name: &'static str, seconds: u64) -> Result<Duration, ConfigurationError> {
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| ConfigurationError::Invalid {
            name,
            reason: "out of range".to_string(),
        })
}
