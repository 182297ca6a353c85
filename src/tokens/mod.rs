//! Platform token issuance
//!
//! Access and refresh tokens are self-describing HS256 JWTs. Validating one
//! later needs only the signing secret and the encoded claims; there is no
//! server-side lookup table, which trades instant revocation for being able
//! to verify tokens on any instance.

pub mod cookie;
pub mod issuer;
pub mod jwt;

pub use cookie::{CookieDescriptor, REFRESH_COOKIE_NAME};
pub use issuer::{JwtTokenIssuer, TokenIssuer};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Token verification failures
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("signature mismatch")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("unexpected issuer: {0}")]
    WrongIssuer(String),
    #[error("expected {expected} token, got {found}")]
    WrongKind { expected: TokenKind, found: TokenKind },
    #[error("signing key rejected: {0}")]
    Key(String),
    #[error("claims serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Keeps access and refresh tokens from being interchangeable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// Claims carried by both token kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub iss: String,
    /// External (GitHub) user id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub typ: TokenKind,
}

/// Platform credential returned in the login response body
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Platform credential delivered only inside the refresh cookie
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub(crate) fn new(value: String, expires_at: DateTime<Utc>) -> Self {
        Self { value, expires_at }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl RefreshToken {
    pub(crate) fn new(value: String, expires_at: DateTime<Utc>) -> Self {
        Self { value, expires_at }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
