//! Identity reconciliation
//!
//! The login pipeline only needs one guarantee from user persistence: a
//! local record exists for every external identity that has logged in.
//! Real storage implements [`IdentityReconciler`]; [`InMemoryUserStore`] is
//! the bundled implementation used by the server binary and in tests.

use crate::oauth::VerifiedIdentity;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// Create-if-absent contract consumed by the login pipeline
#[async_trait]
pub trait IdentityReconciler: Send + Sync {
    /// Ensure a local record exists for this identity
    ///
    /// Must be idempotent: a second call with the same identity is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be reached. The login
    /// pipeline logs it and carries on.
    async fn ensure_user_exists(&self, identity: &VerifiedIdentity) -> Result<()>;
}

/// Local user record keyed by external id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub external_id: String,
    pub login: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a user by external id
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn find(&self, external_id: &str) -> Result<Option<UserRecord>> {
        let users = self
            .users
            .read()
            .map_err(|_| anyhow!("user store lock poisoned"))?;
        Ok(users.get(external_id).cloned())
    }

    /// Number of distinct users recorded
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn user_count(&self) -> Result<usize> {
        let users = self
            .users
            .read()
            .map_err(|_| anyhow!("user store lock poisoned"))?;
        Ok(users.len())
    }
}

#[async_trait]
impl IdentityReconciler for InMemoryUserStore {
    async fn ensure_user_exists(&self, identity: &VerifiedIdentity) -> Result<()> {
        let mut users = self
            .users
            .write()
            .map_err(|_| anyhow!("user store lock poisoned"))?;

        if users.contains_key(&identity.external_id) {
            return Ok(());
        }

        log::info!("Creating local user for external id {}", identity.external_id);
        users.insert(
            identity.external_id.clone(),
            UserRecord {
                external_id: identity.external_id.clone(),
                login: identity.login.clone(),
                created_at: Utc::now(),
            },
        );
        Ok(())
    }
}
