// Centralized login logging
//
// Every line carries the per-login correlation id. Authorization codes,
// provider tokens and platform tokens are never logged.
use log::{debug, info, warn};

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log login start
    pub fn log_login_start(correlation_id: &str) {
        info!("[{correlation_id}] Login started");
    }

    /// Log token exchange start
    pub fn log_token_exchange_start(correlation_id: &str) {
        debug!("[{correlation_id}] Exchanging authorization code with GitHub");
    }

    /// Log identity fetch start
    pub fn log_identity_fetch_start(correlation_id: &str) {
        debug!("[{correlation_id}] Fetching GitHub identity");
    }

    /// Log identity verified
    pub fn log_identity_verified(correlation_id: &str, external_id: &str) {
        info!("[{correlation_id}] GitHub identity verified: external id {external_id}");
    }

    /// Log a failed step; the error text never contains credential values
    pub fn log_step_failed(
        correlation_id: &str,
        step: &dyn std::fmt::Display,
        error: &dyn std::fmt::Display,
    ) {
        warn!("[{correlation_id}] Login failed during {step}: {error}");
    }

    /// Log reconciliation failure that did not abort the login
    pub fn log_reconcile_failed(correlation_id: &str, external_id: &str, error: &anyhow::Error) {
        warn!(
            "[{correlation_id}] User reconciliation failed for external id {external_id}, continuing: {error:#}"
        );
    }

    /// Log tokens issued at the final login stage
    pub fn log_tokens_issued(
        correlation_id: &str,
        stage: &dyn std::fmt::Display,
        external_id: &str,
    ) {
        info!(
            "[{correlation_id}] Login {stage}: issued access and refresh tokens for external id {external_id}"
        );
    }

    /// Log access token refreshed
    pub fn log_token_refreshed(external_id: &str) {
        info!("Refreshed access token for external id {external_id}");
    }

    /// Log summary of the provider configuration at startup
    pub fn log_provider_configured(token_url: &str, user_url: &str, timeout_seconds: u64) {
        info!(
            "✅ GitHub OAuth configured (token endpoint: {token_url}, user endpoint: {user_url}, timeout: {timeout_seconds}s)"
        );
    }
}
