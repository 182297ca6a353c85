//! Test support for passgate
//!
//! - [`fixtures`] - valid settings, issuers and services wired for tests
//! - [`mock`] - fake gateway, counting issuer and failing reconciler
//!
//! ```rust
//! use passgate::testing::{fixtures::TestFixtures, mock::FakeProviderGateway};
//!
//! let gateway = FakeProviderGateway::succeeding("ghp_xyz", "42");
//! let settings = TestFixtures::settings();
//! assert!(settings.validate().is_ok());
//! assert_eq!(gateway.exchange_calls(), 0);
//! ```

pub mod fixtures;
pub mod mock;

pub use fixtures::TestFixtures;
pub use mock::{
    CountingTokenIssuer, FailingReconciler, FakeProviderGateway, HangingReconciler,
    PanickingReconciler,
};

/// Common test constants
pub mod constants {
    /// OAuth app client id used by fixture settings
    pub const TEST_CLIENT_ID: &str = "Iv1.test-client-id";

    /// OAuth app client secret used by fixture settings
    pub const TEST_CLIENT_SECRET: &str = "test-client-secret";

    /// Redirect URI registered for the fixture OAuth app
    pub const TEST_REDIRECT_URI: &str = "https://app.example.com/login-process";

    /// HMAC signing secret (256 bits)
    pub const TEST_SIGNING_SECRET: &str = "test_key_32_bytes_long_for_test_";

    /// Issuer claim of fixture tokens
    pub const TEST_ISSUER: &str = "passgate-test";

    /// GitHub user id returned by fakes
    pub const TEST_EXTERNAL_ID: &str = "42";

    /// GitHub login returned by fakes
    pub const TEST_LOGIN: &str = "octocat";
}
