#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the passgate application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod handlers;
pub mod login;
pub mod oauth;
pub mod settings;
pub mod testing;
pub mod tokens;
pub mod users;
pub mod utils;

/// Re-export commonly used items
pub use handlers::configure_services;
pub use login::{LoginError, LoginResult, LoginService};
pub use oauth::{GitHubGateway, ProviderGateway, VerifiedIdentity};
pub use settings::PassgateSettings;
pub use tokens::{JwtTokenIssuer, TokenIssuer};
pub use users::{IdentityReconciler, InMemoryUserStore};
