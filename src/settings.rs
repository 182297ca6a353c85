use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Default GitHub endpoints
pub const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
pub const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
pub const GITHUB_USER_URL: &str = "https://api.github.com/user";

/// Minimum length of the HMAC signing secret in bytes
pub const MIN_SIGNING_SECRET_LEN: usize = 32;

/// Upper bound for either token TTL (one year)
pub const MAX_TOKEN_TTL_SECONDS: u64 = 366 * 24 * 60 * 60;

/// Startup-fatal configuration problems
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: basic_toml::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PassgateSettings {
    pub application: ApplicationSettings,
    pub github: GitHubSettings,
    pub tokens: TokenSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: String,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    pub client_id: String,
    pub client_secret: String,
    /// Where GitHub sends the browser back after consent
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub user_url: String,
    /// GitHub rejects API calls without a User-Agent header
    pub user_agent: String,
    /// Upper bound for each outbound provider call
    pub request_timeout_seconds: u64,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    pub signing_secret: String,
    pub issuer: String,
    pub access_token_ttl_seconds: u64,
    pub refresh_token_ttl_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

const REDACTED: &str = "<redacted>";

impl fmt::Debug for GitHubSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &REDACTED)
            .field("redirect_uri", &self.redirect_uri)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("user_url", &self.user_url)
            .field("user_agent", &self.user_agent)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("signing_secret", &REDACTED)
            .field("issuer", &self.issuer)
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("refresh_token_ttl_seconds", &self.refresh_token_ttl_seconds)
            .finish()
    }
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: "http://localhost:3000,http://localhost:8080".to_string(),
        }
    }
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            authorize_url: GITHUB_AUTHORIZE_URL.to_string(),
            token_url: GITHUB_TOKEN_URL.to_string(),
            user_url: GITHUB_USER_URL.to_string(),
            user_agent: concat!("passgate/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_seconds: 5,
        }
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            signing_secret: String::new(), // Required, never generated
            issuer: "passgate".to_string(),
            access_token_ttl_seconds: 30 * 60,
            refresh_token_ttl_seconds: 14 * 24 * 60 * 60,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PassgateSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// The logger is initialised from the resulting logging level.
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file exists but cannot be read or parsed.
    /// Missing values are reported by [`PassgateSettings::validate`].
    pub fn load() -> Result<Self, ConfigurationError> {
        Self::load_env_file(Path::new(".env"));

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        Self::init_logger(&settings.logging);
        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `PASSGATE_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    fn load_base_settings() -> Result<Self, ConfigurationError> {
        let mut settings = Self::default();

        let default_config_path = PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(&default_config_path)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(secrets_dir) = std::env::var("PASSGATE_SECRETS_DIR") {
            let secrets_path = Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_file(&secrets_path)?;
                println!("✓ Overriding settings from {}", secrets_path.display());
            } else {
                println!(
                    "ℹ PASSGATE_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a single TOML settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        basic_toml::from_str(&content).map_err(|source| ConfigurationError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_github_env_overrides(&mut settings.github);
        Self::apply_token_env_overrides(&mut settings.tokens);
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            settings.logging.level = log_level;
        }
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        Self::apply_string_env_override("HOST", &mut app_settings.host);
        Self::apply_parsed_env_override("PORT", &mut app_settings.port);
        Self::apply_string_env_override("CORS_ORIGINS", &mut app_settings.cors_origins);
    }

    fn apply_github_env_overrides(github: &mut GitHubSettings) {
        Self::apply_string_env_override("GITHUB_CLIENT_ID", &mut github.client_id);
        Self::apply_string_env_override("GITHUB_CLIENT_SECRET", &mut github.client_secret);
        Self::apply_string_env_override("GITHUB_REDIRECT_URI", &mut github.redirect_uri);
        Self::apply_parsed_env_override(
            "PROVIDER_TIMEOUT_SECONDS",
            &mut github.request_timeout_seconds,
        );
    }

    /// Apply environment overrides for token settings
    pub fn apply_token_env_overrides(tokens: &mut TokenSettings) {
        Self::apply_string_env_override("TOKEN_SIGNING_SECRET", &mut tokens.signing_secret);
        Self::apply_string_env_override("TOKEN_ISSUER", &mut tokens.issuer);
        Self::apply_parsed_env_override(
            "ACCESS_TOKEN_TTL_SECONDS",
            &mut tokens.access_token_ttl_seconds,
        );
        Self::apply_parsed_env_override(
            "REFRESH_TOKEN_TTL_SECONDS",
            &mut tokens.refresh_token_ttl_seconds,
        );
    }

    fn apply_string_env_override(env_var: &str, target: &mut String) {
        if let Ok(value) = std::env::var(env_var) {
            if !value.is_empty() {
                *target = value;
            }
        }
    }

    /// Unparseable values are ignored and the previous value kept
    fn apply_parsed_env_override<T: FromStr>(env_var: &str, target: &mut T) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<T>() {
                *target = value;
            }
        }
    }

    /// Load environment variables from a dotenv-style file
    fn load_env_file(path: &Path) {
        if let Ok(contents) = fs::read_to_string(path) {
            for line in contents.lines() {
                let line = line.trim();
                if line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    fn init_logger(logging: &LoggingSettings) {
        if env_logger::Builder::new()
            .parse_filters(&logging.level)
            .try_init()
            .is_err()
        {
            log::debug!("Logger already initialised, keeping existing configuration");
        }
    }

    /// Check every value the login pipeline needs, once, at startup
    ///
    /// # Errors
    ///
    /// Returns the first missing or invalid setting.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.github.validate()?;
        self.tokens.validate()
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Get CORS origins as a vector of strings
    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl GitHubSettings {
    /// # Errors
    ///
    /// Returns an error if client credentials or the redirect URI are missing,
    /// or an endpoint is not an absolute URL.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        require("github.client_id", &self.client_id)?;
        require("github.client_secret", &self.client_secret)?;
        require("github.redirect_uri", &self.redirect_uri)?;

        for (name, value) in [
            ("github.redirect_uri", &self.redirect_uri),
            ("github.authorize_url", &self.authorize_url),
            ("github.token_url", &self.token_url),
            ("github.user_url", &self.user_url),
        ] {
            url::Url::parse(value).map_err(|e| ConfigurationError::Invalid {
                name,
                reason: e.to_string(),
            })?;
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigurationError::Invalid {
                name: "github.request_timeout_seconds",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl TokenSettings {
    /// # Errors
    ///
    /// Returns an error if the signing secret is missing or too short, or the
    /// access TTL is not strictly shorter than the refresh TTL.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        require("tokens.signing_secret", &self.signing_secret)?;
        if self.signing_secret.len() < MIN_SIGNING_SECRET_LEN {
            return Err(ConfigurationError::Invalid {
                name: "tokens.signing_secret",
                reason: format!("must be at least {MIN_SIGNING_SECRET_LEN} bytes"),
            });
        }
        if self.access_token_ttl_seconds == 0 {
            return Err(ConfigurationError::Invalid {
                name: "tokens.access_token_ttl_seconds",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.access_token_ttl_seconds >= self.refresh_token_ttl_seconds {
            return Err(ConfigurationError::Invalid {
                name: "tokens.refresh_token_ttl_seconds",
                reason: format!(
                    "must be longer than the access token TTL ({}s)",
                    self.access_token_ttl_seconds
                ),
            });
        }
        if self.refresh_token_ttl_seconds > MAX_TOKEN_TTL_SECONDS {
            return Err(ConfigurationError::Invalid {
                name: "tokens.refresh_token_ttl_seconds",
                reason: format!("must not exceed {MAX_TOKEN_TTL_SECONDS}s"),
            });
        }
        Ok(())
    }
}

fn require(name: &'static str, value: &str) -> Result<(), ConfigurationError> {
    if value.trim().is_empty() {
        Err(ConfigurationError::Missing(name))
    } else {
        Ok(())
    }
}
