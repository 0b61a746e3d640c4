pub(crate) use crate::config::cache::{CacheConfig, CacheStore};
pub(crate) use crate::config::mode::DeploymentMode;
pub(crate) use crate::config::oauth::{OAuthConfig, ProviderEndpoints};
pub(crate) use crate::config::session::{SessionConfig, MAX_SESSION_TTL};
pub(crate) use crate::config::storage::StorageConfig;
pub(crate) use crate::config::token::TokenConfig;
use confique::Config;
use thiserror::Error;

pub mod cache;
pub mod mode;
pub mod oauth;
pub mod session;
pub mod storage;
pub mod token;

/// Optional TOML file layered under the environment
pub const CONFIG_FILE: &str = "geoapi.toml";

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] confique::Error),
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Incomplete OAuth configuration, missing: {0}")]
    Incomplete(String),
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Main configuration structure for the API server
#[derive(Debug, Config, Clone)]
pub struct Settings {
    /// The port the server will listen to (default: 8000)
    #[config(env = "PORT", default = 8000)]
    pub port: u16,

    /// Raw deployment environment, see [`Settings::deployment_mode`]
    #[config(env = "ENVIRONMENT")]
    pub environment: Option<String>,

    /// Identity provider configuration
    #[config(nested)]
    pub oauth: OAuthConfig,

    /// Token signing configuration
    #[config(nested)]
    pub token: TokenConfig,

    /// Session and group configuration
    #[config(nested)]
    pub session: SessionConfig,

    /// Session store configuration
    #[config(nested)]
    pub cache: CacheConfig,

    /// Database and object storage settings of the data API
    #[config(nested)]
    pub storage: StorageConfig,
}

impl Settings {
    /// Load settings from the environment, falling back to `geoapi.toml`
    /// and then to defaults.
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self::builder().env().file(CONFIG_FILE).load()?)
    }

    /// Resolve the deployment mode and check that everything that mode
    /// requires is configured.
    pub fn deployment_mode(&self) -> Result<DeploymentMode, ConfigError> {
        let mode = DeploymentMode::from_env_value(self.environment.as_deref()).map_err(
            |reason| ConfigError::Invalid {
                name: "ENVIRONMENT",
                reason,
            },
        )?;

        // Checked in every mode so a bad value fails at startup.
        self.token.algorithm()?;
        self.cache.store()?;
        let provider = self.oauth.provider()?;

        if self.session.ttl == 0 || self.session.ttl > MAX_SESSION_TTL {
            return Err(ConfigError::Invalid {
                name: "SESSION_TTL",
                reason: format!("must be between 1 and {MAX_SESSION_TTL} seconds"),
            });
        }
        if self.session.admin_group_id <= 0 {
            return Err(ConfigError::Invalid {
                name: "ADMIN_GROUP_ID",
                reason: format!("group id {} must be positive", self.session.admin_group_id),
            });
        }

        if mode == DeploymentMode::Production {
            if self.token.secret().is_none() {
                return Err(ConfigError::Missing("SECRET_KEY"));
            }
            if provider.is_none() {
                return Err(ConfigError::Missing("OAUTH_* provider settings"));
            }
        }

        Ok(mode)
    }

    #[cfg(test)]
    pub fn for_test_with_mocks(provider_mock: &wiremock::MockServer) -> Self {
        let base = provider_mock.uri();
        Self {
            port: 0, // Let the OS choose a port
            environment: Some("production".to_string()),
            oauth: OAuthConfig {
                redirect_uri: Some("http://localhost:8000/security/callback".to_string()),
                authorization_url: Some(format!("{base}/authorize")),
                token_url: Some(format!("{base}/oauth2/token")),
                userinfo_url: Some(format!("{base}/oauth2/userinfo")),
                client_id: Some("test-client".to_string()),
                client_secret: Some("test-client-secret".to_string()),
                request_timeout: 5,
                ..Default::default()
            },
            token: TokenConfig {
                secret_key: Some("test-secret-key".to_string()),
                ..Default::default()
            },
            session: SessionConfig {
                cookie_secure: false,
                group_members: "1=admin@example.org;7=member@example.org".to_string(),
                ..Default::default()
            },
            cache: CacheConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}
