use crate::auth::groups::GroupPolicy;
use crate::auth::identity::{IdentityBroker, IdentityError};
use crate::auth::session::SessionStore;
use crate::auth::token::{TokenError, TokenIssuer};
use crate::cache::{create_cache, Cache, CacheBackend, CacheError};
use crate::config::{ConfigError, DeploymentMode, Settings};
use log::warn;
use std::sync::Arc;
use thiserror::Error;

/// Errors that prevent the application state from being built
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to create cache: {0}")]
    Cache(#[from] CacheError),
    #[error("Failed to create token issuer: {0}")]
    Token(#[from] TokenError),
    #[error("Failed to create identity broker: {0}")]
    Identity(#[from] IdentityError),
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub mode: DeploymentMode,
    pub cache: Arc<Cache>,
    pub sessions: SessionStore,
    pub tokens: Arc<TokenIssuer>,
    pub groups: Arc<GroupPolicy>,
    /// Absent only in development deployments without a provider
    pub identity: Option<Arc<IdentityBroker>>,
}

impl AppState {
    /// Build the state for `settings`, creating the configured cache backend
    pub async fn new(settings: Settings, mode: DeploymentMode) -> Result<Self, StateError> {
        let cache = create_cache(&settings.cache).await?;
        Self::with_existing_cache(settings, mode, cache)
    }

    pub fn with_existing_cache(
        settings: Settings,
        mode: DeploymentMode,
        cache: Cache,
    ) -> Result<Self, StateError> {
        let algorithm = settings.token.algorithm()?;
        let tokens = match settings.token.secret() {
            Some(secret) => TokenIssuer::new(secret.as_bytes(), algorithm)?,
            None if mode == DeploymentMode::Development => {
                warn!("SECRET_KEY is not set, tokens are signed with a random per-process key");
                TokenIssuer::ephemeral(algorithm)?
            }
            None => return Err(ConfigError::Missing("SECRET_KEY").into()),
        };

        let identity = match settings.oauth.provider()? {
            Some(endpoints) => Some(Arc::new(IdentityBroker::new(endpoints)?)),
            None if mode == DeploymentMode::Development => {
                warn!("OAuth provider is not configured, login is unavailable");
                None
            }
            None => return Err(ConfigError::Missing("OAUTH_* provider settings").into()),
        };

        let groups = GroupPolicy::from_config(&settings.session)?;

        Ok(Self {
            sessions: SessionStore::new(cache.clone(), settings.session.ttl),
            cache: Arc::new(cache),
            tokens: Arc::new(tokens),
            groups: Arc::new(groups),
            identity,
            mode,
            settings: Arc::new(settings),
        })
    }

    /// Check if all components are healthy
    pub async fn health_check(&self) -> Result<(), String> {
        self.cache.health_check().await
    }
}
