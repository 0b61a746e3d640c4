use crate::config::{CacheConfig, CacheStore, ConfigError};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod memory;
pub mod redis;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to serialize value: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to parse value: {0}")]
    Deserialization(String),
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Key/value store holding sessions and pending logins.
///
/// Every entry carries its own time-to-live, so short-lived login state and
/// day-long sessions can share one backend. Implementations must be safe to
/// share between request handlers.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Store a value that expires after `ttl`
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Retrieve a value from the cache
    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError>;

    /// Performs a health check on the cache backend.
    ///
    /// For Redis this pings the server, the in-memory store is always healthy.
    async fn health_check(&self) -> Result<(), String>;

    /// Delete a value from the cache
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Remove a value and return it in one step. When several callers take
    /// the same key concurrently, at most one of them gets the value.
    async fn take<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError>;
}

/// Cache implementation selected at startup from configuration.
///
/// A single worker can use the in-memory store; deployments running several
/// workers behind the proxy need Redis so a session created by one worker is
/// visible to the others.
#[derive(Clone)]
pub enum Cache {
    /// In-memory cache implementation using Moka
    InMemory(memory::InMemoryCache),
    /// Redis-based cache implementation
    Redis(redis::RedisCache),
}

impl Cache {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::InMemory(_) => "in-memory",
            Self::Redis(_) => "redis",
        }
    }
}

#[async_trait::async_trait]
impl CacheBackend for Cache {
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        match self {
            Self::InMemory(cache) => cache.set(key, value, ttl).await,
            Self::Redis(cache) => cache.set(key, value, ttl).await,
        }
    }

    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError> {
        match self {
            Self::InMemory(cache) => cache.get(key).await,
            Self::Redis(cache) => cache.get(key).await,
        }
    }

    async fn health_check(&self) -> Result<(), String> {
        match self {
            Self::InMemory(cache) => cache.health_check().await,
            Self::Redis(cache) => cache.health_check().await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match self {
            Self::InMemory(cache) => cache.delete(key).await,
            Self::Redis(cache) => cache.delete(key).await,
        }
    }

    async fn take<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError> {
        match self {
            Self::InMemory(cache) => cache.take(key).await,
            Self::Redis(cache) => cache.take(key).await,
        }
    }
}

/// Create the cache implementation named by the configuration.
pub async fn create_cache(config: &CacheConfig) -> Result<Cache, CacheError> {
    let store = config
        .store()
        .map_err(|e: ConfigError| CacheError::Config(e.to_string()))?;
    match store {
        CacheStore::InMemory => {
            let cache = memory::InMemoryCache::new(config.memory_capacity)
                .map_err(CacheError::Config)?;
            Ok(Cache::InMemory(cache))
        }
        CacheStore::Redis => {
            if config.redis_url.is_empty() {
                return Err(CacheError::Config(
                    "CACHE_REDIS_URL is required for the Redis cache".to_string(),
                ));
            }
            let cache = redis::RedisCache::new(&config.redis_url)
                .await
                .map_err(CacheError::Config)?;
            Ok(Cache::Redis(cache))
        }
    }
}
