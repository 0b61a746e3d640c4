use super::ConfigError;
use confique::Config;

/// Specifies which cache store implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStore {
    #[default]
    InMemory,
    Redis,
}

/// Configuration for the session store
#[derive(Debug, Config, Clone)]
pub struct CacheConfig {
    /// Cache store type: "in-memory" (default) or "redis"
    #[config(env = "CACHE_STORE", default = "in-memory")]
    pub store: String,

    /// Maximum in-memory capacity in MiB (default: 128 MiB)
    #[config(env = "CACHE_MEMORY_CAPACITY", default = 128)]
    pub memory_capacity: usize,

    /// Redis connection string
    #[config(env = "CACHE_REDIS_URL", default = "")]
    pub redis_url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            store: "in-memory".to_string(),
            memory_capacity: 128, // 128 MiB
            redis_url: String::new(),
        }
    }
}

impl CacheConfig {
    /// Resolve the configured store type
    pub fn store(&self) -> Result<CacheStore, ConfigError> {
        match self.store.trim().to_ascii_lowercase().as_str() {
            "in-memory" | "memory" => Ok(CacheStore::InMemory),
            "redis" => Ok(CacheStore::Redis),
            other => Err(ConfigError::Invalid {
                name: "CACHE_STORE",
                reason: format!("unknown store '{other}', expected 'in-memory' or 'redis'"),
            }),
        }
    }
}
