//! Settings consumed by the data API behind this gateway. They are loaded so
//! the whole deployment shares one configuration surface, and reported by the
//! readiness probe.

use confique::Config;

#[derive(Debug, Config, Clone, Default)]
pub struct StorageConfig {
    /// Postgres connection string
    #[config(env = "uri")]
    pub database_uri: Option<String>,

    /// Object storage access key
    #[config(env = "access_key")]
    pub access_key: Option<String>,

    /// Object storage secret key
    #[config(env = "secret_key")]
    pub secret_key: Option<String>,
}

impl StorageConfig {
    pub fn database_configured(&self) -> bool {
        self.database_uri.as_deref().is_some_and(|v| !v.is_empty())
    }

    pub fn object_store_configured(&self) -> bool {
        self.access_key.as_deref().is_some_and(|v| !v.is_empty())
            && self.secret_key.as_deref().is_some_and(|v| !v.is_empty())
    }
}
