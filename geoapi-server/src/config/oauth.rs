//! OAuth 2.0 identity provider configuration

use super::ConfigError;
use confique::Config;
use url::Url;

/// Identity provider settings. Every endpoint and credential is optional at
/// load time so development deployments can run without a provider;
/// [`OAuthConfig::provider`] decides whether the set is usable.
#[derive(Debug, Config, Clone)]
pub struct OAuthConfig {
    /// Callback URL registered with the provider
    #[config(env = "REDIRECT_URI")]
    pub redirect_uri: Option<String>,

    /// Provider authorization endpoint
    #[config(env = "OAUTH_AUTHORIZATION_URL")]
    pub authorization_url: Option<String>,

    /// Provider token endpoint
    #[config(env = "OAUTH_TOKEN_URL")]
    pub token_url: Option<String>,

    /// Provider userinfo endpoint
    #[config(env = "OAUTH_USERINFO_URL")]
    pub userinfo_url: Option<String>,

    #[config(env = "OAUTH_CLIENT_ID")]
    pub client_id: Option<String>,

    #[config(env = "OAUTH_CLIENT_SECRET")]
    pub client_secret: Option<String>,

    /// Space-separated scopes requested at login
    #[config(env = "OAUTH_SCOPES", default = "openid email profile org.cilogon.userinfo")]
    pub scopes: String,

    /// Send a PKCE S256 challenge with the authorization request (default: true)
    #[config(env = "OAUTH_USE_PKCE", default = true)]
    pub use_pkce: bool,

    /// Timeout for requests to the provider in seconds (default: 10)
    #[config(env = "OAUTH_REQUEST_TIMEOUT", default = 10)]
    pub request_timeout: u64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            redirect_uri: None,
            authorization_url: None,
            token_url: None,
            userinfo_url: None,
            client_id: None,
            client_secret: None,
            scopes: "openid email profile org.cilogon.userinfo".to_string(),
            use_pkce: true,
            request_timeout: 10,
        }
    }
}

/// A complete, validated provider configuration.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub authorization_url: Url,
    pub token_url: Url,
    pub userinfo_url: Url,
    pub redirect_uri: Url,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
    pub use_pkce: bool,
    pub request_timeout: u64,
}

impl OAuthConfig {
    fn fields(&self) -> [(&'static str, &Option<String>); 6] {
        [
            ("REDIRECT_URI", &self.redirect_uri),
            ("OAUTH_AUTHORIZATION_URL", &self.authorization_url),
            ("OAUTH_TOKEN_URL", &self.token_url),
            ("OAUTH_USERINFO_URL", &self.userinfo_url),
            ("OAUTH_CLIENT_ID", &self.client_id),
            ("OAUTH_CLIENT_SECRET", &self.client_secret),
        ]
    }

    /// Get scopes as a vector
    pub fn get_scopes(&self) -> Vec<String> {
        self.scopes
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Returns `Ok(None)` when nothing is configured, the validated endpoints
    /// when everything is, and an error for a partial or malformed setup.
    pub fn provider(&self) -> Result<Option<ProviderEndpoints>, ConfigError> {
        let fields = self.fields();
        let present =
            |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());

        if fields.iter().all(|(_, value)| !present(*value)) {
            return Ok(None);
        }

        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| !present(*value))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Incomplete(missing.join(", ")));
        }

        let url = |name: &'static str, value: &Option<String>| -> Result<Url, ConfigError> {
            let raw = value.as_deref().unwrap_or_default().trim();
            Url::parse(raw).map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            })
        };

        if self.request_timeout == 0 {
            return Err(ConfigError::Invalid {
                name: "OAUTH_REQUEST_TIMEOUT",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Some(ProviderEndpoints {
            authorization_url: url("OAUTH_AUTHORIZATION_URL", &self.authorization_url)?,
            token_url: url("OAUTH_TOKEN_URL", &self.token_url)?,
            userinfo_url: url("OAUTH_USERINFO_URL", &self.userinfo_url)?,
            redirect_uri: url("REDIRECT_URI", &self.redirect_uri)?,
            client_id: self.client_id.clone().unwrap_or_default(),
            client_secret: self.client_secret.clone().unwrap_or_default(),
            scopes: self.get_scopes(),
            use_pkce: self.use_pkce,
            request_timeout: self.request_timeout,
        }))
    }
}
