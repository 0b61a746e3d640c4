//! Bearer token signing configuration

use super::ConfigError;
use confique::Config;
use jsonwebtoken::Algorithm;

/// Token signing settings
#[derive(Debug, Config, Clone)]
pub struct TokenConfig {
    /// Shared secret used to sign and verify bearer tokens
    #[config(env = "SECRET_KEY")]
    pub secret_key: Option<String>,

    /// HMAC algorithm name (default: HS256)
    #[config(env = "JWT_ENCRYPTION_ALGORITHM", default = "HS256")]
    pub algorithm: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            algorithm: "HS256".to_string(),
        }
    }
}

impl TokenConfig {
    /// Parse the configured algorithm. Only symmetric HMAC algorithms are
    /// accepted since tokens are verified with the same secret they are
    /// signed with.
    pub fn algorithm(&self) -> Result<Algorithm, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            name: "JWT_ENCRYPTION_ALGORITHM",
            reason,
        };
        let algorithm: Algorithm = self
            .algorithm
            .trim()
            .parse()
            .map_err(|e: jsonwebtoken::errors::Error| invalid(e.to_string()))?;
        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
            other => Err(invalid(format!(
                "{other:?} is not a symmetric algorithm, use HS256, HS384 or HS512"
            ))),
        }
    }

    /// The configured secret, if it is non-empty
    pub fn secret(&self) -> Option<&str> {
        self.secret_key.as_deref().filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_algorithm_is_hs256() {
        assert_eq!(TokenConfig::default().algorithm().unwrap(), Algorithm::HS256);
    }

    #[test]
    fn test_hmac_algorithms_are_accepted() {
        for (name, expected) in [("HS384", Algorithm::HS384), (" HS512 ", Algorithm::HS512)] {
            let config = TokenConfig {
                algorithm: name.to_string(),
                ..Default::default()
            };
            assert_eq!(config.algorithm().unwrap(), expected);
        }
    }

    #[test]
    fn test_asymmetric_algorithm_is_rejected() {
        let config = TokenConfig {
            algorithm: "RS256".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.algorithm(),
            Err(ConfigError::Invalid {
                name: "JWT_ENCRYPTION_ALGORITHM",
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_algorithm_is_rejected() {
        let config = TokenConfig {
            algorithm: "rot13".to_string(),
            ..Default::default()
        };
        assert!(config.algorithm().is_err());
    }

    #[test]
    fn test_empty_secret_counts_as_missing() {
        let config = TokenConfig {
            secret_key: Some(String::new()),
            ..Default::default()
        };
        assert!(config.secret().is_none());
    }
}
