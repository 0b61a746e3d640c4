//! Deployment mode selected by `ENVIRONMENT`

use std::fmt;
use std::str::FromStr;

/// How the service is deployed.
///
/// Parsed once at startup and carried in the application state. Only
/// [`DeploymentMode::Development`] lets requests through without
/// authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeploymentMode {
    #[default]
    Production,
    Development,
}

impl DeploymentMode {
    /// Resolve the mode from the raw `ENVIRONMENT` value. Unset means production.
    pub fn from_env_value(value: Option<&str>) -> Result<Self, String> {
        match value.map(str::trim) {
            None | Some("") => Ok(Self::Production),
            Some(raw) => raw.parse(),
        }
    }

    pub fn bypasses_authentication(self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }
}

impl FromStr for DeploymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            other => Err(format!(
                "unknown ENVIRONMENT '{other}', expected 'production' or 'development'"
            )),
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_environment_is_production() {
        assert_eq!(
            DeploymentMode::from_env_value(None).unwrap(),
            DeploymentMode::Production
        );
        assert_eq!(
            DeploymentMode::from_env_value(Some("  ")).unwrap(),
            DeploymentMode::Production
        );
    }

    #[test]
    fn test_development_values() {
        for value in ["development", "dev", "DEVELOPMENT", " Dev "] {
            let mode = DeploymentMode::from_env_value(Some(value)).unwrap();
            assert_eq!(mode, DeploymentMode::Development, "value: {value:?}");
            assert!(mode.bypasses_authentication());
        }
    }

    #[test]
    fn test_production_never_bypasses() {
        for value in ["production", "prod", "PROD"] {
            let mode = DeploymentMode::from_env_value(Some(value)).unwrap();
            assert_eq!(mode, DeploymentMode::Production);
            assert!(!mode.bypasses_authentication());
        }
    }

    #[test]
    fn test_unknown_environment_is_rejected() {
        let err = DeploymentMode::from_env_value(Some("staging")).unwrap_err();
        assert!(err.contains("staging"));
    }
}
