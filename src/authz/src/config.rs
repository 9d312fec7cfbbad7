//! Authorization context configuration

use serde::Deserialize;
use std::time::Duration;

use crate::error::{AuthzError, Result};

/// Configuration for an [`Authorizer`](crate::Authorizer)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthzConfig {
    /// When false, fetchers resolve to an empty policy set without any lookups
    pub enabled: bool,

    /// Per-lookup deadline applied when the call context carries none
    #[serde(deserialize_with = "millis::deserialize")]
    pub lookup_timeout: Option<Duration>,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookup_timeout: None,
        }
    }
}

impl AuthzConfig {
    /// Configuration with enforcement turned off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Load configuration from the environment.
    ///
    /// - `AUTHZ_DISABLED` - "true"/"1" turns enforcement off (default: enabled)
    /// - `AUTHZ_LOOKUP_TIMEOUT_MS` - per-lookup deadline in milliseconds (default: none)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup("AUTHZ_DISABLED") {
            let disabled = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                other => {
                    return Err(AuthzError::InvalidConfig(format!(
                        "AUTHZ_DISABLED: expected boolean, got '{}'",
                        other
                    )))
                }
            };
            config.enabled = !disabled;
        }

        if let Some(raw) = lookup("AUTHZ_LOOKUP_TIMEOUT_MS") {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                AuthzError::InvalidConfig(format!(
                    "AUTHZ_LOOKUP_TIMEOUT_MS: expected milliseconds, got '{}'",
                    raw
                ))
            })?;
            config.lookup_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }

        Ok(config)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = Option::<u64>::deserialize(deserializer)?;
        Ok(ms.filter(|ms| *ms > 0).map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AuthzConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(config, AuthzConfig::default());
        assert!(config.enabled);
    }

    #[test]
    fn test_env_overrides() {
        let config = AuthzConfig::from_lookup(env(&[
            ("AUTHZ_DISABLED", "true"),
            ("AUTHZ_LOOKUP_TIMEOUT_MS", "250"),
        ]))
        .unwrap();

        assert!(!config.enabled);
        assert_eq!(config.lookup_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_invalid_env() {
        let err = AuthzConfig::from_lookup(env(&[("AUTHZ_DISABLED", "maybe")])).unwrap_err();
        assert!(matches!(err, AuthzError::InvalidConfig(_)));

        let err = AuthzConfig::from_lookup(env(&[("AUTHZ_LOOKUP_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(matches!(err, AuthzError::InvalidConfig(_)));
    }

    #[test]
    fn test_deserialize() {
        let config: AuthzConfig =
            serde_json::from_str(r#"{"enabled": false, "lookup_timeout": 1500}"#).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.lookup_timeout, Some(Duration::from_millis(1500)));

        let config: AuthzConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AuthzConfig::default());
    }
}
