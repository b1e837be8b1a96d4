//! Client configuration
//!
//! Holds the upstream base URLs. The defaults point at the production
//! services; each one can be overridden through an environment variable.

use serde::Serialize;

/// Base URLs of every upstream service the client talks to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoints {
    /// Player preview API, item id and `.json` are appended
    pub preview_base: String,
    /// Kaltura API v3 service root
    pub kaltura_base: String,
    /// Areena JSON API root (search)
    pub api_base: String,
    /// Areena web site root (series pages, episode homepages)
    pub web_base: String,
    /// Image CDN upload root
    pub image_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            preview_base: "https://player.api.yle.fi/v1/preview".to_string(),
            kaltura_base: "https://cdnapisec.kaltura.com/api_v3/service".to_string(),
            api_base: "https://areena.api.yle.fi".to_string(),
            web_base: "https://areena.yle.fi".to_string(),
            image_base: "https://images.cdn.yle.fi/image/upload".to_string(),
        }
    }
}

/// Top-level configuration for [`crate::AreenaClient`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreenaConfig {
    pub endpoints: Endpoints,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for AreenaConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            user_agent: format!("areena_browser/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl AreenaConfig {
    /// Builds the default configuration with overrides from the process
    /// environment (`AREENA_PREVIEW_URL`, `AREENA_KALTURA_URL`,
    /// `AREENA_API_URL`, `AREENA_WEB_URL`, `AREENA_IMAGE_URL`).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let overrides: [(&str, &mut String); 5] = [
            ("AREENA_PREVIEW_URL", &mut config.endpoints.preview_base),
            ("AREENA_KALTURA_URL", &mut config.endpoints.kaltura_base),
            ("AREENA_API_URL", &mut config.endpoints.api_base),
            ("AREENA_WEB_URL", &mut config.endpoints.web_base),
            ("AREENA_IMAGE_URL", &mut config.endpoints.image_base),
        ];

        for (key, target) in overrides {
            if let Some(value) = lookup(key) {
                let value = value.trim().trim_end_matches('/');
                if !value.is_empty() {
                    *target = value.to_string();
                }
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_production() {
        let config = AreenaConfig::default();
        assert_eq!(config.endpoints.web_base, "https://areena.yle.fi");
        assert!(config.user_agent.starts_with("areena_browser/"));
    }

    #[test]
    fn test_overrides_are_trimmed() {
        let config = AreenaConfig::from_lookup(|key| match key {
            "AREENA_API_URL" => Some("http://localhost:8080/".to_string()),
            "AREENA_WEB_URL" => Some("   ".to_string()),
            _ => None,
        });

        assert_eq!(config.endpoints.api_base, "http://localhost:8080");
        assert_eq!(config.endpoints.web_base, "https://areena.yle.fi");
        assert_eq!(
            config.endpoints.preview_base,
            Endpoints::default().preview_base
        );
    }
}
