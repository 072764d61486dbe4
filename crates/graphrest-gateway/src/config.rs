//! Gateway configuration.
//!
//! Usually loaded as the `[gateway]` section of `graphrest.toml`.
//!
//! # Example Configuration
//!
//! ```toml
//! [gateway]
//! base_path = "/api"
//! depth_limit = 1
//! ignore = ["User.friends"]
//!
//! [gateway.routes."Query.feed"]
//! method = "POST"
//! path = "/feed/search"
//! tags = ["feed"]
//!
//! [gateway.custom_scalars.DateTime]
//! type = "string"
//! format = "date-time"
//!
//! [gateway.webhook]
//! timeout_secs = 10
//! ```

use std::time::Duration;

use graphrest_core::HttpMethod;
use graphrest_openapi::CustomScalars;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// REST surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Prefix under which routes and webhook endpoints are mounted.
    /// Default: "" (mounted at the root)
    #[serde(default)]
    pub base_path: String,

    /// Type names (`User`) or field coordinates (`Post.author`) whose
    /// selections are always expanded instead of reduced to `id`.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// How many times a type may repeat along one selection path.
    /// Default: 1
    #[serde(default = "default_depth_limit")]
    pub depth_limit: usize,

    /// Per-route overrides keyed by `"<RootType>.<field>"`.
    #[serde(default)]
    pub routes: IndexMap<String, RouteConfig>,

    /// OpenAPI schemas for custom scalars.
    #[serde(default)]
    pub custom_scalars: CustomScalars,

    #[serde(default)]
    pub webhook: WebhookConfig,
}

fn default_depth_limit() -> usize {
    1
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            ignore: Vec::new(),
            depth_limit: default_depth_limit(),
            routes: IndexMap::new(),
            custom_scalars: CustomScalars::new(),
            webhook: WebhookConfig::default(),
        }
    }
}

/// Override of one synthesized route. Unset fields keep the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    #[serde(default)]
    pub method: Option<HttpMethod>,
    /// Path with `:param` placeholders, relative to `base_path`.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub response_status: Option<u16>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Webhook delivery settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Per-request timeout for webhook POSTs. Unset means no timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl WebhookConfig {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl GatewayConfig {
    /// Base path with a trailing `/` removed; `""` when routes live at the root.
    #[must_use]
    pub fn normalized_base_path(&self) -> &str {
        self.base_path.trim_end_matches('/')
    }

    /// Validates the configuration on its own. Override keys are checked
    /// against the schema when routes are synthesized.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration values are invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.depth_limit == 0 {
            return Err("gateway.depth_limit must be > 0".into());
        }
        if !self.base_path.is_empty() && !self.base_path.starts_with('/') {
            return Err(format!(
                "gateway.base_path must start with '/', got '{}'",
                self.base_path
            ));
        }
        if self.webhook.timeout_secs == Some(0) {
            return Err("gateway.webhook.timeout_secs must be > 0 when set".into());
        }

        for (key, route) in &self.routes {
            let valid_key = key
                .split_once('.')
                .is_some_and(|(ty, field)| !ty.is_empty() && !field.is_empty());
            if !valid_key {
                return Err(format!(
                    "gateway.routes key '{key}' must look like '<RootType>.<field>'"
                ));
            }
            if let Some(path) = &route.path
                && !path.starts_with('/')
            {
                return Err(format!("gateway.routes.\"{key}\".path must start with '/'"));
            }
            if let Some(status) = route.response_status
                && !(100..=599).contains(&status)
            {
                return Err(format!(
                    "gateway.routes.\"{key}\".response_status {status} is not an HTTP status"
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.base_path, "");
        assert!(config.ignore.is_empty());
        assert_eq!(config.depth_limit, 1);
        assert!(config.routes.is_empty());
        assert!(config.webhook.timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_from_toml() {
        let toml = r#"
            base_path = "/api/"
            ignore = ["User.friends"]
            depth_limit = 2

            [routes."Query.feed"]
            method = "POST"
            path = "/feed/search"
            response_status = 201
            tags = ["feed"]

            [custom_scalars.DateTime]
            type = "string"
            format = "date-time"

            [webhook]
            timeout_secs = 5
        "#;

        let config: GatewayConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.normalized_base_path(), "/api");
        assert_eq!(config.depth_limit, 2);
        assert_eq!(config.ignore, vec!["User.friends"]);

        let feed = &config.routes["Query.feed"];
        assert_eq!(feed.method, Some(HttpMethod::Post));
        assert_eq!(feed.path.as_deref(), Some("/feed/search"));
        assert_eq!(feed.response_status, Some(201));
        assert!(feed.description.is_none());

        assert_eq!(
            config.custom_scalars["DateTime"].format.as_deref(),
            Some("date-time")
        );
        assert_eq!(config.webhook.timeout(), Some(Duration::from_secs(5)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_depth_limit() {
        let config = GatewayConfig {
            depth_limit: 0,
            ..GatewayConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_base_path() {
        let config = GatewayConfig {
            base_path: "api".into(),
            ..GatewayConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_route_key() {
        let mut config = GatewayConfig::default();
        config.routes.insert("feed".into(), RouteConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_route_values() {
        let mut config = GatewayConfig::default();
        config.routes.insert(
            "Query.feed".into(),
            RouteConfig {
                path: Some("feed".into()),
                ..RouteConfig::default()
            },
        );
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.routes.insert(
            "Query.feed".into(),
            RouteConfig {
                response_status: Some(42),
                ..RouteConfig::default()
            },
        );
        assert!(config.validate().is_err());
    }
}
