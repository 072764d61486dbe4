use graphrest_gateway::GatewayConfig;
use graphrest_openapi::{Info, OpenApiOptions, Server, Tag};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Route synthesis, overrides and webhook settings
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub openapi: OpenApiSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        if self.upstream.url.is_empty() {
            return Err("upstream.url is required".into());
        }
        if self.upstream.schema_path.is_none() && self.upstream.sdl_url.is_none() {
            return Err("one of upstream.schema_path or upstream.sdl_url is required".into());
        }
        if self.upstream.timeout_secs == 0 {
            return Err("upstream.timeout_secs must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if !self.openapi.path.starts_with('/') {
            return Err("openapi.path must start with '/'".into());
        }
        self.gateway.validate()
    }

    pub fn addr(&self) -> SocketAddr {
        let ip = self
            .server
            .host
            .parse()
            .unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
        SocketAddr::new(ip, self.server.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// The GraphQL service requests are forwarded to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// GraphQL-over-HTTP endpoint, e.g. `http://localhost:4000/graphql`
    #[serde(default)]
    pub url: String,
    /// Local SDL file describing the upstream schema
    #[serde(default)]
    pub schema_path: Option<String>,
    /// URL serving the SDL as plain text, used when `schema_path` is unset
    #[serde(default)]
    pub sdl_url: Option<String>,
    /// Incoming request headers copied onto upstream requests
    #[serde(default = "default_forward_headers")]
    pub forward_headers: Vec<String>,
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

fn default_forward_headers() -> Vec<String> {
    vec!["authorization".into()]
}
fn default_upstream_timeout() -> u64 {
    30
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            schema_path: None,
            sdl_url: None,
            forward_headers: default_forward_headers(),
            timeout_secs: default_upstream_timeout(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiSettings {
    /// Where the document is served. Not affected by `gateway.base_path`.
    #[serde(default = "default_openapi_path")]
    pub path: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub servers: Vec<Server>,
    #[serde(default)]
    pub tags: Option<Vec<Tag>>,
}

fn default_openapi_path() -> String {
    "/openapi.json".into()
}
fn default_title() -> String {
    "graphrest".into()
}
fn default_version() -> String {
    "0.0.1".into()
}

impl Default for OpenApiSettings {
    fn default() -> Self {
        Self {
            path: default_openapi_path(),
            title: default_title(),
            version: default_version(),
            description: None,
            servers: Vec::new(),
            tags: None,
        }
    }
}

impl OpenApiSettings {
    pub fn to_options(&self) -> OpenApiOptions {
        let mut info = Info::new(&self.title, &self.version);
        info.description = self.description.clone();
        OpenApiOptions {
            info,
            servers: self.servers.clone(),
            tags: self.tags.clone(),
            ..OpenApiOptions::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_PATH: &str = "graphrest.toml";

    /// Loads `graphrest.toml` (or `path`) plus `GRAPHREST__*` overrides.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // e.g. GRAPHREST__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("GRAPHREST")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.upstream.url = "http://localhost:4000/graphql".into();
        cfg.upstream.schema_path = Some("schema.graphql".into());
        cfg
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.openapi.path, "/openapi.json");
        assert_eq!(cfg.upstream.forward_headers, vec!["authorization"]);
        assert_eq!(cfg.gateway.depth_limit, 1);
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());
        assert!(AppConfig::default().validate().is_err());

        let mut cfg = valid();
        cfg.upstream.schema_path = None;
        assert!(cfg.validate().is_err());

        let mut cfg = valid();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().is_err());

        let mut cfg = valid();
        cfg.gateway.depth_limit = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[server]
port = 9191

[upstream]
url = "http://upstream/graphql"
sdl_url = "http://upstream/sdl"

[gateway]
base_path = "/api"

[gateway.routes."Query.users"]
tags = ["users"]

[openapi]
title = "Users API"
"#
        )
        .unwrap();

        let cfg = loader::load_config(file.path().to_str()).unwrap();
        assert_eq!(cfg.server.port, 9191);
        assert_eq!(cfg.gateway.base_path, "/api");
        assert_eq!(
            cfg.gateway.routes["Query.users"].tags.as_deref(),
            Some(&["users".to_string()][..])
        );
        assert_eq!(cfg.openapi.to_options().info.title, "Users API");
    }

    #[test]
    fn test_missing_file_falls_back_to_env_and_fails_validation() {
        let err = loader::load_config(Some("/nonexistent/graphrest.toml")).unwrap_err();
        assert!(err.contains("upstream.url"));
    }
}
