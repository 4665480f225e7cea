//! Configuration management.
//!
//! weft configuration can come from:
//! - Config file (~/.config/weft/config.toml)
//! - Environment variables (WEFT_*), which win over the file

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// weft configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Outbound HTTP node settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Capability service routing
    #[serde(default)]
    pub capabilities: CapabilitiesConfig,
}

/// Executor limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Wall-clock ceiling for one execution, checked between nodes
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Also cancel a handler that overruns the remaining time
    #[serde(default)]
    pub enforce_node_deadline: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            enforce_node_deadline: false,
        }
    }
}

impl ExecutorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_timeout() -> u64 {
    300
}

/// HTTP node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Permit requests to loopback, private and link-local addresses
    #[serde(default)]
    pub allow_internal_urls: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_http_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            allow_internal_urls: false,
        }
    }
}

fn default_http_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

/// Capability service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitiesConfig {
    /// Root URL that capability namespaces are resolved against
    #[serde(default = "default_capabilities_url")]
    pub base_url: String,

    /// File holding the capability registry (JSON or YAML)
    #[serde(default)]
    pub registry_path: Option<PathBuf>,

    #[serde(default = "default_capability_timeout")]
    pub timeout_seconds: u64,
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        Self {
            base_url: default_capabilities_url(),
            registry_path: None,
            timeout_seconds: default_capability_timeout(),
        }
    }
}

fn default_capabilities_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_capability_timeout() -> u64 {
    60
}

impl Config {
    /// Load configuration from the default location plus environment.
    pub fn load() -> Self {
        let mut config = Self::default();

        let primary_path = Self::config_dir().join("config.toml");
        if let Ok(partial) = Self::load_partial_from_path(&primary_path) {
            config.apply_partial(partial);
        }

        config.apply_env_overrides();
        config
    }

    /// Load configuration from an explicit file, then apply environment overrides.
    ///
    /// Unlike [`Config::load`], a missing or malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let partial: PartialConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))?;

        let mut config = Self::default();
        config.apply_partial(partial);
        config.apply_env_overrides();
        Ok(config)
    }

    /// Get the config directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("weft"))
            .unwrap_or_else(|| PathBuf::from(".weft"))
    }

    fn apply_env_overrides(&mut self) {
        if let Some(timeout) = env_parse::<u64>("WEFT_TIMEOUT_SECONDS") {
            self.executor.timeout_seconds = timeout;
        }
        if let Some(enforce) = env_flag("WEFT_ENFORCE_NODE_DEADLINE") {
            self.executor.enforce_node_deadline = enforce;
        }
        if let Some(timeout) = env_parse::<u64>("WEFT_HTTP_TIMEOUT_SECONDS") {
            self.http.timeout_seconds = timeout;
        }
        if let Some(allow) = env_flag("WEFT_ALLOW_INTERNAL_URLS") {
            self.http.allow_internal_urls = allow;
        }
        if let Ok(url) = std::env::var("WEFT_CAPABILITIES_URL") {
            self.capabilities.base_url = url;
        }
        if let Ok(path) = std::env::var("WEFT_CAPABILITIES_REGISTRY") {
            self.capabilities.registry_path = Some(PathBuf::from(path));
        }
    }

    fn load_partial_from_path(path: &Path) -> std::result::Result<PartialConfig, ()> {
        let content = std::fs::read_to_string(path).map_err(|_| ())?;
        toml::from_str(&content).map_err(|_| ())
    }

    fn apply_partial(&mut self, partial: PartialConfig) {
        if let Some(executor) = partial.executor {
            self.executor = executor;
        }
        if let Some(http) = partial.http {
            self.http = http;
        }
        if let Some(capabilities) = partial.capabilities {
            self.capabilities = capabilities;
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    executor: Option<ExecutorConfig>,
    http: Option<HttpConfig>,
    capabilities: Option<CapabilitiesConfig>,
}
