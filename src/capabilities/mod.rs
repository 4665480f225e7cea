//! Capability registry and transport.
//!
//! A capability is an external service (language generation, image
//! generation, ...) reachable by name. The registry is supplied when the
//! executor is built and is only read afterwards; calls go through a
//! [`CapabilityClient`], so tests can substitute an in-process fake.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::CapabilitiesConfig;
use crate::error::{Error, Result};
use crate::nodes::template::value_to_string;

/// One route a capability service exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityEndpoint {
    #[serde(default = "default_endpoint_method")]
    pub method: String,
    pub route: String,
    #[serde(default)]
    pub description: String,
}

fn default_endpoint_method() -> String {
    "POST".to_string()
}

/// A named external service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    /// Taken from the map key when the registry file is a map
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Routing prefix under the capability base URL
    pub namespace: String,
    #[serde(default)]
    pub endpoints: Vec<CapabilityEndpoint>,
    /// False when the backing service is not installed or loaded
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl Capability {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            namespace: namespace.to_string(),
            endpoints: Vec::new(),
            available: true,
        }
    }

    pub fn with_endpoint(mut self, method: &str, route: &str) -> Self {
        self.endpoints.push(CapabilityEndpoint {
            method: method.to_string(),
            route: route.to_string(),
            description: String::new(),
        });
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Route used when a node does not name an endpoint.
    pub fn default_endpoint(&self) -> Option<&CapabilityEndpoint> {
        self.endpoints.first()
    }
}

/// On-disk registry shape: a list of capabilities or a map keyed by name.
#[derive(Deserialize)]
#[serde(untagged)]
enum RegistryFile {
    List(Vec<Capability>),
    Map(HashMap<String, Capability>),
}

/// Read-only mapping from capability name to its declaration.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Capability>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability, replacing any previous one with the same name.
    pub fn register(&mut self, capability: Capability) {
        self.capabilities.insert(capability.name.clone(), capability);
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.register(capability);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.capabilities.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// Capability names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.capabilities.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Parse a registry from JSON or YAML text.
    pub fn parse(source: &str) -> Result<Self> {
        let file: RegistryFile = serde_yaml::from_str(source)
            .map_err(|e| Error::Config(format!("Invalid capability registry: {}", e)))?;

        let mut registry = Self::new();
        match file {
            RegistryFile::List(list) => {
                for capability in list {
                    if capability.name.is_empty() {
                        return Err(Error::Config(format!(
                            "Capability in namespace '{}' has no name",
                            capability.namespace
                        )));
                    }
                    registry.register(capability);
                }
            }
            RegistryFile::Map(map) => {
                for (name, mut capability) in map {
                    capability.name = name;
                    registry.register(capability);
                }
            }
        }
        Ok(registry)
    }

    /// Load a registry file (JSON or YAML).
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }
}

/// A single call to a capability service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityRequest {
    pub capability: String,
    pub namespace: String,
    pub route: String,
    pub method: String,
    pub params: Map<String, Value>,
}

/// Raw answer from a capability service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityResponse {
    pub status: u16,
    pub body: Value,
}

impl CapabilityResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// Server-provided error text: `message`, then `error`, then the body itself.
    pub fn error_message(&self) -> String {
        for key in ["message", "error"] {
            if let Some(text) = self.body.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
        match &self.body {
            Value::Null => format!("status {}", self.status),
            other => value_to_string(other),
        }
    }
}

/// Transport for capability calls.
#[async_trait]
pub trait CapabilityClient: Send + Sync {
    /// Perform the call. Only transport failures are errors; error statuses
    /// are returned in the response.
    async fn call(&self, request: CapabilityRequest) -> Result<CapabilityResponse>;
}

fn route_param_regex() -> &'static Regex {
    static ROUTE_PARAM_REGEX: OnceLock<Regex> = OnceLock::new();
    ROUTE_PARAM_REGEX.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("valid regex"))
}

/// Fill `{key}` segments of a route from params, consuming the used keys.
fn fill_route(route: &str, params: &mut Map<String, Value>) -> String {
    route_param_regex()
        .replace_all(route, |caps: &regex_lite::Captures| match params.remove(&caps[1]) {
            Some(value) => urlencoding::encode(&value_to_string(&value)).into_owned(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Capability client that speaks HTTP to `{base_url}/{namespace}/{route}`.
pub struct HttpCapabilityClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCapabilityClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(60))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build capability HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &CapabilitiesConfig) -> Self {
        Self::with_timeout(
            &config.base_url,
            Duration::from_secs(config.timeout_seconds),
        )
    }

    fn url_for(&self, namespace: &str, route: &str) -> String {
        let namespace = namespace.trim_matches('/');
        let route = route.trim_start_matches('/');
        match (namespace.is_empty(), route.is_empty()) {
            (true, true) => self.base_url.clone(),
            (true, false) => format!("{}/{}", self.base_url, route),
            (false, true) => format!("{}/{}", self.base_url, namespace),
            (false, false) => format!("{}/{}/{}", self.base_url, namespace, route),
        }
    }
}

#[async_trait]
impl CapabilityClient for HttpCapabilityClient {
    async fn call(&self, request: CapabilityRequest) -> Result<CapabilityResponse> {
        let mut params = request.params;
        let route = fill_route(&request.route, &mut params);
        let url = self.url_for(&request.namespace, &route);
        let method = request.method.to_uppercase();

        debug!(capability = %request.capability, "{} {}", method, url);

        let builder = match method.as_str() {
            "GET" | "DELETE" => {
                let query: Vec<(String, String)> = params
                    .iter()
                    .map(|(k, v)| (k.clone(), value_to_string(v)))
                    .collect();
                let builder = if method == "GET" {
                    self.client.get(&url)
                } else {
                    self.client.delete(&url)
                };
                builder.query(&query)
            }
            "POST" => self.client.post(&url).json(&params),
            "PUT" => self.client.put(&url).json(&params),
            "PATCH" => self.client.patch(&url).json(&params),
            other => {
                return Err(Error::Node(format!(
                    "Unsupported capability method '{}' for '{}'",
                    other, request.capability
                )))
            }
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(CapabilityResponse { status, body })
    }
}
