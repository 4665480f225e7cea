//! HTTP node - make HTTP requests.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use super::template::{render_template, render_value, value_to_string, Encoding};
use super::types::{Node, NodeContext, NodeResult};
use crate::config::HttpConfig;
use crate::error::{Error, Result};

/// Validate URL to prevent SSRF attacks.
/// Blocks access to localhost, private IP ranges, and non-http(s) schemes.
fn validate_url(url: &str, allow_internal: bool) -> Result<()> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| Error::Node(format!("Invalid URL '{}': {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(Error::Node(format!(
                "Unsupported URL scheme '{}'. Only http and https are allowed.",
                scheme
            )));
        }
    }

    if allow_internal {
        return Ok(());
    }

    if let Some(host) = parsed.host_str() {
        let host_lower = host.to_lowercase();
        if host_lower == "localhost"
            || host_lower == "127.0.0.1"
            || host_lower == "::1"
            || host_lower == "[::1]"
            || host_lower == "0.0.0.0"
        {
            warn!("Blocked SSRF attempt to localhost: {}", url);
            return Err(Error::Node(
                "Access to localhost is not allowed for security reasons.".to_string(),
            ));
        }

        let bare = host_lower.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = bare.parse::<IpAddr>() {
            if is_private_or_special_ip(&ip) {
                warn!("Blocked SSRF attempt to private IP: {}", url);
                return Err(Error::Node(
                    "Access to private or internal IP addresses is not allowed for security reasons.".to_string(),
                ));
            }
        }

        if host_lower.ends_with(".local")
            || host_lower.ends_with(".internal")
            || host_lower.ends_with(".localhost")
        {
            warn!("Blocked SSRF attempt to internal host: {}", url);
            return Err(Error::Node(
                "Access to internal hostnames is not allowed for security reasons.".to_string(),
            ));
        }
    }

    Ok(())
}

/// Check if an IP address is private, loopback, or otherwise special.
fn is_private_or_special_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_loopback()              // 127.0.0.0/8
                || ipv4.is_private()         // 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
                || ipv4.is_link_local()      // 169.254.0.0/16, cloud metadata
                || ipv4.is_broadcast()
                || ipv4.is_unspecified()
                || ipv4.octets()[0] == 100 && (ipv4.octets()[1] & 0xc0) == 64 // 100.64.0.0/10 (CGNAT)
        }
        IpAddr::V6(ipv6) => {
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                || ipv6
                    .to_ipv4_mapped()
                    .map(|v4| is_private_or_special_ip(&IpAddr::V4(v4)))
                    .unwrap_or(false)
        }
    }
}

/// HTTP request node.
pub struct HttpNode {
    client: Client,
    allow_internal_urls: bool,
}

impl HttpNode {
    pub fn new() -> Self {
        Self::from_config(&HttpConfig::default())
    }

    /// Build the node with the configured timeouts and SSRF policy.
    pub fn from_config(config: &HttpConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with configured timeouts: {}", e);
                Client::new()
            });
        Self {
            client,
            allow_internal_urls: config.allow_internal_urls,
        }
    }

    /// Permit loopback and private addresses (local services, tests).
    pub fn allow_internal_urls(mut self, allow: bool) -> Self {
        self.allow_internal_urls = allow;
        self
    }
}

impl Default for HttpNode {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HttpRequestConfig {
    url: String,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    headers: Option<Map<String, Value>>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default, alias = "timeout_seconds")]
    timeout_seconds: Option<u64>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn has_body(method: &str) -> bool {
    matches!(method, "POST" | "PUT" | "PATCH" | "DELETE")
}

#[async_trait]
impl Node for HttpNode {
    fn node_type(&self) -> &str {
        "http"
    }

    fn description(&self) -> &str {
        "Make HTTP requests (GET, POST, PUT, DELETE, PATCH, HEAD)"
    }

    async fn execute(&self, config: &Value, ctx: &NodeContext) -> Result<NodeResult> {
        let config: HttpRequestConfig = serde_json::from_value(config.clone())
            .map_err(|e| Error::Node(format!("Invalid HTTP config: {}", e)))?;

        let url = render_template(&config.url, &ctx.inputs, Encoding::Url);
        validate_url(&url, self.allow_internal_urls)?;

        let method = config.method.to_uppercase();
        debug!("HTTP {} {}", method, url);

        let mut request = match method.as_str() {
            "GET" => self.client.get(&url),
            "POST" => self.client.post(&url),
            "PUT" => self.client.put(&url),
            "DELETE" => self.client.delete(&url),
            "PATCH" => self.client.patch(&url),
            "HEAD" => self.client.head(&url),
            _ => {
                return Err(Error::Node(format!(
                    "Unknown HTTP method: {}",
                    config.method
                )))
            }
        };

        let mut has_content_type = false;
        if let Some(headers) = &config.headers {
            for (key, value) in headers {
                let header_value = match value {
                    Value::String(s) => render_template(s, &ctx.inputs, Encoding::Plain),
                    other => other.to_string(),
                };
                has_content_type |= key.eq_ignore_ascii_case("content-type");
                request = request.header(key, header_value);
            }
        }

        if has_body(&method) {
            let body = match ctx.input("body") {
                Some(body) => Some(body.clone()),
                None => config.body.as_ref().map(|b| render_value(b, &ctx.inputs)),
            };
            if let Some(body) = body {
                if !has_content_type {
                    request = request.header("Content-Type", "application/json");
                }
                let payload = match body {
                    Value::String(raw) => raw,
                    other => serde_json::to_string(&other)?,
                };
                request = request.body(payload);
            }
        }

        if let Some(timeout) = config.timeout_seconds {
            request = request.timeout(Duration::from_secs(timeout));
        }

        let start = std::time::Instant::now();
        let response = request.send().await?;

        let status = response.status().as_u16();
        let headers: Map<String, Value> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.to_string(),
                    Value::String(v.to_str().unwrap_or("").to_string()),
                )
            })
            .collect();

        let body_text = response.text().await?;
        let duration = start.elapsed();

        let output = if body_text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body_text).unwrap_or(Value::String(body_text))
        };

        if status >= 400 {
            warn!(
                "HTTP {} {} -> {}: {}",
                method,
                url,
                status,
                value_to_string(&output)
            );
        } else {
            info!(
                "HTTP {} {} -> {} ({}ms)",
                method,
                url,
                status,
                duration.as_millis()
            );
        }

        Ok(NodeResult::with_metadata(
            json!({
                "output": output,
                "status": status,
                "headers": headers,
            }),
            json!({
                "duration_ms": duration.as_millis() as u64,
            }),
        ))
    }
}
