//! Capability node - call an external capability service by name.
//!
//! Any node whose `type` is not a built-in is treated as a capability name
//! and resolved through the [`CapabilityRegistry`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::types::{Node, NodeContext, NodeResult};
use crate::capabilities::{CapabilityClient, CapabilityRegistry, CapabilityRequest};
use crate::error::{Error, Result};

/// Dispatches capability-typed nodes.
pub struct CapabilityNode {
    registry: Arc<CapabilityRegistry>,
    client: Arc<dyn CapabilityClient>,
}

impl CapabilityNode {
    pub fn new(registry: Arc<CapabilityRegistry>, client: Arc<dyn CapabilityClient>) -> Self {
        Self { registry, client }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }
}

#[derive(Debug, Default, Deserialize)]
struct CapabilityConfig {
    #[serde(default)]
    params: Map<String, Value>,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default = "default_method")]
    method: String,
}

fn default_method() -> String {
    "POST".to_string()
}

#[async_trait]
impl Node for CapabilityNode {
    fn node_type(&self) -> &str {
        "capability"
    }

    fn description(&self) -> &str {
        "Call a registered capability service"
    }

    /// The capability name is the node's declared type, read from `ctx.node_type`.
    async fn execute(&self, config: &Value, ctx: &NodeContext) -> Result<NodeResult> {
        let name = ctx.node_type.as_str();
        let capability = self
            .registry
            .get(name)
            .ok_or_else(|| Error::UnknownNodeType(name.to_string()))?;

        if !capability.available {
            return Err(Error::CapabilityUnavailable(name.to_string()));
        }

        let config: CapabilityConfig = serde_json::from_value(config.clone())
            .map_err(|e| Error::Node(format!("Invalid config for capability '{}': {}", name, e)))?;

        let route = match config.endpoint {
            Some(endpoint) => endpoint,
            None => capability
                .default_endpoint()
                .map(|e| e.route.clone())
                .ok_or_else(|| {
                    Error::Node(format!(
                        "Capability '{}' declares no endpoints and none was configured",
                        name
                    ))
                })?,
        };

        let mut params = config.params;
        params.extend(ctx.inputs.clone());

        let request = CapabilityRequest {
            capability: name.to_string(),
            namespace: capability.namespace.clone(),
            route,
            method: config.method.to_uppercase(),
            params,
        };
        debug!(
            capability = %name,
            namespace = %request.namespace,
            route = %request.route,
            "Calling capability"
        );

        let response = self.client.call(request).await?;
        if response.is_error() {
            let message = response.error_message();
            warn!(capability = %name, status = response.status, "Capability call failed: {}", message);
            return Err(Error::Capability {
                name: name.to_string(),
                status: response.status,
                message,
            });
        }

        Ok(NodeResult::with_metadata(
            json!({ "output": response.body }),
            json!({ "capability": name, "status": response.status }),
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::capabilities::{Capability, CapabilityResponse};
    use std::sync::Mutex;

    /// In-process capability client that records requests and replays a canned response.
    pub(crate) struct FakeClient {
        pub requests: Mutex<Vec<CapabilityRequest>>,
        response: CapabilityResponse,
    }

    impl FakeClient {
        pub(crate) fn new(status: u16, body: Value) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                response: CapabilityResponse::new(status, body),
            }
        }

        pub(crate) fn last_request(&self) -> Option<CapabilityRequest> {
            self.requests.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl CapabilityClient for FakeClient {
        async fn call(&self, request: CapabilityRequest) -> Result<CapabilityResponse> {
            self.requests.lock().unwrap().push(request);
            Ok(self.response.clone())
        }
    }

    pub(crate) fn test_registry() -> CapabilityRegistry {
        CapabilityRegistry::new()
            .with(
                Capability::new("language", "language/v1")
                    .with_endpoint("POST", "generate")
                    .with_endpoint("GET", "models"),
            )
            .with(Capability::new("image", "image/v1").with_endpoint("POST", "render").unavailable())
            .with(Capability::new("bare", "bare"))
    }

    fn node_with(client: Arc<FakeClient>) -> CapabilityNode {
        CapabilityNode::new(Arc::new(test_registry()), client)
    }

    fn ctx(node_type: &str) -> NodeContext {
        NodeContext::new("exec-1", "cap").with_node_type(node_type)
    }

    #[tokio::test]
    async fn test_calls_default_endpoint_with_merged_params() {
        let client = Arc::new(FakeClient::new(200, json!({"text": "hello"})));
        let node = node_with(client.clone());

        let config = json!({"params": {"prompt": "from config", "max_tokens": 16}});
        let ctx = ctx("language").with_input("prompt", json!("from input"));
        let result = node.execute(&config, &ctx).await.unwrap();

        assert_eq!(result.data, json!({"output": {"text": "hello"}}));
        let request = client.last_request().unwrap();
        assert_eq!(request.namespace, "language/v1");
        assert_eq!(request.route, "generate");
        assert_eq!(request.method, "POST");
        assert_eq!(request.params["prompt"], json!("from input"));
        assert_eq!(request.params["max_tokens"], json!(16));
    }

    #[tokio::test]
    async fn test_explicit_endpoint_and_method() {
        let client = Arc::new(FakeClient::new(200, json!([])));
        let node = node_with(client.clone());

        let config = json!({"endpoint": "models", "method": "get"});
        node.execute(&config, &ctx("language")).await.unwrap();

        let request = client.last_request().unwrap();
        assert_eq!(request.route, "models");
        assert_eq!(request.method, "GET");
    }

    #[tokio::test]
    async fn test_unknown_capability() {
        let node = node_with(Arc::new(FakeClient::new(200, json!(null))));
        let err = node.execute(&json!({}), &ctx("frobnicate")).await.unwrap_err();
        assert!(matches!(err, Error::UnknownNodeType(ref t) if t == "frobnicate"));
    }

    #[tokio::test]
    async fn test_unavailable_capability_is_not_called() {
        let client = Arc::new(FakeClient::new(200, json!(null)));
        let node = node_with(client.clone());
        let err = node.execute(&json!({}), &ctx("image")).await.unwrap_err();
        assert!(matches!(err, Error::CapabilityUnavailable(_)));
        assert!(client.last_request().is_none());
    }

    #[tokio::test]
    async fn test_error_status_raises_with_server_message() {
        let client = Arc::new(FakeClient::new(422, json!({"error": "prompt too long"})));
        let node = node_with(client);
        let err = node.execute(&json!({}), &ctx("language")).await.unwrap_err();

        match err {
            Error::Capability { name, status, message } => {
                assert_eq!(name, "language");
                assert_eq!(status, 422);
                assert_eq!(message, "prompt too long");
            }
            other => panic!("expected capability error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_endpoint_available() {
        let node = node_with(Arc::new(FakeClient::new(200, json!(null))));
        let err = node.execute(&json!({}), &ctx("bare")).await.unwrap_err();
        assert!(err.to_string().contains("declares no endpoints"));
    }
}
