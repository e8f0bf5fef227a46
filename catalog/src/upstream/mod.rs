//! Upstream catalog service contract.
//!
//! The catalog core consumes the remote service only through
//! [`CatalogClient`]. [`HttpCatalogClient`] is the `reqwest` implementation
//! used in production; tests substitute scripted clients.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use http::HttpCatalogClient;

use crate::{credential::Credential, error::CatalogResult, inventory::RoutingMetadata};

/// One namespace as reported by the upstream listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceInfo {
    pub name: String,
    #[serde(
        default,
        alias = "displayName",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
    #[serde(
        default,
        alias = "connectionId",
        alias = "accountId",
        skip_serializing_if = "Option::is_none"
    )]
    pub connection_id: Option<String>,
    #[serde(default, alias = "serverId", skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(
        default,
        alias = "accountLabel",
        skip_serializing_if = "Option::is_none"
    )]
    pub account_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl NamespaceInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_connection(mut self, connection_id: impl Into<String>) -> Self {
        self.connection_id = Some(connection_id.into());
        self
    }

    #[must_use]
    pub fn with_server(mut self, server_id: impl Into<String>) -> Self {
        self.server_id = Some(server_id.into());
        self
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// One operation as reported by the upstream per-namespace listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteOperation {
    #[serde(alias = "slug")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        alias = "inputSchema",
        alias = "parameters",
        skip_serializing_if = "Option::is_none"
    )]
    pub input_schema: Option<Value>,
}

impl RemoteOperation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Request forwarded to the upstream execution endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRequest {
    /// Original, unqualified operation name.
    pub operation: String,
    pub parameters: Map<String, Value>,
    pub routing: RoutingMetadata,
}

impl ExecutionRequest {
    pub fn new(
        operation: impl Into<String>,
        parameters: Map<String, Value>,
        routing: RoutingMetadata,
    ) -> Self {
        Self {
            operation: operation.into(),
            parameters,
            routing,
        }
    }
}

#[async_trait]
pub trait CatalogClient: Send + Sync + 'static {
    /// All namespaces visible to the credential, with connection metadata.
    async fn list_namespaces(
        &self,
        credential: Option<&Credential>,
    ) -> CatalogResult<Vec<NamespaceInfo>>;

    /// Operations for one namespace, addressed by its source name.
    async fn list_operations(
        &self,
        source_name: &str,
        credential: Option<&Credential>,
    ) -> CatalogResult<Vec<RemoteOperation>>;

    /// Execute an operation. Returns the raw upstream JSON; shape
    /// normalization happens in the dispatcher.
    async fn execute(
        &self,
        request: ExecutionRequest,
        credential: Option<&Credential>,
    ) -> CatalogResult<Value>;

    /// Lower-fidelity per-application discovery used when the namespace
    /// listing fails. Returns application names only.
    async fn list_legacy_apps(&self, credential: Option<&Credential>) -> CatalogResult<Vec<String>>;
}

/// Accept either a bare array or an `{"items": [...]}` style envelope.
pub(crate) fn unwrap_list(body: Value) -> Value {
    match body {
        Value::Object(mut map) => ["items", "data", "namespaces", "tools", "apps"]
            .iter()
            .find_map(|key| map.remove(*key).filter(Value::is_array))
            .unwrap_or(Value::Array(Vec::new())),
        other => other,
    }
}
