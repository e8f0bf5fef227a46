//! Core types for the operation catalog.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::upstream::{NamespaceInfo, RemoteOperation};

/// Separator between the namespace id and the operation name.
///
/// Namespace ids never contain it because resolution collapses repeated
/// separator characters.
pub const NAMESPACE_SEPARATOR: &str = "__";

/// Display-ordering category derived from an operation's name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum OperationCategory {
    Read,
    Write,
    Destructive,
    #[default]
    Other,
}

impl OperationCategory {
    const READ_VERBS: &'static [&'static str] = &[
        "list", "get", "search", "find", "fetch", "read", "query", "retrieve", "lookup",
        "describe", "count", "check",
    ];
    const WRITE_VERBS: &'static [&'static str] = &[
        "create", "update", "send", "post", "add", "set", "upload", "modify", "patch", "put",
        "insert", "reply", "move", "copy", "write", "edit",
    ];
    const DESTRUCTIVE_VERBS: &'static [&'static str] = &[
        "delete", "remove", "destroy", "purge", "drop", "revoke", "cancel",
    ];

    /// Classify by the verbs present in the name. Destructive wins over write,
    /// write wins over read.
    pub fn from_name(name: &str) -> Self {
        let tokens: Vec<String> = name
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_ascii_lowercase())
            .collect();
        let has = |verbs: &[&str]| tokens.iter().any(|t| verbs.contains(&t.as_str()));

        if has(Self::DESTRUCTIVE_VERBS) {
            Self::Destructive
        } else if has(Self::WRITE_VERBS) {
            Self::Write
        } else if has(Self::READ_VERBS) {
            Self::Read
        } else {
            Self::Other
        }
    }

    pub fn priority(self) -> PriorityTier {
        match self {
            Self::Read => PriorityTier::High,
            Self::Write | Self::Other => PriorityTier::Normal,
            Self::Destructive => PriorityTier::Low,
        }
    }
}

/// Ordering tier; `High` sorts first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    High,
    #[default]
    Normal,
    Low,
}

/// Unique operation identifier: `namespace_id__operation`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    pub namespace_id: String,
    pub operation: String,
}

impl QualifiedName {
    pub fn new(namespace_id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            namespace_id: namespace_id.into(),
            operation: operation.into(),
        }
    }

    /// Parse from `namespace__operation`. Splits at the first separator, so
    /// operation names may themselves contain `__`.
    pub fn parse(s: &str) -> Option<Self> {
        let (namespace, operation) = s.split_once(NAMESPACE_SEPARATOR)?;
        if namespace.is_empty() || operation.is_empty() {
            return None;
        }
        Some(Self::new(namespace, operation))
    }

    pub fn namespace_id(&self) -> &str {
        &self.namespace_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.namespace_id, NAMESPACE_SEPARATOR, self.operation
        )
    }
}

/// One invocable operation, owned by its namespace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub qualified_name: QualifiedName,
    pub description: Option<String>,
    pub input_schema: Value,
    pub category: OperationCategory,
    pub priority: PriorityTier,
    pub registered_at: DateTime<Utc>,
}

impl Operation {
    pub fn new(qualified_name: QualifiedName) -> Self {
        let category = OperationCategory::from_name(qualified_name.operation());
        Self {
            qualified_name,
            description: None,
            input_schema: default_input_schema(),
            category,
            priority: category.priority(),
            registered_at: Utc::now(),
        }
    }

    /// Qualify an upstream operation with its namespace id.
    pub fn from_remote(namespace_id: &str, remote: RemoteOperation) -> Self {
        let mut op = Self::new(QualifiedName::new(namespace_id, remote.name));
        op.description = remote.description.filter(|d| !d.trim().is_empty());
        if let Some(schema) = remote.input_schema.filter(Value::is_object) {
            op.input_schema = schema;
        }
        op
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn namespace_id(&self) -> &str {
        self.qualified_name.namespace_id()
    }

    pub fn name(&self) -> &str {
        self.qualified_name.operation()
    }

    pub fn full_name(&self) -> String {
        self.qualified_name.to_string()
    }
}

fn default_input_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

/// Account/connection identifiers that direct an execution to the right
/// upstream context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingMetadata {
    pub source_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl RoutingMetadata {
    pub fn for_source(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            ..Default::default()
        }
    }

    pub fn from_namespace(info: &NamespaceInfo) -> Self {
        Self {
            source_name: info.name.clone(),
            connection_id: info.connection_id.clone(),
            server_id: info.server_id.clone(),
            account_label: info.account_label.clone(),
            status: info.status.clone(),
        }
    }

    pub fn has_connection(&self) -> bool {
        self.connection_id.is_some() || self.server_id.is_some()
    }

    /// Auxiliary context fields forwarded with an execution request.
    pub fn context_fields(&self) -> serde_json::Map<String, Value> {
        let mut fields = serde_json::Map::new();
        fields.insert("source".to_string(), Value::from(self.source_name.as_str()));
        let optional = [
            ("connection_id", &self.connection_id),
            ("server_id", &self.server_id),
            ("account_label", &self.account_label),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                fields.insert(key.to_string(), Value::from(v.as_str()));
            }
        }
        fields
    }
}
