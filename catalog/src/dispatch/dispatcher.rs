//! Resolution of inbound calls to upstream executions.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::{
    classify::{classify, CallKind},
    outcome::ExecutionOutcome,
};
use crate::{
    core::loader::IntelligentLoader,
    credential::Credential,
    error::{CatalogError, CatalogResult},
    inventory::{NamespaceResolver, Operation, QualifiedName, RoutingMetadata},
    upstream::{CatalogClient, ExecutionRequest},
};

const OPERATION_ARG: &str = "operation";
const PARAMETERS_ARG: &str = "parameters";

pub struct Dispatcher {
    client: Arc<dyn CatalogClient>,
    resolver: Arc<NamespaceResolver>,
    loader: IntelligentLoader,
    default_credential: Option<Credential>,
}

impl Dispatcher {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        resolver: Arc<NamespaceResolver>,
        loader: IntelligentLoader,
        default_credential: Option<Credential>,
    ) -> Self {
        Self {
            client,
            resolver,
            loader,
            default_credential,
        }
    }

    /// Route one call. `credential` overrides the configured default for
    /// this call only.
    pub async fn dispatch(
        &self,
        call_name: &str,
        args: Value,
        credential: Option<&Credential>,
    ) -> CatalogResult<ExecutionOutcome> {
        let credential = Credential::select(credential, self.default_credential.as_ref());
        let args = into_object(args, "arguments")?;
        let kind = classify(call_name)?;
        debug!(call = call_name, kind = ?kind, "Dispatching call");

        match kind {
            CallKind::ListOperations { namespace_id } => {
                self.list_operations(&namespace_id, credential).await
            }
            CallKind::Execute { namespace_id } => {
                let (operation, parameters) = execute_args(args)?;
                self.execute(&namespace_id, &operation, parameters, credential)
                    .await
            }
            CallKind::Namespaced(name) => {
                self.execute(name.namespace_id(), name.operation(), args, credential)
                    .await
            }
            CallKind::Legacy { operation } => {
                self.execute_legacy(&operation, args, credential).await
            }
        }
    }

    async fn list_operations(
        &self,
        namespace_id: &str,
        credential: Option<&Credential>,
    ) -> CatalogResult<ExecutionOutcome> {
        let operations = self.loader.load_namespace(namespace_id, credential).await?;
        let mut sorted: Vec<&Operation> = operations.iter().collect();
        sorted.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.name().cmp(b.name()))
        });

        let listed: Vec<Value> = sorted
            .into_iter()
            .map(|op| {
                json!({
                    "name": op.name(),
                    "qualified_name": op.full_name(),
                    "description": op.description,
                    "input_schema": op.input_schema,
                    "category": op.category,
                })
            })
            .collect();

        Ok(ExecutionOutcome::success(json!({
            "namespace": namespace_id,
            "source": self.resolver.reverse_resolve(namespace_id),
            "operations": listed,
        })))
    }

    async fn execute(
        &self,
        namespace_id: &str,
        operation: &str,
        parameters: Map<String, Value>,
        credential: Option<&Credential>,
    ) -> CatalogResult<ExecutionOutcome> {
        let operations = self.loader.load_namespace(namespace_id, credential).await?;
        let op = operations
            .iter()
            .find(|op| op.name() == operation)
            .ok_or_else(|| {
                CatalogError::not_found(format!(
                    "Operation '{}'",
                    QualifiedName::new(namespace_id, operation)
                ))
            })?;
        self.execute_operation(op, parameters, credential).await
    }

    /// Search namespaces in id order, loading each on demand; the first one
    /// that has the operation wins.
    async fn execute_legacy(
        &self,
        operation: &str,
        parameters: Map<String, Value>,
        credential: Option<&Credential>,
    ) -> CatalogResult<ExecutionOutcome> {
        for namespace_id in self.loader.known_namespace_ids(credential).await {
            let operations = match self.loader.load_namespace(&namespace_id, credential).await {
                Ok(operations) => operations,
                Err(e) => {
                    warn!(
                        namespace = %namespace_id,
                        operation,
                        "Skipping namespace during legacy lookup: {}",
                        e
                    );
                    continue;
                }
            };

            if let Some(op) = operations.iter().find(|op| op.name() == operation) {
                debug!(
                    operation,
                    namespace = %namespace_id,
                    "Legacy call resolved"
                );
                return self.execute_operation(op, parameters, credential).await;
            }
        }

        Err(CatalogError::not_found(format!("Operation '{}'", operation)))
    }

    async fn execute_operation(
        &self,
        op: &Operation,
        mut parameters: Map<String, Value>,
        credential: Option<&Credential>,
    ) -> CatalogResult<ExecutionOutcome> {
        coerce_arg_types(&mut parameters, &op.input_schema);

        let namespace_id = op.namespace_id();
        let routing = self
            .resolver
            .namespace_info(namespace_id)
            .map(|info| RoutingMetadata::from_namespace(&info))
            .unwrap_or_else(|| {
                RoutingMetadata::for_source(self.resolver.reverse_resolve(namespace_id))
            });

        let request = ExecutionRequest::new(op.name(), parameters, routing);
        match self.client.execute(request, credential).await {
            Ok(response) => Ok(ExecutionOutcome::from_upstream(response)),
            Err(e) if e.is_unavailable() || e.is_auth_failure() => Err(e),
            Err(e @ (CatalogError::UpstreamRejected { .. } | CatalogError::NotFound { .. })) => {
                warn!(operation = %op.qualified_name, "Upstream rejected execution: {}", e);
                Ok(ExecutionOutcome::failure(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

fn into_object(value: Value, what: &str) -> CatalogResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(CatalogError::InvalidInput(format!(
            "{} must be a JSON object, got {}",
            what,
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Split `{operation, parameters}` arguments of an execute call.
fn execute_args(mut args: Map<String, Value>) -> CatalogResult<(String, Map<String, Value>)> {
    let operation = match args.remove(OPERATION_ARG) {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        Some(_) => {
            return Err(CatalogError::InvalidInput(
                "'operation' must be a non-empty string".to_string(),
            ))
        }
        None => {
            return Err(CatalogError::InvalidInput(
                "missing required argument 'operation'".to_string(),
            ))
        }
    };
    let parameters = into_object(
        args.remove(PARAMETERS_ARG).unwrap_or(Value::Null),
        "'parameters'",
    )?;
    Ok((operation, parameters))
}

/// Convert numeric strings to numbers where the schema expects a number.
fn coerce_arg_types(args: &mut Map<String, Value>, schema: &Value) {
    let Some(props) = schema.get("properties").and_then(|p| p.as_object()) else {
        return;
    };

    for (key, val) in args.iter_mut() {
        let expected = props
            .get(key)
            .and_then(|s| s.get("type"))
            .and_then(|t| t.as_str());

        let Some(s) = val.as_str() else {
            continue;
        };
        match expected {
            Some("integer") => {
                if let Ok(num) = s.trim().parse::<i64>() {
                    *val = json!(num);
                }
            }
            Some("number") => {
                if let Ok(num) = s.trim().parse::<f64>() {
                    if num.is_finite() {
                        *val = json!(num);
                    }
                }
            }
            _ => {}
        }
    }
}
