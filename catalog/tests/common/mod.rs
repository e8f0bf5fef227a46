//! Common test utilities for catalog integration tests

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use toolhub_catalog::{
    CatalogClient, CatalogConfig, CatalogError, CatalogResult, CatalogService, Credential,
    ExecutionRequest, NamespaceInfo, RemoteOperation,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("toolhub_catalog=debug")
        .with_test_writer()
        .try_init();
}

/// One recorded execution.
#[derive(Debug, Clone)]
pub struct ExecutedCall {
    pub request: ExecutionRequest,
    pub credential: Option<String>,
}

/// Scripted upstream. Every method counts its calls.
pub struct MockCatalogClient {
    namespaces: Mutex<CatalogResult<Vec<NamespaceInfo>>>,
    operations: Mutex<HashMap<String, CatalogResult<Vec<RemoteOperation>>>>,
    legacy_apps: Mutex<CatalogResult<Vec<String>>>,
    execute_response: Mutex<CatalogResult<Value>>,
    delay: Mutex<Option<Duration>>,
    operation_calls_by_source: Mutex<HashMap<String, usize>>,
    pub executed: Mutex<Vec<ExecutedCall>>,
    pub list_namespaces_calls: AtomicUsize,
    pub list_operations_calls: AtomicUsize,
    pub legacy_calls: AtomicUsize,
    pub execute_calls: AtomicUsize,
}

impl MockCatalogClient {
    pub fn new() -> Self {
        Self {
            namespaces: Mutex::new(Ok(Vec::new())),
            operations: Mutex::new(HashMap::new()),
            legacy_apps: Mutex::new(Err(CatalogError::UpstreamUnavailable(
                "legacy discovery not scripted".to_string(),
            ))),
            execute_response: Mutex::new(Ok(json!({ "data": {}, "successful": true }))),
            delay: Mutex::new(None),
            operation_calls_by_source: Mutex::new(HashMap::new()),
            executed: Mutex::new(Vec::new()),
            list_namespaces_calls: AtomicUsize::new(0),
            list_operations_calls: AtomicUsize::new(0),
            legacy_calls: AtomicUsize::new(0),
            execute_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_namespaces(self, namespaces: Vec<NamespaceInfo>) -> Self {
        *self.namespaces.lock() = Ok(namespaces);
        self
    }

    /// Register operations for a source name; each name becomes an
    /// operation with a one-line description.
    pub fn with_operations(self, source_name: &str, names: &[&str]) -> Self {
        let ops = names
            .iter()
            .map(|n| RemoteOperation::new(*n).with_description(format!("{} operation", n)))
            .collect();
        self.operations
            .lock()
            .insert(source_name.to_string(), Ok(ops));
        self
    }

    pub fn with_remote_operations(self, source_name: &str, ops: Vec<RemoteOperation>) -> Self {
        self.operations
            .lock()
            .insert(source_name.to_string(), Ok(ops));
        self
    }

    pub fn with_legacy_apps(self, apps: &[&str]) -> Self {
        *self.legacy_apps.lock() = Ok(apps.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    pub fn set_namespaces_result(&self, result: CatalogResult<Vec<NamespaceInfo>>) {
        *self.namespaces.lock() = result;
    }

    pub fn set_operations_result(
        &self,
        source_name: &str,
        result: CatalogResult<Vec<RemoteOperation>>,
    ) {
        self.operations
            .lock()
            .insert(source_name.to_string(), result);
    }

    pub fn set_legacy_result(&self, result: CatalogResult<Vec<String>>) {
        *self.legacy_apps.lock() = result;
    }

    pub fn set_execute_result(&self, result: CatalogResult<Value>) {
        *self.execute_response.lock() = result;
    }

    pub fn operation_calls_for(&self, source_name: &str) -> usize {
        self.operation_calls_by_source
            .lock()
            .get(source_name)
            .copied()
            .unwrap_or(0)
    }

    pub fn last_execution(&self) -> Option<ExecutedCall> {
        self.executed.lock().last().cloned()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    async fn maybe_delay(&self) {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for MockCatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogClient for MockCatalogClient {
    async fn list_namespaces(
        &self,
        _credential: Option<&Credential>,
    ) -> CatalogResult<Vec<NamespaceInfo>> {
        self.list_namespaces_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_delay().await;
        self.namespaces.lock().clone()
    }

    async fn list_operations(
        &self,
        source_name: &str,
        _credential: Option<&Credential>,
    ) -> CatalogResult<Vec<RemoteOperation>> {
        self.list_operations_calls.fetch_add(1, Ordering::SeqCst);
        *self
            .operation_calls_by_source
            .lock()
            .entry(source_name.to_string())
            .or_insert(0) += 1;
        self.maybe_delay().await;
        self.operations
            .lock()
            .get(source_name)
            .cloned()
            .unwrap_or_else(|| Err(CatalogError::not_found(format!("Namespace '{}'", source_name))))
    }

    async fn execute(
        &self,
        request: ExecutionRequest,
        credential: Option<&Credential>,
    ) -> CatalogResult<Value> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        self.executed.lock().push(ExecutedCall {
            request,
            credential: credential.map(|c| c.expose().to_string()),
        });
        self.execute_response.lock().clone()
    }

    async fn list_legacy_apps(
        &self,
        _credential: Option<&Credential>,
    ) -> CatalogResult<Vec<String>> {
        self.legacy_calls.fetch_add(1, Ordering::SeqCst);
        self.legacy_apps.lock().clone()
    }
}

/// Config with no preloads and a long sweep interval; tests override what
/// they exercise.
pub fn test_config() -> CatalogConfig {
    CatalogConfig {
        upstream_base_url: "http://catalog.test/api/".to_string(),
        preload_namespaces: Vec::new(),
        sweep_interval_secs: 3600,
        ..Default::default()
    }
}

pub async fn service_with(
    client: MockCatalogClient,
    config: CatalogConfig,
) -> (CatalogService, Arc<MockCatalogClient>) {
    init_tracing();
    let client = Arc::new(client);
    let service = CatalogService::new(config, client.clone())
        .await
        .expect("valid test config");
    (service, client)
}
