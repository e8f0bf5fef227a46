//! Catalog service: owns the resolver, cache, loader, dispatcher and the
//! background sweeper for one running server.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::{task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{
    config::CatalogConfig,
    discovery::DiscoveryPage,
    loader::{InitReport, IntelligentLoader},
    metrics::LoaderMetricsSnapshot,
    sweeper::spawn_sweeper,
};
use crate::{
    credential::Credential,
    dispatch::{Dispatcher, ExecutionOutcome},
    error::CatalogResult,
    inventory::{CacheCounts, CatalogCache, NamespaceResolver, Operation, SweepReport},
    upstream::{CatalogClient, HttpCatalogClient},
};

pub struct CatalogService {
    config: Arc<CatalogConfig>,
    resolver: Arc<NamespaceResolver>,
    cache: Arc<CatalogCache>,
    loader: IntelligentLoader,
    dispatcher: Dispatcher,
    shutdown_token: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl CatalogService {
    /// Build the service and start the sweeper. Must be called from within
    /// a Tokio runtime.
    pub async fn new(config: CatalogConfig, client: Arc<dyn CatalogClient>) -> CatalogResult<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let resolver = Arc::new(NamespaceResolver::new());
        let cache = Arc::new(CatalogCache::new(config.cache_policy()));
        let loader = IntelligentLoader::new(
            Arc::clone(&client),
            Arc::clone(&resolver),
            Arc::clone(&cache),
            Arc::clone(&config),
        );
        let dispatcher = Dispatcher::new(
            client,
            Arc::clone(&resolver),
            loader.clone(),
            config.default_credential.clone(),
        );

        let shutdown_token = CancellationToken::new();
        let sweeper = spawn_sweeper(
            Arc::clone(&cache),
            config.sweep_interval(),
            shutdown_token.clone(),
        );

        info!(
            upstream = %config.upstream_base_url,
            max_namespaces = config.max_namespaces,
            preload = config.preload_namespaces.len(),
            "Catalog service started"
        );

        Ok(Self {
            config,
            resolver,
            cache,
            loader,
            dispatcher,
            shutdown_token,
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    /// Build the service over the HTTP upstream client.
    pub async fn connect(config: CatalogConfig) -> CatalogResult<Self> {
        config.validate()?;
        let client = HttpCatalogClient::new(&config.upstream_base_url, config.request_timeout())?;
        Self::new(config, Arc::new(client)).await
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    fn credential<'a>(&'a self, explicit: Option<&'a Credential>) -> Option<&'a Credential> {
        Credential::select(explicit, self.config.default_credential.as_ref())
    }

    /// Preload the configured namespaces (at most once until `refresh`).
    pub async fn initialize(&self, credential: Option<&Credential>) -> InitReport {
        self.loader.initialize(self.credential(credential)).await
    }

    pub async fn discovery_listing(
        &self,
        cursor: Option<&str>,
        page_size: Option<usize>,
        credential: Option<&Credential>,
    ) -> CatalogResult<DiscoveryPage> {
        self.loader
            .discovery_listing(cursor, page_size, self.credential(credential))
            .await
    }

    pub async fn load_namespace(
        &self,
        namespace_id: &str,
        credential: Option<&Credential>,
    ) -> CatalogResult<Arc<[Operation]>> {
        self.loader
            .load_namespace(namespace_id, self.credential(credential))
            .await
    }

    pub async fn dispatch(
        &self,
        call_name: &str,
        args: Value,
        credential: Option<&Credential>,
    ) -> CatalogResult<ExecutionOutcome> {
        self.dispatcher.dispatch(call_name, args, credential).await
    }

    /// Resolve a source name to its namespace id.
    pub fn resolve(&self, source_name: &str) -> CatalogResult<String> {
        self.resolver.resolve(source_name)
    }

    /// Forced refresh: drop cached operations and loader state, and expire
    /// the namespace listing so the next discovery goes upstream.
    pub fn refresh(&self) {
        self.loader.clear_caches();
        self.resolver.expire_snapshot();
        info!("Catalog refreshed");
    }

    /// Run a sweep now instead of waiting for the next interval.
    pub fn sweep_now(&self) -> SweepReport {
        self.cache.sweep(Instant::now())
    }

    pub fn cache_counts(&self) -> CacheCounts {
        self.cache.counts()
    }

    pub fn metrics(&self) -> LoaderMetricsSnapshot {
        self.loader.metrics()
    }

    pub fn is_loaded(&self, namespace_id: &str) -> bool {
        self.loader.is_loaded(namespace_id)
    }

    /// Stop the sweeper and wait for it to exit.
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();
        let handle = self.sweeper.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                debug!("Sweeper task ended abnormally: {}", e);
            }
        }
        info!("Catalog service shut down");
    }
}

impl Drop for CatalogService {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}
