//! Lazy namespace loading.
//!
//! Each namespace moves `unloaded -> loading -> loaded`. A load that fails
//! returns the namespace to `unloaded`; a loaded namespace only becomes
//! unloaded again through eviction or [`IntelligentLoader::clear_caches`].
//!
//! Concurrent requests for the same namespace share one upstream fetch. The
//! fetch runs on its own task so a caller giving up does not abort it.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Instant as StdInstant,
};

use dashmap::DashSet;
use futures::{
    future::{join_all, ready, BoxFuture, Shared},
    FutureExt,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{
    config::{CatalogConfig, DEFAULT_FALLBACK_NAMESPACES},
    discovery::{
        build_descriptors, paginate, parse_cursor, DiscoveryPage, ListingEntry, ListingSource,
    },
    metrics::{LoaderMetrics, LoaderMetricsSnapshot},
};
use crate::{
    credential::Credential,
    error::{CatalogError, CatalogResult},
    inventory::{
        CatalogCache, CatalogSnapshot, NamespaceResolver, Operation, RoutingMetadata,
    },
    upstream::CatalogClient,
};

type LoadResult = CatalogResult<Arc<[Operation]>>;
type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

struct InFlightLoad {
    load_id: u64,
    future: SharedLoad,
}

/// Result of [`IntelligentLoader::initialize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitReport {
    pub loaded: Vec<String>,
    pub failed: Vec<(String, CatalogError)>,
    /// Initialization had already run; nothing was loaded.
    pub skipped: bool,
}

impl InitReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }
}

struct LoaderState {
    client: Arc<dyn CatalogClient>,
    resolver: Arc<NamespaceResolver>,
    cache: Arc<CatalogCache>,
    config: Arc<CatalogConfig>,
    loaded: Arc<DashSet<String>>,
    in_flight: Mutex<HashMap<String, InFlightLoad>>,
    initialized: AtomicBool,
    /// Bumped by `clear_caches`; loads started under an older generation
    /// do not register their results.
    generation: AtomicU64,
    next_load_id: AtomicU64,
    metrics: LoaderMetrics,
}

impl LoaderState {
    async fn fetch_and_register(
        &self,
        namespace_id: &str,
        credential: Option<Credential>,
        generation: u64,
        load_id: u64,
    ) -> LoadResult {
        let started = StdInstant::now();
        let source_name = self.resolver.reverse_resolve(namespace_id);
        debug!(
            namespace = namespace_id,
            source = %source_name,
            "Loading namespace operations"
        );

        let result = self
            .client
            .list_operations(&source_name, credential.as_ref())
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok(remote) => {
                let mut seen = HashSet::new();
                let operations: Vec<Operation> = remote
                    .into_iter()
                    .filter(|op| !op.name.trim().is_empty() && seen.insert(op.name.clone()))
                    .map(|op| Operation::from_remote(namespace_id, op))
                    .collect();

                if self.generation.load(Ordering::SeqCst) == generation {
                    self.cache.put(namespace_id, operations.clone());
                    self.loaded.insert(namespace_id.to_string());
                } else {
                    debug!(
                        namespace = namespace_id,
                        "Discarding namespace load that finished after a cache clear"
                    );
                }

                self.metrics.record_load(true, elapsed_ms);
                info!(
                    namespace = namespace_id,
                    operations = operations.len(),
                    elapsed_ms,
                    "Loaded namespace"
                );
                Ok(Arc::from(operations))
            }
            Err(e) => {
                self.metrics.record_load(false, elapsed_ms);
                warn!(
                    namespace = namespace_id,
                    source = %source_name,
                    "Failed to load namespace: {}",
                    e
                );
                Err(e)
            }
        };

        let mut in_flight = self.in_flight.lock();
        if in_flight
            .get(namespace_id)
            .is_some_and(|load| load.load_id == load_id)
        {
            in_flight.remove(namespace_id);
        }
        outcome
    }
}

/// Populates the [`CatalogCache`] on demand and serves the discovery listing.
#[derive(Clone)]
pub struct IntelligentLoader {
    inner: Arc<LoaderState>,
}

impl IntelligentLoader {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        resolver: Arc<NamespaceResolver>,
        cache: Arc<CatalogCache>,
        config: Arc<CatalogConfig>,
    ) -> Self {
        let loaded = Arc::new(DashSet::new());

        // Keep the loaded set in step with sweeper evictions.
        let evicted = Arc::clone(&loaded);
        cache.set_eviction_callback(Arc::new(move |namespace_id: &str| {
            evicted.remove(namespace_id);
        }));

        Self {
            inner: Arc::new(LoaderState {
                client,
                resolver,
                cache,
                config,
                loaded,
                in_flight: Mutex::new(HashMap::new()),
                initialized: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                next_load_id: AtomicU64::new(1),
                metrics: LoaderMetrics::new(),
            }),
        }
    }

    /// Loaded and still present in the cache.
    pub fn is_loaded(&self, namespace_id: &str) -> bool {
        self.inner.loaded.contains(namespace_id) && self.inner.cache.is_loaded(namespace_id)
    }

    pub fn is_in_flight(&self, namespace_id: &str) -> bool {
        self.inner.in_flight.lock().contains_key(namespace_id)
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    pub fn metrics(&self) -> LoaderMetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Preload the configured namespaces. Runs at most once until
    /// [`clear_caches`](Self::clear_caches); later calls return a skipped
    /// report. Individual failures are logged and reported, not raised.
    pub async fn initialize(&self, credential: Option<&Credential>) -> InitReport {
        if self
            .inner
            .initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Loader already initialized");
            return InitReport::skipped();
        }

        let targets = self.inner.config.preload_namespaces.clone();
        info!(
            namespaces = targets.len(),
            parallel = self.inner.config.parallel_preload,
            "Preloading namespaces"
        );

        let results: Vec<(String, LoadResult)> = if self.inner.config.parallel_preload {
            join_all(targets.into_iter().map(|id| async move {
                let result = self.load_namespace(&id, credential).await;
                (id, result)
            }))
            .await
        } else {
            let mut results = Vec::with_capacity(targets.len());
            for id in targets {
                let result = self.load_namespace(&id, credential).await;
                results.push((id, result));
            }
            results
        };

        let mut report = InitReport::default();
        for (id, result) in results {
            match result {
                Ok(_) => report.loaded.push(id),
                Err(e) => {
                    warn!(namespace = %id, "Preload failed: {}", e);
                    report.failed.push((id, e));
                }
            }
        }

        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "Preload complete"
        );
        report
    }

    /// Operations for a namespace, fetching them on first use.
    pub async fn load_namespace(
        &self,
        namespace_id: &str,
        credential: Option<&Credential>,
    ) -> LoadResult {
        if namespace_id.trim().is_empty() {
            return Err(CatalogError::InvalidInput(
                "namespace id must not be empty".to_string(),
            ));
        }

        if self.is_loaded(namespace_id) {
            let fresh = self
                .inner
                .cache
                .loaded_at(namespace_id)
                .is_some_and(|at| at.elapsed() <= self.inner.config.operations_ttl());

            if fresh {
                if let Some(operations) = self.inner.cache.operations(namespace_id) {
                    self.inner.metrics.record_hit();
                    return Ok(operations);
                }
            } else {
                debug!(namespace = namespace_id, "Namespace operations expired, refreshing");
                return match self.join_or_start(namespace_id, credential, false).await {
                    Ok(operations) => Ok(operations),
                    Err(e) => match self.inner.cache.operations(namespace_id) {
                        Some(stale) => {
                            warn!(
                                namespace = namespace_id,
                                "Refresh failed, serving stale operations: {}",
                                e
                            );
                            self.inner.metrics.record_stale_served();
                            Ok(stale)
                        }
                        None => Err(e),
                    },
                };
            }
        }

        self.inner.metrics.record_miss();
        self.join_or_start(namespace_id, credential, true).await
    }

    /// Join the namespace's in-flight load or start one. With `reuse_loaded`,
    /// a load that registered between the caller's miss and this lock is
    /// served from the cache instead of fetching again.
    fn join_or_start(
        &self,
        namespace_id: &str,
        credential: Option<&Credential>,
        reuse_loaded: bool,
    ) -> SharedLoad {
        let mut in_flight = self.inner.in_flight.lock();
        if let Some(load) = in_flight.get(namespace_id) {
            self.inner.metrics.record_joined();
            debug!(namespace = namespace_id, "Joining in-flight load");
            return load.future.clone();
        }

        // Loads register into the cache before clearing their in-flight
        // marker, so this check cannot miss a completed load.
        if reuse_loaded && self.is_loaded(namespace_id) {
            if let Some(operations) = self.inner.cache.operations(namespace_id) {
                debug!(namespace = namespace_id, "Namespace loaded while waiting");
                return ready(Ok(operations)).boxed().shared();
            }
        }

        let load_id = self.inner.next_load_id.fetch_add(1, Ordering::SeqCst);
        let generation = self.inner.generation.load(Ordering::SeqCst);
        let state = Arc::clone(&self.inner);
        let id = namespace_id.to_string();
        let credential = credential.cloned();

        let handle = tokio::spawn(async move {
            state
                .fetch_and_register(&id, credential, generation, load_id)
                .await
        });
        let future = async move {
            handle.await.unwrap_or_else(|e| {
                Err(CatalogError::UpstreamUnavailable(format!(
                    "namespace load task failed: {}",
                    e
                )))
            })
        }
        .boxed()
        .shared();

        in_flight.insert(
            namespace_id.to_string(),
            InFlightLoad {
                load_id,
                future: future.clone(),
            },
        );
        future
    }

    /// One page of the discovery listing.
    pub async fn discovery_listing(
        &self,
        cursor: Option<&str>,
        page_size: Option<usize>,
        credential: Option<&Credential>,
    ) -> CatalogResult<DiscoveryPage> {
        let offset = parse_cursor(cursor)?;
        let page_size = self.inner.config.effective_page_size(page_size);
        let (entries, source) = self.listing_entries(credential).await;
        let descriptors = build_descriptors(&entries, &self.inner.config.preload_namespaces);
        paginate(descriptors, offset, page_size, source)
    }

    /// Namespace ids a legacy flat call should search, sorted.
    pub async fn known_namespace_ids(&self, credential: Option<&Credential>) -> Vec<String> {
        let (entries, _) = self.listing_entries(credential).await;
        let mut ids: BTreeSet<String> = entries.into_iter().map(|e| e.namespace_id).collect();
        ids.extend(self.inner.cache.namespace_ids());
        ids.into_iter().collect()
    }

    /// Walk the fallback chain until something yields namespaces: fresh
    /// snapshot, upstream listing, stale snapshot, legacy apps, built-ins.
    async fn listing_entries(
        &self,
        credential: Option<&Credential>,
    ) -> (Vec<ListingEntry>, ListingSource) {
        let state = &self.inner;
        let snapshot = state
            .resolver
            .snapshot()
            .filter(|s| !s.is_empty() && !s.is_partial());

        if let Some(snapshot) = &snapshot {
            if snapshot.is_fresh(state.config.listing_ttl()) {
                return (snapshot_entries(snapshot), ListingSource::Cached);
            }
        }

        match state.client.list_namespaces(credential).await {
            Ok(namespaces) if !namespaces.is_empty() => {
                let snapshot = state.resolver.update_snapshot(namespaces);
                if !snapshot.is_empty() {
                    info!(namespaces = snapshot.len(), "Refreshed namespace listing");
                    return (snapshot_entries(&snapshot), ListingSource::Fresh);
                }
                warn!("Upstream namespace listing had no usable entries");
            }
            Ok(_) => warn!("Upstream namespace listing is empty"),
            Err(e) => warn!("Namespace listing failed: {}", e),
        }

        if let Some(snapshot) = &snapshot {
            warn!(
                namespaces = snapshot.len(),
                "Serving stale namespace listing"
            );
            return (snapshot_entries(snapshot), ListingSource::Stale);
        }

        match state.client.list_legacy_apps(credential).await {
            Ok(apps) if !apps.is_empty() => {
                // Routing maps ids back through this; the next listing still
                // retries upstream.
                let snapshot = state.resolver.update_partial_snapshot(apps);
                if !snapshot.is_empty() {
                    info!(apps = snapshot.len(), "Using legacy app discovery");
                    return (partial_entries(&snapshot), ListingSource::Legacy);
                }
            }
            Ok(_) => warn!("Legacy app discovery returned nothing"),
            Err(e) => warn!("Legacy app discovery failed: {}", e),
        }

        warn!("Falling back to built-in namespaces");
        let mut snapshot = state
            .resolver
            .update_partial_snapshot(state.config.fallback_namespaces.clone());
        if snapshot.is_empty() {
            warn!("No usable built-in namespaces configured, using defaults");
            snapshot = state.resolver.update_partial_snapshot(
                DEFAULT_FALLBACK_NAMESPACES
                    .iter()
                    .map(|name| name.to_string())
                    .collect(),
            );
        }
        (partial_entries(&snapshot), ListingSource::Builtin)
    }

    /// Reset loader state and drop cached operations. Loads still in flight
    /// finish but their results are not registered.
    pub fn clear_caches(&self) {
        let state = &self.inner;
        state.generation.fetch_add(1, Ordering::SeqCst);
        state.in_flight.lock().clear();
        state.loaded.clear();
        state.cache.clear();
        state.initialized.store(false, Ordering::SeqCst);
        state.metrics.reset();
        info!("Cleared loader caches");
    }
}

/// Names-only entries; no execute descriptors without routing metadata.
fn partial_entries(snapshot: &CatalogSnapshot) -> Vec<ListingEntry> {
    snapshot
        .entries_by_id()
        .into_iter()
        .map(|(id, info)| ListingEntry::bare(id, info.label()))
        .collect()
}

fn snapshot_entries(snapshot: &CatalogSnapshot) -> Vec<ListingEntry> {
    snapshot
        .entries_by_id()
        .into_iter()
        .map(|(id, info)| ListingEntry {
            namespace_id: id.to_string(),
            label: info.label().to_string(),
            routing: Some(RoutingMetadata::from_namespace(info)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{sync::atomic::AtomicUsize, time::Duration};

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::{
        inventory::CachePolicy,
        upstream::{ExecutionRequest, NamespaceInfo, RemoteOperation},
    };

    /// Counts calls; fails the first `fail_first` operation listings.
    /// `listing_down` fails the namespace listing.
    #[derive(Default)]
    struct CountingClient {
        list_calls: AtomicUsize,
        fail_first: usize,
        delay: Option<Duration>,
        listing_down: bool,
        sources: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CatalogClient for CountingClient {
        async fn list_namespaces(
            &self,
            _credential: Option<&Credential>,
        ) -> CatalogResult<Vec<NamespaceInfo>> {
            if self.listing_down {
                return Err(CatalogError::UpstreamUnavailable("listing down".to_string()));
            }
            Ok(vec![NamespaceInfo::new("Slack").with_connection("c-1")])
        }

        async fn list_operations(
            &self,
            source_name: &str,
            _credential: Option<&Credential>,
        ) -> CatalogResult<Vec<RemoteOperation>> {
            let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.sources.lock().push(source_name.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if call < self.fail_first {
                return Err(CatalogError::UpstreamUnavailable("boom".to_string()));
            }
            Ok(vec![
                RemoteOperation::new(format!("{}_list", source_name.to_lowercase())),
                RemoteOperation::new("dup"),
                RemoteOperation::new("dup"),
                RemoteOperation::new(" "),
            ])
        }

        async fn execute(
            &self,
            _request: ExecutionRequest,
            _credential: Option<&Credential>,
        ) -> CatalogResult<Value> {
            Ok(Value::Null)
        }

        async fn list_legacy_apps(
            &self,
            _credential: Option<&Credential>,
        ) -> CatalogResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn loader_with(
        client: CountingClient,
        config: CatalogConfig,
    ) -> (IntelligentLoader, Arc<CountingClient>) {
        let client = Arc::new(client);
        let config = Arc::new(config);
        let loader = IntelligentLoader::new(
            client.clone(),
            Arc::new(NamespaceResolver::new()),
            Arc::new(CatalogCache::new(config.cache_policy())),
            config,
        );
        (loader, client)
    }

    #[tokio::test]
    async fn test_load_then_hit() {
        let (loader, client) = loader_with(CountingClient::default(), CatalogConfig::default());

        let ops = loader.load_namespace("slack", None).await.unwrap();
        // Blank and duplicate names dropped.
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].full_name(), "slack__slack_list");
        assert!(loader.is_loaded("slack"));

        loader.load_namespace("slack", None).await.unwrap();
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 1);

        let metrics = loader.metrics();
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.loads, 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_marked_loaded() {
        let client = CountingClient {
            fail_first: 1,
            ..Default::default()
        };
        let (loader, client) = loader_with(client, CatalogConfig::default());

        let err = loader.load_namespace("slack", None).await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(!loader.is_loaded("slack"));
        assert!(!loader.is_in_flight("slack"));
        assert_eq!(loader.metrics().failures, 1);

        // Retry goes back upstream and succeeds.
        loader.load_namespace("slack", None).await.unwrap();
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_loads_share_one_fetch() {
        let client = CountingClient {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        };
        let (loader, client) = loader_with(client, CatalogConfig::default());

        let results = join_all((0..10).map(|_| loader.load_namespace("github", None))).await;
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(loader.metrics().joined, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_operations_refresh_and_serve_stale_on_failure() {
        let config = CatalogConfig {
            operations_ttl_secs: 10,
            ..Default::default()
        };
        let client = CountingClient::default();
        let (loader, client) = loader_with(client, config);

        loader.load_namespace("slack", None).await.unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;

        // Expired: refreshed through upstream.
        loader.load_namespace("slack", None).await.unwrap();
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 2);
        // Fresh again.
        loader.load_namespace("slack", None).await.unwrap();
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_operations_served_when_refresh_fails() {
        let config = CatalogConfig {
            operations_ttl_secs: 10,
            ..Default::default()
        };
        let (loader, _client) = loader_with(CountingClient::default(), config);
        loader.load_namespace("slack", None).await.unwrap();

        // Second loader over the same state whose upstream always fails.
        let failing = Arc::new(CountingClient {
            fail_first: usize::MAX,
            ..Default::default()
        });
        let stale_loader = IntelligentLoader {
            inner: Arc::new(LoaderState {
                client: failing,
                resolver: Arc::clone(&loader.inner.resolver),
                cache: Arc::clone(&loader.inner.cache),
                config: Arc::clone(&loader.inner.config),
                loaded: Arc::clone(&loader.inner.loaded),
                in_flight: Mutex::new(HashMap::new()),
                initialized: AtomicBool::new(true),
                generation: AtomicU64::new(0),
                next_load_id: AtomicU64::new(1),
                metrics: LoaderMetrics::new(),
            }),
        };

        tokio::time::advance(Duration::from_secs(11)).await;
        let ops = stale_loader.load_namespace("slack", None).await.unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(stale_loader.metrics().stale_served, 1);
    }

    #[tokio::test]
    async fn test_initialize_runs_once() {
        let config = CatalogConfig {
            preload_namespaces: vec!["platform".to_string(), "company".to_string()],
            parallel_preload: false,
            ..Default::default()
        };
        let (loader, client) = loader_with(CountingClient::default(), config);

        let report = loader.initialize(None).await;
        assert_eq!(report.loaded, vec!["platform", "company"]);
        assert!(report.failed.is_empty());
        assert!(loader.is_initialized());

        let again = loader.initialize(None).await;
        assert!(again.skipped);
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 2);

        loader.clear_caches();
        assert!(!loader.is_initialized());
        assert!(!loader.is_loaded("platform"));
        loader.initialize(None).await;
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_initialize_tolerates_failures() {
        let client = CountingClient {
            fail_first: 1,
            ..Default::default()
        };
        let config = CatalogConfig {
            preload_namespaces: vec!["platform".to_string(), "company".to_string()],
            parallel_preload: false,
            ..Default::default()
        };
        let (loader, _client) = loader_with(client, config);

        let report = loader.initialize(None).await;
        assert_eq!(report.loaded, vec!["company"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "platform");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_during_load_discards_result() {
        let client = CountingClient {
            delay: Some(Duration::from_millis(100)),
            ..Default::default()
        };
        let (loader, _client) = loader_with(client, CatalogConfig::default());

        let pending = loader.load_namespace("slack", None);
        let clearer = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            loader.clear_caches();
        };
        let (result, ()) = tokio::join!(pending, clearer);

        // The caller still gets its operations, but nothing is registered.
        assert!(result.is_ok());
        assert!(!loader.is_loaded("slack"));
        assert!(!loader.inner.cache.is_loaded("slack"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_unmarks_loaded() {
        let config = CatalogConfig {
            namespace_max_age_secs: 5,
            pinned_top_k: 0,
            ..Default::default()
        };
        let (loader, _client) = loader_with(CountingClient::default(), config);
        assert_eq!(
            loader.inner.cache.policy(),
            CachePolicy {
                max_age: Duration::from_secs(5),
                max_namespaces: 20,
                pinned_top_k: 0
            }
        );

        loader.load_namespace("slack", None).await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        loader.inner.cache.sweep(tokio::time::Instant::now());

        assert!(!loader.is_loaded("slack"));
        assert!(!loader.inner.loaded.contains("slack"));
    }

    #[tokio::test]
    async fn test_discovery_listing_fresh_then_cached() {
        let (loader, _client) = loader_with(CountingClient::default(), CatalogConfig::default());

        let page = loader.discovery_listing(None, None, None).await.unwrap();
        assert_eq!(page.source, ListingSource::Fresh);
        let names: Vec<&str> = page.descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["slack__list_operations", "slack__execute"]);

        let page = loader.discovery_listing(None, None, None).await.unwrap();
        assert_eq!(page.source, ListingSource::Cached);
    }

    #[tokio::test]
    async fn test_join_or_start_reuses_completed_load() {
        let (loader, client) = loader_with(CountingClient::default(), CatalogConfig::default());
        loader.load_namespace("slack", None).await.unwrap();

        // A miss that lost the race to a finished load is served from cache.
        let ops = loader.join_or_start("slack", None, true).await.unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 1);

        // Refreshes always go upstream.
        loader.join_or_start("slack", None, false).await.unwrap();
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_builtin_listing_routes_by_source_name() {
        let client = CountingClient {
            listing_down: true,
            ..Default::default()
        };
        let config = CatalogConfig {
            fallback_namespaces: vec!["Google Drive".to_string()],
            ..Default::default()
        };
        let (loader, client) = loader_with(client, config);

        let page = loader.discovery_listing(None, None, None).await.unwrap();
        assert_eq!(page.source, ListingSource::Builtin);
        let names: Vec<&str> = page.descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["google_drive__list_operations"]);

        loader.load_namespace("google_drive", None).await.unwrap();
        assert_eq!(*client.sources.lock(), vec!["Google Drive".to_string()]);
    }

    #[tokio::test]
    async fn test_builtin_listing_never_empty() {
        let client = CountingClient {
            listing_down: true,
            ..Default::default()
        };
        let config = CatalogConfig {
            fallback_namespaces: Vec::new(),
            ..Default::default()
        };
        let (loader, _client) = loader_with(client, config);

        let page = loader.discovery_listing(None, None, None).await.unwrap();
        assert_eq!(page.source, ListingSource::Builtin);
        assert_eq!(page.total, DEFAULT_FALLBACK_NAMESPACES.len());
        assert!(page
            .descriptors
            .iter()
            .any(|d| d.name == "platform__list_operations"));
    }

    #[tokio::test]
    async fn test_empty_namespace_id_rejected() {
        let (loader, client) = loader_with(CountingClient::default(), CatalogConfig::default());
        assert!(matches!(
            loader.load_namespace("  ", None).await,
            Err(CatalogError::InvalidInput(_))
        ));
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 0);
    }
}
