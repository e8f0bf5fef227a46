//! Namespace-partitioned operation cache.
//!
//! Operations are stored per namespace behind a single `RwLock`, so a reader
//! sees either the whole namespace or none of it. Access tracking (last
//! access, access count) uses per-entry atomics and mutexes so lookups only
//! need the read lock. Bounding is done by [`CatalogCache::sweep`], which the
//! background sweeper runs periodically; inserts never evict.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};

use super::types::{Operation, QualifiedName};

/// Invoked once per namespace removed by a sweep, while the sweep still
/// holds the cache write lock. It must not call back into the cache.
pub type EvictionCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Bounds applied by [`CatalogCache::sweep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Namespaces idle longer than this are evicted unless pinned.
    pub max_age: Duration,
    /// Namespace ceiling enforced after the age stage.
    pub max_namespaces: usize,
    /// Number of most-used namespaces exempt from eviction.
    pub pinned_top_k: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(3600),
            max_namespaces: 20,
            pinned_top_k: 5,
        }
    }
}

struct NamespaceEntry {
    operations: Arc<[Operation]>,
    by_name: HashMap<String, usize>,
    loaded_at: Instant,
    last_access: Mutex<Instant>,
    access_count: AtomicU64,
}

impl NamespaceEntry {
    fn new(operations: Vec<Operation>, now: Instant, access_count: u64) -> Self {
        let by_name = operations
            .iter()
            .enumerate()
            .map(|(i, op)| (op.name().to_string(), i))
            .collect();
        Self {
            operations: operations.into(),
            by_name,
            loaded_at: now,
            last_access: Mutex::new(now),
            access_count: AtomicU64::new(access_count),
        }
    }

    fn touch(&self) {
        self.access_count.fetch_add(1, Ordering::Relaxed);
        *self.last_access.lock() = Instant::now();
    }

    fn last_access(&self) -> Instant {
        *self.last_access.lock()
    }

    fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }
}

/// Usage figures for one cached namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceUsage {
    pub operations: usize,
    pub access_count: u64,
    pub loaded_at: Instant,
    pub last_access: Instant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheCounts {
    pub namespaces: usize,
    pub operations: usize,
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Evicted for exceeding the idle age.
    pub stale_evicted: Vec<String>,
    /// Evicted to get back under the namespace ceiling.
    pub overflow_evicted: Vec<String>,
    pub remaining: usize,
}

impl SweepReport {
    pub fn evicted(&self) -> usize {
        self.stale_evicted.len() + self.overflow_evicted.len()
    }
}

pub struct CatalogCache {
    namespaces: RwLock<HashMap<String, NamespaceEntry>>,
    policy: CachePolicy,
    on_evict: RwLock<Option<EvictionCallback>>,
}

impl CatalogCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
            policy,
            on_evict: RwLock::new(None),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn set_eviction_callback(&self, callback: EvictionCallback) {
        *self.on_evict.write() = Some(callback);
    }

    /// Replace a namespace's operations. The load timestamp is reset; the
    /// access count carries over from the previous entry.
    pub fn put(&self, namespace_id: &str, operations: Vec<Operation>) {
        let now = Instant::now();
        let mut namespaces = self.namespaces.write();
        let previous_count = namespaces
            .get(namespace_id)
            .map(NamespaceEntry::access_count)
            .unwrap_or(0);
        let count = operations.len();
        namespaces.insert(
            namespace_id.to_string(),
            NamespaceEntry::new(operations, now, previous_count),
        );
        debug!(
            namespace = namespace_id,
            operations = count,
            "Registered namespace operations"
        );
    }

    /// Look up one operation and record the access against its namespace.
    pub fn get(&self, qualified_name: &QualifiedName) -> Option<Operation> {
        let namespaces = self.namespaces.read();
        let entry = namespaces.get(qualified_name.namespace_id())?;
        entry.touch();
        entry
            .by_name
            .get(qualified_name.operation())
            .map(|&i| entry.operations[i].clone())
    }

    /// All operations of a namespace, empty when it is not cached.
    pub fn list_namespace_operations(&self, namespace_id: &str) -> Vec<Operation> {
        self.operations(namespace_id)
            .map(|ops| ops.to_vec())
            .unwrap_or_default()
    }

    /// Shared handle to a namespace's operations, recording the access.
    pub fn operations(&self, namespace_id: &str) -> Option<Arc<[Operation]>> {
        let namespaces = self.namespaces.read();
        let entry = namespaces.get(namespace_id)?;
        entry.touch();
        Some(Arc::clone(&entry.operations))
    }

    pub fn is_loaded(&self, namespace_id: &str) -> bool {
        self.namespaces.read().contains_key(namespace_id)
    }

    pub fn loaded_at(&self, namespace_id: &str) -> Option<Instant> {
        self.namespaces
            .read()
            .get(namespace_id)
            .map(|entry| entry.loaded_at)
    }

    pub fn usage(&self, namespace_id: &str) -> Option<NamespaceUsage> {
        self.namespaces
            .read()
            .get(namespace_id)
            .map(|entry| NamespaceUsage {
                operations: entry.operations.len(),
                access_count: entry.access_count(),
                loaded_at: entry.loaded_at,
                last_access: entry.last_access(),
            })
    }

    /// Cached namespace ids, sorted.
    pub fn namespace_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.namespaces.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn counts(&self) -> CacheCounts {
        let namespaces = self.namespaces.read();
        CacheCounts {
            namespaces: namespaces.len(),
            operations: namespaces.values().map(|e| e.operations.len()).sum(),
        }
    }

    pub fn clear(&self) {
        self.namespaces.write().clear();
    }

    /// Evict idle namespaces, then enforce the namespace ceiling.
    ///
    /// The `pinned_top_k` most-accessed namespaces (ties broken by id, zero
    /// counts never pinned) survive both stages. Eviction and the eviction
    /// callbacks happen under one write lock, so a concurrent `put` cannot
    /// land between removing a namespace and notifying about it.
    pub fn sweep(&self, now: Instant) -> SweepReport {
        let mut report = SweepReport::default();
        {
            let mut namespaces = self.namespaces.write();
            let pinned = pinned_set(&namespaces, self.policy.pinned_top_k);

            let stale: Vec<String> = namespaces
                .iter()
                .filter(|(id, entry)| {
                    !pinned.contains(id.as_str())
                        && now.saturating_duration_since(entry.last_access()) > self.policy.max_age
                })
                .map(|(id, _)| id.clone())
                .collect();
            for id in stale {
                namespaces.remove(&id);
                report.stale_evicted.push(id);
            }

            if namespaces.len() > self.policy.max_namespaces {
                let mut candidates: Vec<(Instant, String)> = namespaces
                    .iter()
                    .filter(|(id, _)| !pinned.contains(id.as_str()))
                    .map(|(id, entry)| (entry.last_access(), id.clone()))
                    .collect();
                candidates.sort();

                for (_, id) in candidates {
                    if namespaces.len() <= self.policy.max_namespaces {
                        break;
                    }
                    namespaces.remove(&id);
                    report.overflow_evicted.push(id);
                }
            }

            report.remaining = namespaces.len();
            report.stale_evicted.sort();

            if report.evicted() > 0 {
                let callback = self.on_evict.read().clone();
                if let Some(callback) = callback {
                    for id in report
                        .stale_evicted
                        .iter()
                        .chain(report.overflow_evicted.iter())
                    {
                        callback(id);
                    }
                }
            }
        }

        if report.evicted() > 0 {
            info!(
                stale = report.stale_evicted.len(),
                overflow = report.overflow_evicted.len(),
                remaining = report.remaining,
                "Swept namespace cache"
            );
        }
        report
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

fn pinned_set(namespaces: &HashMap<String, NamespaceEntry>, top_k: usize) -> HashSet<String> {
    let mut used: Vec<(u64, &String)> = namespaces
        .iter()
        .map(|(id, entry)| (entry.access_count(), id))
        .filter(|(count, _)| *count > 0)
        .collect();
    used.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    used.into_iter()
        .take(top_k)
        .map(|(_, id)| id.clone())
        .collect()
}
