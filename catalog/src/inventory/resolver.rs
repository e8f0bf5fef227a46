//! Source name to namespace id resolution.
//!
//! Ids are assigned first-come-first-served and memoized for the lifetime of
//! the resolver, so the same source name always maps to the same id and two
//! different source names never share one. Reverse lookups go through the
//! most recent catalog snapshot only; a lossy reverse transformation of the
//! id is never attempted.

use std::{collections::HashMap, sync::Arc, time::Duration};

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    error::{CatalogError, CatalogResult},
    upstream::NamespaceInfo,
};

const ID_SEPARATOR: char = '_';
const EMPTY_BASE_ID: &str = "ns";

#[derive(Default)]
struct ResolutionMap {
    by_source: HashMap<String, String>,
    by_id: HashMap<String, String>,
}

/// Latest namespace listing, indexed by resolved id.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    namespaces: Arc<Vec<NamespaceInfo>>,
    index: Arc<HashMap<String, usize>>,
    /// `None` once the snapshot has been explicitly expired.
    fetched_at: Option<Instant>,
    /// Names only, from per-application discovery; no routing metadata.
    partial: bool,
}

impl CatalogSnapshot {
    pub fn namespaces(&self) -> &[NamespaceInfo] {
        &self.namespaces
    }

    pub fn get(&self, namespace_id: &str) -> Option<&NamespaceInfo> {
        self.index.get(namespace_id).map(|&i| &self.namespaces[i])
    }

    /// `(namespace_id, info)` pairs sorted by id.
    pub fn entries_by_id(&self) -> Vec<(&str, &NamespaceInfo)> {
        let mut entries: Vec<_> = self
            .index
            .iter()
            .map(|(id, &i)| (id.as_str(), &self.namespaces[i]))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Time since the listing was fetched; `None` once expired.
    pub fn age(&self) -> Option<Duration> {
        self.fetched_at.map(|at| at.elapsed())
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age().is_some_and(|age| age <= ttl)
    }
}

pub struct NamespaceResolver {
    map: RwLock<ResolutionMap>,
    snapshot: RwLock<Option<CatalogSnapshot>>,
}

impl NamespaceResolver {
    pub fn new() -> Self {
        Self {
            map: RwLock::new(ResolutionMap::default()),
            snapshot: RwLock::new(None),
        }
    }

    /// Resolve a source name to its canonical namespace id.
    pub fn resolve(&self, source_name: &str) -> CatalogResult<String> {
        if source_name.trim().is_empty() {
            return Err(CatalogError::InvalidInput(
                "namespace source name must be a non-empty string".to_string(),
            ));
        }

        if let Some(id) = self.map.read().by_source.get(source_name) {
            return Ok(id.clone());
        }

        let mut map = self.map.write();
        // Another caller may have assigned it between the read and write lock.
        if let Some(id) = map.by_source.get(source_name) {
            return Ok(id.clone());
        }

        let base = base_id(source_name);
        let mut candidate = base.clone();
        let mut suffix = 2u32;
        while map.by_id.contains_key(&candidate) {
            candidate = format!("{}{}{}", base, ID_SEPARATOR, suffix);
            suffix += 1;
        }

        if candidate != base {
            debug!(
                source = source_name,
                base = %base,
                assigned = %candidate,
                "Namespace id collision resolved with suffix"
            );
        }

        map.by_source
            .insert(source_name.to_string(), candidate.clone());
        map.by_id.insert(candidate.clone(), source_name.to_string());
        Ok(candidate)
    }

    /// Source name for a namespace id according to the latest snapshot, or
    /// the id itself when the snapshot has no exact match.
    pub fn reverse_resolve(&self, namespace_id: &str) -> String {
        self.snapshot
            .read()
            .as_ref()
            .and_then(|snapshot| snapshot.get(namespace_id))
            .map(|info| info.name.clone())
            .unwrap_or_else(|| namespace_id.to_string())
    }

    /// Snapshot entry for routing metadata lookups.
    pub fn namespace_info(&self, namespace_id: &str) -> Option<NamespaceInfo> {
        self.snapshot
            .read()
            .as_ref()
            .and_then(|snapshot| snapshot.get(namespace_id).cloned())
    }

    /// Install a new listing. Names are resolved in listing order so id
    /// assignment stays deterministic for a given upstream ordering.
    pub fn update_snapshot(&self, namespaces: Vec<NamespaceInfo>) -> CatalogSnapshot {
        self.install(namespaces, false)
    }

    /// Install names from a lower-fidelity listing. The snapshot serves
    /// reverse lookups but starts out expired and is marked partial.
    pub fn update_partial_snapshot(&self, source_names: Vec<String>) -> CatalogSnapshot {
        self.install(source_names.into_iter().map(NamespaceInfo::new).collect(), true)
    }

    fn install(&self, namespaces: Vec<NamespaceInfo>, partial: bool) -> CatalogSnapshot {
        let mut kept = Vec::with_capacity(namespaces.len());
        let mut index = HashMap::with_capacity(namespaces.len());

        for info in namespaces {
            let id = match self.resolve(&info.name) {
                Ok(id) => id,
                Err(e) => {
                    warn!("Skipping namespace with unusable name: {}", e);
                    continue;
                }
            };
            if index.contains_key(&id) {
                debug!(namespace = %id, "Duplicate namespace in listing ignored");
                continue;
            }
            index.insert(id, kept.len());
            kept.push(info);
        }

        let snapshot = CatalogSnapshot {
            namespaces: Arc::new(kept),
            index: Arc::new(index),
            fetched_at: (!partial).then(Instant::now),
            partial,
        };
        *self.snapshot.write() = Some(snapshot.clone());
        snapshot
    }

    pub fn snapshot(&self) -> Option<CatalogSnapshot> {
        self.snapshot.read().clone()
    }

    pub fn snapshot_age(&self) -> Option<Duration> {
        self.snapshot.read().as_ref().and_then(CatalogSnapshot::age)
    }

    /// Mark the snapshot stale without discarding it, so it can still serve
    /// routing lookups and degraded listings.
    pub fn expire_snapshot(&self) {
        if let Some(snapshot) = self.snapshot.write().as_mut() {
            snapshot.fetched_at = None;
        }
    }

    /// Number of memoized source names.
    pub fn len(&self) -> usize {
        self.map.read().by_source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NamespaceResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase, map non-alphanumerics to the separator, collapse runs and trim
/// separators at both ends.
fn base_id(source_name: &str) -> String {
    let mut out = String::with_capacity(source_name.len());
    let mut pending_separator = false;

    for c in source_name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push(ID_SEPARATOR);
            }
            pending_separator = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    if out.is_empty() {
        EMPTY_BASE_ID.to_string()
    } else {
        out
    }
}
