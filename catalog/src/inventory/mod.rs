//! Operation inventory.
//!
//! - Namespace resolution (source name to collision-free id)
//! - Namespace-partitioned operation cache with sweep-based eviction
//! - Qualified operation names and routing metadata

pub mod cache;
pub mod resolver;
pub mod types;

pub use cache::{
    CacheCounts, CachePolicy, CatalogCache, EvictionCallback, NamespaceUsage, SweepReport,
};
pub use resolver::{CatalogSnapshot, NamespaceResolver};
pub use types::{
    Operation, OperationCategory, PriorityTier, QualifiedName, RoutingMetadata,
    NAMESPACE_SEPARATOR,
};
