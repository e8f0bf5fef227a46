//! Catalog core: configuration, loading, discovery and the owning service.

pub mod config;
pub mod discovery;
pub mod loader;
pub mod metrics;
pub mod service;
pub mod sweeper;

pub use config::{CatalogConfig, ConfigValidationError, DEFAULT_FALLBACK_NAMESPACES};
pub use discovery::{DescriptorKind, DiscoveryPage, ListingSource, ToolDescriptor};
pub use loader::{InitReport, IntelligentLoader};
pub use metrics::{LatencySnapshot, LoaderMetrics, LoaderMetricsSnapshot};
pub use service::CatalogService;
