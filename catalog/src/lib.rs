//! Namespace-partitioned tool catalog.
//!
//! Sits between a tool protocol host and a large remote catalog of
//! operations. The host sees a bounded, paginated list of per-namespace
//! discovery tools; operations are fetched per namespace on first use and
//! calls are routed back to the namespace's upstream account context.
//!
//! ## Modules
//!
//! - [`inventory`]: namespace resolution, operation cache, core types
//! - [`core`]: configuration, loader, discovery listing, sweeper, service
//! - [`dispatch`]: call classification and execution routing
//! - [`upstream`]: the remote catalog contract and its HTTP client

pub mod credential;
pub mod error;

pub mod core;
pub mod dispatch;
pub mod inventory;
pub mod upstream;

pub use core::{
    CatalogConfig, CatalogService, ConfigValidationError, DescriptorKind, DiscoveryPage,
    InitReport, IntelligentLoader, ListingSource, LoaderMetricsSnapshot, ToolDescriptor,
};

pub use credential::Credential;
pub use dispatch::{CallKind, Dispatcher, ExecutionOutcome};
pub use error::{CatalogError, CatalogResult};
pub use inventory::{
    CatalogCache, NamespaceResolver, Operation, OperationCategory, PriorityTier, QualifiedName,
    RoutingMetadata, SweepReport,
};
pub use upstream::{
    CatalogClient, ExecutionRequest, HttpCatalogClient, NamespaceInfo, RemoteOperation,
};
