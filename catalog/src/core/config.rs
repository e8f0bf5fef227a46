//! Catalog configuration.
//!
//! Loaded by the host (file/env handling lives outside this crate) and
//! handed to [`crate::CatalogService::new`].

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{credential::Credential, error::CatalogError, inventory::CachePolicy};

/// Namespaces advertised when neither upstream listing nor legacy discovery
/// is reachable.
pub const DEFAULT_FALLBACK_NAMESPACES: &[&str] =
    &["platform", "company", "gmail", "slack", "github"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("upstream_base_url: {0}")]
    InvalidUpstreamUrl(String),

    #[error("{field} must be greater than 0")]
    Zero { field: &'static str },

    #[error("max_namespaces ({max_namespaces}) must be at least pinned_top_k ({pinned_top_k})")]
    CeilingBelowPinned {
        max_namespaces: usize,
        pinned_top_k: usize,
    },

    #[error("default_page_size ({default}) exceeds max_page_size ({max})")]
    PageSize { default: usize, max: usize },

    #[error("namespace name in {field} must not be blank")]
    BlankNamespace { field: &'static str },

    #[error("fallback_namespaces must name at least one namespace")]
    NoFallbackNamespaces,
}

impl From<ConfigValidationError> for CatalogError {
    fn from(err: ConfigValidationError) -> Self {
        CatalogError::Config(err.to_string())
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the upstream catalog service.
    #[serde(default = "default_upstream_base_url")]
    pub upstream_base_url: String,

    /// Credential attached to upstream calls unless a call supplies its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_credential: Option<Credential>,

    /// Per-request upstream timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// How long the namespace listing is considered fresh (seconds)
    #[serde(default = "default_listing_ttl")]
    pub listing_ttl_secs: u64,

    /// How long a namespace's operations are considered fresh (seconds)
    #[serde(default = "default_operations_ttl")]
    pub operations_ttl_secs: u64,

    /// Idle age after which an unpinned namespace is evicted (seconds)
    #[serde(default = "default_namespace_max_age")]
    pub namespace_max_age_secs: u64,

    /// Namespace ceiling enforced by the sweeper
    #[serde(default = "default_max_namespaces")]
    pub max_namespaces: usize,

    /// Most-used namespaces exempt from eviction
    #[serde(default = "default_pinned_top_k")]
    pub pinned_top_k: usize,

    /// Namespaces loaded by `initialize()`
    #[serde(default = "default_preload_namespaces")]
    pub preload_namespaces: Vec<String>,

    /// Preload concurrently instead of one after another
    #[serde(default = "default_true")]
    pub parallel_preload: bool,

    /// Background sweep interval (seconds)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Built-in namespaces for the last discovery fallback
    #[serde(default = "default_fallback_namespaces")]
    pub fallback_namespaces: Vec<String>,
}

// Default value functions
fn default_upstream_base_url() -> String {
    "http://localhost:8080/api/v1/".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_listing_ttl() -> u64 {
    300 // 5 minutes
}

fn default_operations_ttl() -> u64 {
    1800 // 30 minutes
}

fn default_namespace_max_age() -> u64 {
    3600 // 1 hour
}

fn default_max_namespaces() -> usize {
    20
}

fn default_pinned_top_k() -> usize {
    5
}

fn default_preload_namespaces() -> Vec<String> {
    vec!["platform".to_string(), "company".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_page_size() -> usize {
    50
}

fn default_max_page_size() -> usize {
    200
}

fn default_fallback_namespaces() -> Vec<String> {
    DEFAULT_FALLBACK_NAMESPACES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            upstream_base_url: default_upstream_base_url(),
            default_credential: None,
            request_timeout_secs: default_request_timeout(),
            listing_ttl_secs: default_listing_ttl(),
            operations_ttl_secs: default_operations_ttl(),
            namespace_max_age_secs: default_namespace_max_age(),
            max_namespaces: default_max_namespaces(),
            pinned_top_k: default_pinned_top_k(),
            preload_namespaces: default_preload_namespaces(),
            parallel_preload: true,
            sweep_interval_secs: default_sweep_interval(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            fallback_namespaces: default_fallback_namespaces(),
        }
    }
}

impl fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("upstream_base_url", &self.upstream_base_url)
            .field(
                "default_credential",
                &self.default_credential.as_ref().map(|_| "****"),
            )
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("listing_ttl_secs", &self.listing_ttl_secs)
            .field("operations_ttl_secs", &self.operations_ttl_secs)
            .field("namespace_max_age_secs", &self.namespace_max_age_secs)
            .field("max_namespaces", &self.max_namespaces)
            .field("pinned_top_k", &self.pinned_top_k)
            .field("preload_namespaces", &self.preload_namespaces)
            .field("parallel_preload", &self.parallel_preload)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("default_page_size", &self.default_page_size)
            .field("max_page_size", &self.max_page_size)
            .field("fallback_namespaces", &self.fallback_namespaces)
            .finish()
    }
}

impl CatalogConfig {
    /// Parse from YAML text. The result is validated.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| CatalogError::Config(format!("invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let url = Url::parse(self.upstream_base_url.trim())
            .map_err(|e| ConfigValidationError::InvalidUpstreamUrl(e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigValidationError::InvalidUpstreamUrl(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }

        let non_zero = [
            ("request_timeout_secs", self.request_timeout_secs),
            ("sweep_interval_secs", self.sweep_interval_secs),
            ("max_namespaces", self.max_namespaces as u64),
            ("default_page_size", self.default_page_size as u64),
            ("max_page_size", self.max_page_size as u64),
        ];
        if let Some((field, _)) = non_zero.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigValidationError::Zero { field: *field });
        }

        if self.max_namespaces < self.pinned_top_k {
            return Err(ConfigValidationError::CeilingBelowPinned {
                max_namespaces: self.max_namespaces,
                pinned_top_k: self.pinned_top_k,
            });
        }

        if self.default_page_size > self.max_page_size {
            return Err(ConfigValidationError::PageSize {
                default: self.default_page_size,
                max: self.max_page_size,
            });
        }

        if self.fallback_namespaces.is_empty() {
            return Err(ConfigValidationError::NoFallbackNamespaces);
        }

        let lists = [
            ("preload_namespaces", &self.preload_namespaces),
            ("fallback_namespaces", &self.fallback_namespaces),
        ];
        for (field, names) in lists {
            if names.iter().any(|n| n.trim().is_empty()) {
                return Err(ConfigValidationError::BlankNamespace { field });
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_secs)
    }

    pub fn operations_ttl(&self) -> Duration {
        Duration::from_secs(self.operations_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            max_age: Duration::from_secs(self.namespace_max_age_secs),
            max_namespaces: self.max_namespaces,
            pinned_top_k: self.pinned_top_k,
        }
    }

    /// Clamp a requested page size to `1..=max_page_size`, using the default
    /// when none is given.
    pub fn effective_page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size)
    }
}
