//! Catalog error types.
//!
//! Errors are `Clone` so that a single in-flight namespace load can hand the
//! same failure to every caller waiting on it.

use thiserror::Error;

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream rejected request{}: {detail}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    UpstreamRejected { status: Option<u16>, detail: String },

    #[error("{what} not found. {suggestion}")]
    NotFound { what: String, suggestion: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CatalogError {
    const DISCOVERY_HINT: &'static str =
        "Re-run discovery to refresh the list of available namespaces and operations.";

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound {
            what: what.into(),
            suggestion: Self::DISCOVERY_HINT.to_string(),
        }
    }

    pub fn rejected(status: Option<u16>, detail: impl Into<String>) -> Self {
        Self::UpstreamRejected {
            status,
            detail: detail.into(),
        }
    }

    /// 401/403 from upstream. These propagate to the caller instead of being
    /// folded into a failed execution result.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::UpstreamRejected {
                status: Some(401 | 403),
                ..
            }
        )
    }

    /// Failures that should send discovery down its fallback chain.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_))
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::UpstreamUnavailable(format!("malformed upstream response: {err}"))
    }
}
