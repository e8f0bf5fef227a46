//! Call-name classification.

use crate::{
    core::discovery::{EXECUTE_SUFFIX, LIST_OPERATIONS_SUFFIX},
    error::{CatalogError, CatalogResult},
    inventory::{QualifiedName, NAMESPACE_SEPARATOR},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallKind {
    /// `{ns}__list_operations`
    ListOperations { namespace_id: String },
    /// `{ns}__execute` with the operation named in the arguments.
    Execute { namespace_id: String },
    /// `{ns}__{operation}`
    Namespaced(QualifiedName),
    /// No separator: search every namespace for the operation.
    Legacy { operation: String },
}

impl CallKind {
    pub fn namespace_id(&self) -> Option<&str> {
        match self {
            Self::ListOperations { namespace_id } | Self::Execute { namespace_id } => {
                Some(namespace_id.as_str())
            }
            Self::Namespaced(name) => Some(name.namespace_id()),
            Self::Legacy { .. } => None,
        }
    }
}

pub fn classify(call_name: &str) -> CatalogResult<CallKind> {
    let call_name = call_name.trim();
    if call_name.is_empty() {
        return Err(CatalogError::InvalidInput(
            "tool name must not be empty".to_string(),
        ));
    }

    if !call_name.contains(NAMESPACE_SEPARATOR) {
        return Ok(CallKind::Legacy {
            operation: call_name.to_string(),
        });
    }

    let name = QualifiedName::parse(call_name).ok_or_else(|| {
        CatalogError::InvalidInput(format!(
            "malformed tool name '{}': expected namespace{}operation",
            call_name, NAMESPACE_SEPARATOR
        ))
    })?;

    if name.operation() == LIST_OPERATIONS_SUFFIX {
        Ok(CallKind::ListOperations {
            namespace_id: name.namespace_id,
        })
    } else if name.operation() == EXECUTE_SUFFIX {
        Ok(CallKind::Execute {
            namespace_id: name.namespace_id,
        })
    } else {
        Ok(CallKind::Namespaced(name))
    }
}
