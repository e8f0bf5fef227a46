//! Discovery listing: synthetic per-namespace descriptors and pagination.
//!
//! The listing never exposes individual operations. Each namespace gets a
//! `{ns}__list_operations` descriptor and, when routing metadata is known, a
//! `{ns}__execute` descriptor. Operations are only fetched when one of these
//! is called.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    error::{CatalogError, CatalogResult},
    inventory::{PriorityTier, RoutingMetadata, NAMESPACE_SEPARATOR},
};

pub const LIST_OPERATIONS_SUFFIX: &str = "list_operations";
pub const EXECUTE_SUFFIX: &str = "execute";

/// Descriptor category; discovery descriptors sort before execute ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    Discovery,
    Execute,
}

/// Where a listing's namespaces came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingSource {
    /// Fetched from upstream for this request.
    Fresh,
    /// Snapshot still within the listing TTL.
    Cached,
    /// Expired snapshot served because upstream failed.
    Stale,
    /// Per-application discovery.
    Legacy,
    /// Configured well-known namespaces.
    Builtin,
}

/// One advertised tool in the discovery listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub kind: DescriptorKind,
    pub priority: PriorityTier,
    pub namespace_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryPage {
    pub descriptors: Vec<ToolDescriptor>,
    /// Cursor for the next page; `None` on the last page.
    pub next_cursor: Option<String>,
    pub total: usize,
    pub source: ListingSource,
}

/// One namespace as seen by the listing, before descriptor synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    pub namespace_id: String,
    pub label: String,
    /// Present when the namespace came from the full listing.
    pub routing: Option<RoutingMetadata>,
}

impl ListingEntry {
    pub fn bare(namespace_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            namespace_id: namespace_id.into(),
            label: label.into(),
            routing: None,
        }
    }
}

pub fn list_operations_name(namespace_id: &str) -> String {
    format!(
        "{}{}{}",
        namespace_id, NAMESPACE_SEPARATOR, LIST_OPERATIONS_SUFFIX
    )
}

pub fn execute_name(namespace_id: &str) -> String {
    format!("{}{}{}", namespace_id, NAMESPACE_SEPARATOR, EXECUTE_SUFFIX)
}

fn priority_for(entry: &ListingEntry, preload: &HashSet<&str>) -> PriorityTier {
    if preload.contains(entry.namespace_id.as_str()) {
        PriorityTier::High
    } else if entry.routing.as_ref().is_some_and(|r| r.has_connection()) {
        PriorityTier::Normal
    } else {
        PriorityTier::Low
    }
}

fn execute_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "operation": {
                "type": "string",
                "description": "Name of the operation to run, as returned by list_operations"
            },
            "parameters": {
                "type": "object",
                "description": "Arguments for the operation"
            }
        },
        "required": ["operation"]
    })
}

/// Build and order descriptors: kind, then priority tier, then name.
pub fn build_descriptors(entries: &[ListingEntry], preload: &[String]) -> Vec<ToolDescriptor> {
    let preload: HashSet<&str> = preload.iter().map(String::as_str).collect();
    let mut descriptors = Vec::with_capacity(entries.len() * 2);

    for entry in entries {
        let priority = priority_for(entry, &preload);
        descriptors.push(ToolDescriptor {
            name: list_operations_name(&entry.namespace_id),
            description: format!(
                "List the operations available in {}. Call this before executing one.",
                entry.label
            ),
            input_schema: json!({ "type": "object", "properties": {} }),
            kind: DescriptorKind::Discovery,
            priority,
            namespace_id: entry.namespace_id.clone(),
        });

        if let Some(routing) = &entry.routing {
            let account = routing
                .account_label
                .as_deref()
                .map(|label| format!(" ({})", label))
                .unwrap_or_default();
            descriptors.push(ToolDescriptor {
                name: execute_name(&entry.namespace_id),
                description: format!("Execute an operation in {}{}.", entry.label, account),
                input_schema: execute_schema(),
                kind: DescriptorKind::Execute,
                priority,
                namespace_id: entry.namespace_id.clone(),
            });
        }
    }

    descriptors.sort_by(|a, b| {
        a.kind
            .cmp(&b.kind)
            .then(a.priority.cmp(&b.priority))
            .then_with(|| a.name.cmp(&b.name))
    });
    descriptors
}

/// Decode a cursor into an offset. A missing or empty cursor is the first page.
pub fn parse_cursor(cursor: Option<&str>) -> CatalogResult<usize> {
    match cursor.map(str::trim) {
        None | Some("") => Ok(0),
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| CatalogError::InvalidInput(format!("invalid cursor: {:?}", raw))),
    }
}

pub fn paginate(
    descriptors: Vec<ToolDescriptor>,
    offset: usize,
    page_size: usize,
    source: ListingSource,
) -> CatalogResult<DiscoveryPage> {
    let total = descriptors.len();
    if offset > 0 && offset >= total {
        return Err(CatalogError::InvalidInput(format!(
            "cursor {} is past the end of the listing ({} entries)",
            offset, total
        )));
    }

    let end = offset.saturating_add(page_size.max(1)).min(total);
    let next_cursor = (end < total).then(|| end.to_string());
    let descriptors = descriptors
        .into_iter()
        .skip(offset)
        .take(end - offset)
        .collect();

    Ok(DiscoveryPage {
        descriptors,
        next_cursor,
        total,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routed(id: &str, connection: Option<&str>) -> ListingEntry {
        ListingEntry {
            namespace_id: id.to_string(),
            label: id.to_string(),
            routing: Some(RoutingMetadata {
                source_name: id.to_string(),
                connection_id: connection.map(str::to_string),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_descriptor_names() {
        assert_eq!(list_operations_name("gmail_work"), "gmail_work__list_operations");
        assert_eq!(execute_name("gmail_work"), "gmail_work__execute");
    }

    #[test]
    fn test_build_descriptors_ordering() {
        let entries = vec![
            ListingEntry::bare("zendesk", "Zendesk"),
            routed("slack", Some("conn-1")),
            routed("platform", None),
            routed("asana", None),
        ];
        let descriptors = build_descriptors(&entries, &["platform".to_string()]);
        let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "platform__list_operations", // preload
                "slack__list_operations",    // connected
                "asana__list_operations",
                "zendesk__list_operations",
                "platform__execute",
                "slack__execute",
                "asana__execute",
            ]
        );
        // Namespaces without routing metadata get no execute descriptor.
        assert!(!names.contains(&"zendesk__execute"));
    }

    #[test]
    fn test_execute_descriptor_schema() {
        let descriptors = build_descriptors(&[routed("github", Some("c"))], &[]);
        let execute = descriptors
            .iter()
            .find(|d| d.kind == DescriptorKind::Execute)
            .unwrap();
        assert_eq!(execute.input_schema["required"], json!(["operation"]));
        assert_eq!(execute.priority, PriorityTier::Normal);
    }

    #[test]
    fn test_parse_cursor() {
        assert_eq!(parse_cursor(None).unwrap(), 0);
        assert_eq!(parse_cursor(Some("")).unwrap(), 0);
        assert_eq!(parse_cursor(Some("40")).unwrap(), 40);
        assert!(matches!(
            parse_cursor(Some("abc")),
            Err(CatalogError::InvalidInput(_))
        ));
        assert!(parse_cursor(Some("-1")).is_err());
    }

    #[test]
    fn test_paginate_walks_everything_once() {
        let entries: Vec<ListingEntry> = (0..7)
            .map(|i| ListingEntry::bare(format!("ns{}", i), format!("NS {}", i)))
            .collect();
        let all = build_descriptors(&entries, &[]);

        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let offset = parse_cursor(cursor.as_deref()).unwrap();
            let page = paginate(all.clone(), offset, 3, ListingSource::Fresh).unwrap();
            assert!(page.descriptors.len() <= 3);
            assert_eq!(page.total, 7);
            seen.extend(page.descriptors.into_iter().map(|d| d.name));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        let expected: Vec<String> = all.into_iter().map(|d| d.name).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_paginate_rejects_cursor_past_end() {
        let all = build_descriptors(&[ListingEntry::bare("a", "A")], &[]);
        assert!(paginate(all.clone(), 0, 10, ListingSource::Builtin).is_ok());
        assert!(matches!(
            paginate(all, 5, 10, ListingSource::Builtin),
            Err(CatalogError::InvalidInput(_))
        ));
    }
}
