//! Head reconciliation across page swaps.
//!
//! Only managed elements (those carrying an identity key) are diffed. A
//! managed element whose key is still wanted is moved, never re-created, so
//! stylesheets already loaded by the browser stay loaded.

use super::host::{HeadElementId, PageHost};
use crate::document::HeadNode;
use std::collections::{HashMap, HashSet};

/// What a reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub removed: usize,
    pub created: usize,
    pub reused: usize,
}

/// Make the managed head elements match `desired`, in order.
pub fn reconcile_head(host: &dyn PageHost, desired: &[HeadNode]) -> ReconcileStats {
    let mut stats = ReconcileStats::default();

    let mut seen = HashSet::new();
    let wanted: Vec<(String, &HeadNode)> = desired
        .iter()
        .map(|node| (node.identity_key(), node))
        .filter(|(key, _)| seen.insert(key.clone()))
        .collect();

    let mut live: HashMap<String, HeadElementId> = HashMap::new();
    for element in host.head_elements() {
        let Some(key) = element.managed_key else { continue };
        if seen.contains(&key) && !live.contains_key(&key) {
            live.insert(key, element.id);
        } else {
            host.remove_head_element(element.id);
            stats.removed += 1;
        }
    }

    for (key, node) in wanted {
        let id = match live.get(&key) {
            Some(id) => {
                stats.reused += 1;
                *id
            }
            None => {
                stats.created += 1;
                host.create_head_element(node, &key)
            }
        };
        host.append_head_element(id);
    }

    tracing::trace!(removed = stats.removed, created = stats.created, reused = stats.reused, "reconciled head");

    stats
}

/// Tag every unmanaged style block and stylesheet link as managed.
///
/// Returns how many elements were adopted.
pub fn adopt_head(host: &dyn PageHost) -> usize {
    let mut adopted = 0;
    for element in host.head_elements() {
        if element.managed_key.is_some() {
            continue;
        }
        if let Some(node) = &element.node {
            host.mark_managed(element.id, &node.identity_key());
            adopted += 1;
        }
    }
    adopted
}

/// Serializable nodes of the managed head elements, in document order.
pub fn managed_head_nodes(host: &dyn PageHost) -> Vec<HeadNode> {
    host.head_elements()
        .into_iter()
        .filter(|el| el.managed_key.is_some())
        .filter_map(|el| el.node)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::MemoryHost;
    use url::Url;

    const PAGE: &str = r#"<html><head>
        <meta charset="utf-8">
        <link rel="stylesheet" href="/css/site.css">
        <style>.a{}</style>
        <script src="/analytics.js"></script>
        </head><body><div id="content">x</div></body></html>"#;

    fn host() -> MemoryHost {
        let host = MemoryHost::from_html(Url::parse("https://example.com/").unwrap(), PAGE, "#content").unwrap();
        adopt_head(&host);
        host.reset_head_counters();
        host
    }

    #[test]
    fn test_adopt_marks_only_styles() {
        let host = MemoryHost::from_html(Url::parse("https://example.com/").unwrap(), PAGE, "#content").unwrap();
        assert_eq!(adopt_head(&host), 2);
        assert_eq!(adopt_head(&host), 0);
        let managed = host.head_elements().iter().filter(|e| e.managed_key.is_some()).count();
        assert_eq!(managed, 2);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let host = host();
        let current = managed_head_nodes(&host);

        let stats = reconcile_head(&host, &current);

        assert_eq!(stats, ReconcileStats { removed: 0, created: 0, reused: 2 });
        assert_eq!(host.head_counters(), (0, 0));
        assert_eq!(managed_head_nodes(&host), current);
    }

    #[test]
    fn test_reconcile_swaps_page_styles() {
        let host = host();
        let desired = vec![HeadNode::stylesheet("/css/site.css"), HeadNode::style(".year{}")];

        let stats = reconcile_head(&host, &desired);

        assert_eq!(stats, ReconcileStats { removed: 1, created: 1, reused: 1 });
        assert_eq!(managed_head_nodes(&host), desired);
    }

    #[test]
    fn test_reconcile_never_touches_unmanaged() {
        let host = host();
        let before: Vec<_> = host.head_elements().into_iter().filter(|e| e.managed_key.is_none()).collect();

        reconcile_head(&host, &[]);

        let after: Vec<_> = host.head_elements().into_iter().filter(|e| e.managed_key.is_none()).collect();
        assert_eq!(before, after);
        assert_eq!(before.len(), 2);
        assert!(managed_head_nodes(&host).is_empty());
    }

    #[test]
    fn test_reconcile_orders_and_dedupes() {
        let host = host();
        let desired = vec![
            HeadNode::style(".a{}"),
            HeadNode::stylesheet("/css/site.css"),
            HeadNode::style(".a{}"),
        ];

        let stats = reconcile_head(&host, &desired);

        assert_eq!(stats.created, 0);
        assert_eq!(managed_head_nodes(&host), vec![HeadNode::style(".a{}"), HeadNode::stylesheet("/css/site.css")]);
    }
}
