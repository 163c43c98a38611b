//! Page snapshots extracted from rendered HTML.
//!
//! A [`PageEntry`] is everything the session tier needs to show a page
//! without reloading it: the markup of the content region, the title, and the
//! style/stylesheet nodes from the head. Pages that don't expose the content
//! region never produce an entry.

pub mod head;

pub use head::{HeadNode, HeadNodeKind, MANAGED_KEY_ATTR, is_stylesheet_rel};

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use swapnav_core::Error;

/// A captured snapshot of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    /// Serialized inner markup of the content region.
    pub content_html: String,
    pub title: String,
    /// Style blocks and stylesheet links, in document order.
    pub head_nodes: Vec<HeadNode>,
}

/// Parses fetched documents into [`PageEntry`] values.
#[derive(Debug, Clone)]
pub struct DocumentExtractor {
    content_selector: String,
    content: Selector,
    head: Selector,
    title: Selector,
}

impl DocumentExtractor {
    /// Build an extractor for the given content-region selector.
    pub fn new(content_selector: &str) -> Result<Self, Error> {
        let content = Selector::parse(content_selector)
            .map_err(|e| Error::InvalidInput(format!("invalid content selector {content_selector:?}: {e:?}")))?;
        let head = Selector::parse("head style, head link").map_err(|e| Error::InvalidInput(format!("{e:?}")))?;
        let title = Selector::parse("title").map_err(|e| Error::InvalidInput(format!("{e:?}")))?;
        Ok(Self { content_selector: content_selector.to_string(), content, head, title })
    }

    pub fn content_selector(&self) -> &str {
        &self.content_selector
    }

    /// Extract a snapshot from a full HTML document.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingContentRegion` if no element matches the
    /// content selector.
    pub fn extract(&self, html: &str) -> Result<PageEntry, Error> {
        let document = Html::parse_document(html);

        let region = document
            .select(&self.content)
            .next()
            .ok_or_else(|| Error::MissingContentRegion(self.content_selector.clone()))?;

        let title = document
            .select(&self.title)
            .next()
            .map(|t| collapse_whitespace(&t.text().collect::<String>()))
            .unwrap_or_default();

        let head_nodes = document.select(&self.head).filter_map(head_node_of).collect();

        Ok(PageEntry { content_html: region.inner_html(), title, head_nodes })
    }
}

/// Convert a head element into a [`HeadNode`] if it is a style block or a
/// stylesheet link.
pub fn head_node_of(element: ElementRef<'_>) -> Option<HeadNode> {
    let value = element.value();
    let attributes = value.attrs().map(|(name, v)| (name.to_string(), v.to_string()));
    match value.name() {
        "style" => Some(HeadNode::new(HeadNodeKind::Style, attributes, Some(element.text().collect()))),
        "link" if value.attr("rel").is_some_and(is_stylesheet_rel) => {
            Some(HeadNode::new(HeadNodeKind::Link, attributes, None))
        }
        _ => None,
    }
}

/// Collapse runs of whitespace the way `document.title` does.
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
