//! Serializable head nodes and their identity keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Attribute carrying the identity key on managed head elements.
///
/// Elements without it are never touched by reconciliation.
pub const MANAGED_KEY_ATTR: &str = "data-swapnav-key";

/// Tag kind of a head node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadNodeKind {
    /// Inline `<style>` block.
    Style,
    /// `<link rel="stylesheet">`.
    Link,
}

impl HeadNodeKind {
    pub fn tag(self) -> &'static str {
        match self {
            HeadNodeKind::Style => "style",
            HeadNodeKind::Link => "link",
        }
    }
}

/// A style block or stylesheet link a page needs to render its content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeadNode {
    pub kind: HeadNodeKind,
    /// Attributes sorted by name, excluding [`MANAGED_KEY_ATTR`].
    pub attributes: Vec<(String, String)>,
    /// Text of an inline style; None for links.
    pub content: Option<String>,
}

impl HeadNode {
    /// Build a node, normalizing attribute order and dropping the managed key.
    pub fn new(
        kind: HeadNodeKind, attributes: impl IntoIterator<Item = (String, String)>, content: Option<String>,
    ) -> Self {
        let mut attributes: Vec<(String, String)> = attributes
            .into_iter()
            .filter(|(name, _)| name != MANAGED_KEY_ATTR)
            .collect();
        attributes.sort();
        let content = match kind {
            HeadNodeKind::Style => Some(content.unwrap_or_default()),
            HeadNodeKind::Link => None,
        };
        Self { kind, attributes, content }
    }

    pub fn style(css: &str) -> Self {
        Self::new(HeadNodeKind::Style, Vec::<(String, String)>::new(), Some(css.to_string()))
    }

    pub fn stylesheet(href: &str) -> Self {
        let attributes = [("rel".to_string(), "stylesheet".to_string()), ("href".to_string(), href.to_string())];
        Self::new(HeadNodeKind::Link, attributes, None)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Stable identity derived from kind, attributes and content.
    ///
    /// Equal nodes always produce equal keys, so a live element tagged with
    /// this key can be reused instead of re-created.
    pub fn identity_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.tag().as_bytes());
        for (name, value) in &self.attributes {
            hasher.update(b"\n");
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }
        hasher.update(b"\n\n");
        if let Some(content) = &self.content {
            hasher.update(content.as_bytes());
        }
        hex::encode(&hasher.finalize()[..8])
    }
}

/// Whether a `rel` attribute value names a stylesheet.
pub fn is_stylesheet_rel(rel: &str) -> bool {
    rel.split_ascii_whitespace().any(|token| token.eq_ignore_ascii_case("stylesheet"))
}
