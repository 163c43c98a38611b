//! The live-page surface the session tier drives.
//!
//! A browser binding implements [`PageHost`] over the real DOM, history and
//! window; [`crate::nav::MemoryHost`] implements it in memory for headless
//! use and tests. All methods are synchronous: the session tier only awaits
//! network work, never the page.

use crate::document::HeadNode;
use serde::{Deserialize, Serialize};
use url::Url;

/// Opaque payload stored on each history entry.
///
/// Only `scrollY` is interpreted; anything else a page put there is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryState {
    #[serde(rename = "scrollY", default)]
    pub scroll_y: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl HistoryState {
    pub fn at(scroll_y: f64) -> Self {
        Self { scroll_y, ..Default::default() }
    }

    /// Read a state from a raw history payload, tolerating foreign shapes.
    ///
    /// Non-object payloads yield the default state; a missing or
    /// non-numeric `scrollY` reads as 0.
    pub fn from_value(value: Option<&serde_json::Value>) -> Self {
        let Some(serde_json::Value::Object(map)) = value else {
            return Self::default();
        };
        let mut extra = map.clone();
        let scroll_y = extra.remove("scrollY").and_then(|v| v.as_f64()).unwrap_or(0.0);
        Self { scroll_y, extra }
    }

    pub fn to_value(&self) -> serde_json::Value {
        let mut map = self.extra.clone();
        map.insert("scrollY".into(), serde_json::json!(self.scroll_y));
        serde_json::Value::Object(map)
    }
}

/// Host-assigned handle of a head element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeadElementId(pub u64);

/// A live head element as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveHeadElement {
    pub id: HeadElementId,
    /// Serializable form for style blocks and stylesheet links; None for
    /// anything else (meta, script, preload links).
    pub node: Option<HeadNode>,
    /// Identity key if the element is managed.
    pub managed_key: Option<String>,
}

pub trait PageHost: Send + Sync {
    /// Current address shown in the URL bar.
    fn location(&self) -> Url;

    /// Inner markup of the content region, or None if the page has none.
    fn content_html(&self) -> Option<String>;

    /// Replace the content region's subtree.
    fn replace_content(&self, html: &str);

    /// Move keyboard focus to the content region without scrolling.
    fn focus_content(&self);

    fn title(&self) -> String;

    fn set_title(&self, title: &str);

    /// Head children in document order.
    fn head_elements(&self) -> Vec<LiveHeadElement>;

    /// Tag an existing element with an identity key, making it managed.
    fn mark_managed(&self, id: HeadElementId, key: &str);

    /// Build a detached managed element from a serialized node.
    ///
    /// The element joins the head on the next [`PageHost::append_head_element`].
    fn create_head_element(&self, node: &HeadNode, key: &str) -> HeadElementId;

    fn remove_head_element(&self, id: HeadElementId);

    /// Append (or move) an element to the end of the head.
    fn append_head_element(&self, id: HeadElementId);

    fn scroll_y(&self) -> f64;

    fn scroll_to(&self, y: f64);

    /// State of the active history entry.
    fn history_state(&self) -> Option<HistoryState>;

    fn replace_history_state(&self, state: HistoryState);

    fn push_history_state(&self, state: HistoryState, url: &Url);

    /// Leave the engine behind and load `url` as an ordinary page load.
    fn navigate_natively(&self, url: &Url);

    /// Whether the client asked for reduced data usage.
    fn save_data(&self) -> bool {
        false
    }

    /// Whether the host can push history entries at all.
    fn supports_history(&self) -> bool {
        true
    }
}
