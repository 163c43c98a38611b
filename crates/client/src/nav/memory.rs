//! In-memory [`PageHost`] for headless sessions and tests.
//!
//! Models exactly the parts of a browser page the session tier touches: one
//! content region, the head's children, the title, a vertical scroll offset,
//! focus, and a linear history stack with back/forward.

use super::host::{HeadElementId, HistoryState, LiveHeadElement, PageHost};
use crate::document::{HeadNode, HeadNodeKind, head_node_of, is_stylesheet_rel};
use parking_lot::Mutex;
use scraper::{Html, Selector};
use swapnav_core::Error;
use url::Url;

#[derive(Debug, Clone)]
struct MemHeadElement {
    id: HeadElementId,
    tag: String,
    attributes: Vec<(String, String)>,
    text: String,
    key: Option<String>,
    attached: bool,
}

impl MemHeadElement {
    fn node(&self) -> Option<HeadNode> {
        let attributes = self.attributes.iter().cloned();
        match self.tag.as_str() {
            "style" => Some(HeadNode::new(HeadNodeKind::Style, attributes, Some(self.text.clone()))),
            "link" if self.attr("rel").is_some_and(is_stylesheet_rel) => {
                Some(HeadNode::new(HeadNodeKind::Link, attributes, None))
            }
            _ => None,
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug)]
struct HistoryEntry {
    url: Url,
    state: Option<HistoryState>,
}

#[derive(Debug)]
struct MemoryState {
    title: String,
    content: Option<String>,
    head: Vec<MemHeadElement>,
    scroll_y: f64,
    content_focused: bool,
    history: Vec<HistoryEntry>,
    index: usize,
    native_loads: Vec<Url>,
    next_id: u64,
    created: usize,
    removed: usize,
    save_data: bool,
    supports_history: bool,
}

impl MemoryState {
    fn location(&self) -> &Url {
        &self.history[self.index].url
    }
}

/// A page held entirely in memory.
#[derive(Debug)]
pub struct MemoryHost {
    state: Mutex<MemoryState>,
}

impl MemoryHost {
    /// Load a rendered document as the current page at `url`.
    ///
    /// A document without the content region still loads; the session tier
    /// will decline to initialize on it.
    pub fn from_html(url: Url, html: &str, content_selector: &str) -> Result<Self, Error> {
        let content_sel = Selector::parse(content_selector)
            .map_err(|e| Error::InvalidInput(format!("invalid content selector {content_selector:?}: {e:?}")))?;
        let head_sel = Selector::parse("head > *").map_err(|e| Error::InvalidInput(format!("{e:?}")))?;
        let title_sel = Selector::parse("title").map_err(|e| Error::InvalidInput(format!("{e:?}")))?;

        let document = Html::parse_document(html);
        let content = document.select(&content_sel).next().map(|el| el.inner_html());
        let title = document
            .select(&title_sel)
            .next()
            .map(|t| t.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();

        let mut head = Vec::new();
        for (n, element) in document.select(&head_sel).enumerate() {
            let value = element.value();
            if value.name() == "title" {
                continue;
            }
            let node = head_node_of(element);
            head.push(MemHeadElement {
                id: HeadElementId(n as u64 + 1),
                tag: value.name().to_string(),
                attributes: node
                    .as_ref()
                    .map(|n| n.attributes.clone())
                    .unwrap_or_else(|| value.attrs().map(|(k, v)| (k.to_string(), v.to_string())).collect()),
                text: node.and_then(|n| n.content).unwrap_or_default(),
                key: value.attr(crate::document::MANAGED_KEY_ATTR).map(str::to_string),
                attached: true,
            });
        }
        let next_id = head.len() as u64 + 1;

        Ok(Self {
            state: Mutex::new(MemoryState {
                title,
                content,
                head,
                scroll_y: 0.0,
                content_focused: false,
                history: vec![HistoryEntry { url, state: None }],
                index: 0,
                native_loads: Vec::new(),
                next_id,
                created: 0,
                removed: 0,
                save_data: false,
                supports_history: true,
            }),
        })
    }

    /// Step back one history entry, returning the popped-to state.
    ///
    /// Returns None at the start of history. The caller delivers the state
    /// to the session tier as a pop event.
    pub fn back(&self) -> Option<Option<HistoryState>> {
        let mut state = self.state.lock();
        if state.index == 0 {
            return None;
        }
        state.index -= 1;
        Some(state.history[state.index].state.clone())
    }

    /// Step forward one history entry, returning the popped-to state.
    pub fn forward(&self) -> Option<Option<HistoryState>> {
        let mut state = self.state.lock();
        if state.index + 1 >= state.history.len() {
            return None;
        }
        state.index += 1;
        Some(state.history[state.index].state.clone())
    }

    pub fn history_len(&self) -> usize {
        self.state.lock().history.len()
    }

    /// URLs handed to native (full page) navigation, oldest first.
    pub fn native_loads(&self) -> Vec<Url> {
        self.state.lock().native_loads.clone()
    }

    pub fn content_focused(&self) -> bool {
        self.state.lock().content_focused
    }

    pub fn set_save_data(&self, save_data: bool) {
        self.state.lock().save_data = save_data;
    }

    pub fn set_supports_history(&self, supported: bool) {
        self.state.lock().supports_history = supported;
    }

    /// Simulate a third party injecting an unmanaged stylesheet.
    pub fn inject_head_element(&self, tag: &str, attributes: &[(&str, &str)]) -> HeadElementId {
        let mut state = self.state.lock();
        let id = HeadElementId(state.next_id);
        state.next_id += 1;
        state.head.push(MemHeadElement {
            id,
            tag: tag.to_string(),
            attributes: attributes.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            text: String::new(),
            key: None,
            attached: true,
        });
        id
    }

    /// (created, removed) head element counts since the last reset.
    pub fn head_counters(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.created, state.removed)
    }

    pub fn reset_head_counters(&self) {
        let mut state = self.state.lock();
        state.created = 0;
        state.removed = 0;
    }
}

impl PageHost for MemoryHost {
    fn location(&self) -> Url {
        self.state.lock().location().clone()
    }

    fn content_html(&self) -> Option<String> {
        self.state.lock().content.clone()
    }

    fn replace_content(&self, html: &str) {
        let mut state = self.state.lock();
        state.content = Some(html.to_string());
        state.content_focused = false;
    }

    fn focus_content(&self) {
        let mut state = self.state.lock();
        state.content_focused = state.content.is_some();
    }

    fn title(&self) -> String {
        self.state.lock().title.clone()
    }

    fn set_title(&self, title: &str) {
        self.state.lock().title = title.to_string();
    }

    fn head_elements(&self) -> Vec<LiveHeadElement> {
        self.state
            .lock()
            .head
            .iter()
            .filter(|el| el.attached)
            .map(|el| LiveHeadElement { id: el.id, node: el.node(), managed_key: el.key.clone() })
            .collect()
    }

    fn mark_managed(&self, id: HeadElementId, key: &str) {
        if let Some(el) = self.state.lock().head.iter_mut().find(|el| el.id == id) {
            el.key = Some(key.to_string());
        }
    }

    fn create_head_element(&self, node: &HeadNode, key: &str) -> HeadElementId {
        let mut state = self.state.lock();
        let id = HeadElementId(state.next_id);
        state.next_id += 1;
        state.created += 1;
        state.head.push(MemHeadElement {
            id,
            tag: node.kind.tag().to_string(),
            attributes: node.attributes.clone(),
            text: node.content.clone().unwrap_or_default(),
            key: Some(key.to_string()),
            attached: false,
        });
        id
    }

    fn remove_head_element(&self, id: HeadElementId) {
        let mut state = self.state.lock();
        let before = state.head.len();
        state.head.retain(|el| el.id != id);
        if state.head.len() < before {
            state.removed += 1;
        }
    }

    fn append_head_element(&self, id: HeadElementId) {
        let mut state = self.state.lock();
        if let Some(pos) = state.head.iter().position(|el| el.id == id) {
            let mut el = state.head.remove(pos);
            el.attached = true;
            state.head.push(el);
        }
    }

    fn scroll_y(&self) -> f64 {
        self.state.lock().scroll_y
    }

    fn scroll_to(&self, y: f64) {
        self.state.lock().scroll_y = y.max(0.0);
    }

    fn history_state(&self) -> Option<HistoryState> {
        let state = self.state.lock();
        state.history[state.index].state.clone()
    }

    fn replace_history_state(&self, new_state: HistoryState) {
        let mut state = self.state.lock();
        let index = state.index;
        state.history[index].state = Some(new_state);
    }

    fn push_history_state(&self, new_state: HistoryState, url: &Url) {
        let mut state = self.state.lock();
        let keep = state.index + 1;
        state.history.truncate(keep);
        state.history.push(HistoryEntry { url: url.clone(), state: Some(new_state) });
        state.index = keep;
    }

    fn navigate_natively(&self, url: &Url) {
        tracing::debug!(%url, "native navigation");
        self.state.lock().native_loads.push(url.clone());
    }

    fn save_data(&self) -> bool {
        self.state.lock().save_data
    }

    fn supports_history(&self) -> bool {
        self.state.lock().supports_history
    }
}
