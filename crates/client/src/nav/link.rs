//! Link resolution and eligibility for interception.

use crate::fetch::{resolve_href, same_document, same_origin};
use url::Url;

/// Tag name and attributes of one element on an event path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementInfo {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

impl ElementInfo {
    pub fn new(tag: &str) -> Self {
        Self { tag: tag.to_ascii_lowercase(), attributes: Vec::new() }
    }

    /// An `<a href=...>` element.
    pub fn anchor(href: &str) -> Self {
        Self::new("a").with_attr("href", href)
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    fn is_link(&self) -> bool {
        matches!(self.tag.as_str(), "a" | "area") && self.has_attr("href")
    }
}

/// Composed path of an event, from the target element up to the root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventTarget {
    pub path: Vec<ElementInfo>,
}

impl EventTarget {
    pub fn new(path: Vec<ElementInfo>) -> Self {
        Self { path }
    }

    /// Target is the link itself.
    pub fn link(anchor: ElementInfo) -> Self {
        Self { path: vec![anchor] }
    }

    /// Nearest enclosing link element, starting at the target.
    pub fn closest_link(&self) -> Option<&ElementInfo> {
        self.path.iter().find(|el| el.is_link())
    }
}

/// What signalled intent to follow a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    PointerEnter,
    Focus,
    TouchStart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentEvent {
    pub kind: IntentKind,
    pub target: EventTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.ctrl || self.meta || self.shift || self.alt
    }
}

/// Pointer activation of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub target: EventTarget,
    /// 0 is the primary button.
    pub button: i16,
    pub modifiers: Modifiers,
    /// Some other handler already called `preventDefault`.
    pub default_prevented: bool,
}

impl ClickEvent {
    /// Plain primary-button click on `target`.
    pub fn primary(target: EventTarget) -> Self {
        Self { target, button: 0, modifiers: Modifiers::default(), default_prevented: false }
    }

    /// Whether the click could be a plain "follow this link" gesture.
    pub fn is_plain(&self) -> bool {
        !self.default_prevented && self.button == 0 && !self.modifiers.any()
    }
}

/// Why a link is left to the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LinkRejection {
    #[error("no enclosing link")]
    NoLink,
    #[error("href does not resolve")]
    Unresolvable,
    #[error("opens in another browsing context")]
    NewContext,
    #[error("marked as download")]
    Download,
    #[error("marked as external")]
    External,
    #[error("different origin")]
    CrossOrigin,
    #[error("same document")]
    SameDocument,
}

/// Decide whether the link under an event may be prefetched and swapped.
///
/// Returns the absolute destination URL on success.
pub fn eligible_link(target: &EventTarget, current: &Url) -> Result<Url, LinkRejection> {
    let link = target.closest_link().ok_or(LinkRejection::NoLink)?;

    let href = link.attr("href").unwrap_or_default();
    let url = resolve_href(current, href).ok_or(LinkRejection::Unresolvable)?;

    if link
        .attr("target")
        .is_some_and(|t| !t.is_empty() && !t.eq_ignore_ascii_case("_self"))
    {
        return Err(LinkRejection::NewContext);
    }
    if link.has_attr("download") {
        return Err(LinkRejection::Download);
    }
    if link
        .attr("rel")
        .is_some_and(|rel| rel.split_ascii_whitespace().any(|t| t.eq_ignore_ascii_case("external")))
    {
        return Err(LinkRejection::External);
    }
    if !same_origin(&url, current) {
        return Err(LinkRejection::CrossOrigin);
    }
    if same_document(&url, current) {
        return Err(LinkRejection::SameDocument);
    }

    Ok(url)
}
