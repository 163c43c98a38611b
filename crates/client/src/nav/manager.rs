//! The navigation cache manager.
//!
//! ### Fetching
//! - One snapshot per URL (fragment stripped) in an LRU [`SessionCache`]
//! - Concurrent requests for the same URL share one in-flight fetch
//! - Fetches run to completion even if every waiter went away, so an
//!   abandoned prefetch still seeds the cache
//! - A redirected fetch is cached under the URL it landed on; a redirect to
//!   another origin is a failure
//!
//! ### Swapping
//! - Scroll offset and ticket are taken synchronously when a navigation
//!   starts; only a navigation that is still the latest may swap the page
//! - Every failure falls back to a native page load

use super::error::NavError;
use super::events::{ContentEvents, ContentReplaced, SwapCause};
use super::host::{HistoryState, PageHost};
use super::link::{ClickEvent, IntentEvent, eligible_link};
use super::reconcile::{adopt_head, managed_head_nodes, reconcile_head};
use super::session::SessionCache;
use crate::document::{DocumentExtractor, PageEntry};
use crate::fetch::{FetchClient, FetchPurpose, page_key, same_document};
use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use swapnav_core::{AppConfig, Error};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use url::Url;

/// A fetched document.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Where the document was served from after redirects.
    pub url: Url,
    pub html: String,
}

/// How the session tier retrieves a document.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the full HTML of `url`. A non-success status is an error.
    async fn fetch_page(&self, url: &Url, purpose: FetchPurpose) -> Result<FetchedPage, Error>;
}

#[async_trait]
impl PageFetcher for FetchClient {
    async fn fetch_page(&self, url: &Url, purpose: FetchPurpose) -> Result<FetchedPage, Error> {
        let response = self.fetch_document(url, purpose).await?;
        Ok(FetchedPage { html: response.text(), url: response.final_url })
    }
}

#[derive(Debug, Clone)]
pub struct NavConfig {
    pub content_selector: String,
    pub session_cache_capacity: usize,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self { content_selector: "#content".to_string(), session_cache_capacity: 64 }
    }
}

impl From<&AppConfig> for NavConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            content_selector: config.content_selector.clone(),
            session_cache_capacity: config.session_cache_capacity,
        }
    }
}

/// Result of a navigation or history pop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOutcome {
    /// Content, head and title now show `url`.
    Swapped { url: Url },
    /// Same-document pop; only the scroll offset was restored.
    ScrollRestored { url: Url },
    /// A newer navigation started first; the page was left alone.
    Superseded { url: Url },
    /// The fetch failed and the host was sent to `url` natively.
    FellBack { url: Url, error: NavError },
}

/// A snapshot and the fragment-free URL it belongs to.
type Resolved = (Url, PageEntry);

type SharedFetch = Shared<BoxFuture<'static, Result<Resolved, NavError>>>;

struct Inner {
    host: Arc<dyn PageHost>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: DocumentExtractor,
    cache: Mutex<SessionCache>,
    in_flight: Mutex<HashMap<String, SharedFetch>>,
    current: Mutex<Url>,
    latest_ticket: AtomicU64,
    events: ContentEvents,
}

/// Session-tier navigation engine bound to one page.
#[derive(Clone)]
pub struct NavigationManager {
    inner: Arc<Inner>,
}

impl NavigationManager {
    /// Take over the page currently shown by `host`.
    ///
    /// Adopts the head's styles as managed, captures the page into the cache
    /// and makes sure the active history entry carries a scroll offset.
    ///
    /// # Errors
    ///
    /// Fails if the page has no content region or the host cannot push
    /// history entries; the page then simply keeps native navigation.
    pub fn init(host: Arc<dyn PageHost>, fetcher: Arc<dyn PageFetcher>, config: NavConfig) -> Result<Self, Error> {
        let extractor = DocumentExtractor::new(&config.content_selector)?;

        if !host.supports_history() {
            return Err(Error::InvalidInput("host cannot push history entries".to_string()));
        }
        if host.content_html().is_none() {
            return Err(Error::MissingContentRegion(config.content_selector));
        }

        let adopted = adopt_head(host.as_ref());
        let current = host.location();

        if host.history_state().is_none() {
            host.replace_history_state(HistoryState::at(host.scroll_y()));
        }

        let manager = Self {
            inner: Arc::new(Inner {
                host,
                fetcher,
                extractor,
                cache: Mutex::new(SessionCache::new(config.session_cache_capacity)),
                in_flight: Mutex::new(HashMap::new()),
                current: Mutex::new(current.clone()),
                latest_ticket: AtomicU64::new(0),
                events: ContentEvents::default(),
            }),
        };
        manager.capture_current();

        tracing::debug!(url = %current, adopted, "navigation manager initialized");

        Ok(manager)
    }

    /// Subscribe to content-replaced notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ContentReplaced> {
        self.inner.events.subscribe()
    }

    /// URL the engine believes is displayed.
    pub fn current_url(&self) -> Url {
        self.inner.current.lock().clone()
    }

    /// Cached snapshot for `url`, without touching recency.
    pub fn cached(&self, url: &Url) -> Option<PageEntry> {
        self.inner.cache.lock().peek(&page_key(url)).cloned()
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    /// Return the snapshot of `url`, fetching it at most once at a time.
    pub async fn fetch_and_cache(&self, url: &Url, purpose: FetchPurpose) -> Result<PageEntry, NavError> {
        self.resolve(url, purpose).await.map(|(_, entry)| entry)
    }

    /// Like [`Self::fetch_and_cache`], also returning the URL the snapshot
    /// belongs to once redirects are followed.
    async fn resolve(&self, url: &Url, purpose: FetchPurpose) -> Result<Resolved, NavError> {
        let key = page_key(url);

        if let Some(entry) = self.inner.cache.lock().get(&key) {
            tracing::trace!(url = %key, "session cache hit");
            return Ok((without_fragment(url), entry.clone()));
        }

        let shared = {
            let mut in_flight = self.inner.in_flight.lock();
            match in_flight.get(&key) {
                Some(pending) => {
                    tracing::trace!(url = %key, "joining in-flight fetch");
                    pending.clone()
                }
                None => {
                    // A fetch that finished since the first lookup has already stored its entry.
                    if let Some(entry) = self.inner.cache.lock().get(&key) {
                        return Ok((without_fragment(url), entry.clone()));
                    }
                    let inner = Arc::clone(&self.inner);
                    let task = tokio::spawn(inner.fetch_uncached(url.clone(), key.clone(), purpose));
                    let pending = async move {
                        task.await
                            .unwrap_or_else(|e| Err(NavError::Other(format!("fetch task failed: {e}"))))
                    }
                    .boxed()
                    .shared();
                    in_flight.insert(key, pending.clone());
                    pending
                }
            }
        };

        shared.await
    }

    /// Warm the cache for `url`.
    pub async fn prefetch(&self, url: &Url) -> Result<PageEntry, NavError> {
        self.fetch_and_cache(url, FetchPurpose::Prefetch).await
    }

    /// React to hover, focus or touch on a link by prefetching it.
    ///
    /// Returns the detached prefetch task, or None when the link is not
    /// eligible or the host asked for reduced data. Prefetch errors are
    /// logged and dropped.
    pub fn handle_intent(&self, event: &IntentEvent) -> Option<JoinHandle<()>> {
        if self.inner.host.save_data() {
            tracing::trace!("save-data requested, skipping prefetch");
            return None;
        }

        let url = match eligible_link(&event.target, &self.current_url()) {
            Ok(url) => url,
            Err(reason) => {
                tracing::trace!(%reason, kind = ?event.kind, "intent ignored");
                return None;
            }
        };

        let this = self.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = this.prefetch(&url).await {
                tracing::debug!(%url, error = %e, "prefetch failed");
            }
        }))
    }

    /// Intercept a link activation.
    ///
    /// None means the click is left to the browser. Some means default
    /// navigation is prevented and the returned future performs the swap.
    pub fn handle_click(&self, event: &ClickEvent) -> Option<BoxFuture<'static, NavOutcome>> {
        if !event.is_plain() {
            return None;
        }
        let url = eligible_link(&event.target, &self.current_url()).ok()?;
        Some(self.navigate(url))
    }

    /// Navigate to `url` through the cache.
    ///
    /// The outgoing page's scroll offset is recorded before this returns.
    pub fn navigate(&self, url: Url) -> BoxFuture<'static, NavOutcome> {
        self.persist_scroll();
        let ticket = self.next_ticket();
        let this = self.clone();

        async move {
            match this.resolve(&url, FetchPurpose::Navigate).await {
                Ok((resolved, entry)) => {
                    if this.is_superseded(ticket) {
                        tracing::debug!(%url, "navigation superseded, keeping snapshot only");
                        return NavOutcome::Superseded { url };
                    }
                    let url = carry_fragment(resolved, &url);
                    let host = &this.inner.host;
                    this.capture_current();
                    this.swap(&entry);
                    host.push_history_state(HistoryState::at(0.0), &url);
                    *this.inner.current.lock() = url.clone();
                    host.scroll_to(0.0);
                    host.focus_content();
                    this.publish(&url, &entry, SwapCause::Navigate);
                    NavOutcome::Swapped { url }
                }
                Err(error) => this.fall_back(url, error, ticket),
            }
        }
        .boxed()
    }

    /// React to the host moving through history.
    ///
    /// `state` is the payload of the entry that became active.
    pub fn handle_pop_state(&self, state: Option<HistoryState>) -> BoxFuture<'static, NavOutcome> {
        let url = self.inner.host.location();
        let scroll_y = state.map(|s| s.scroll_y).unwrap_or(0.0);

        if same_document(&url, &self.current_url()) {
            *self.inner.current.lock() = url.clone();
            self.inner.host.scroll_to(scroll_y);
            return futures_util::future::ready(NavOutcome::ScrollRestored { url }).boxed();
        }

        let ticket = self.next_ticket();
        let this = self.clone();

        async move {
            match this.resolve(&url, FetchPurpose::Navigate).await {
                Ok((resolved, entry)) => {
                    if this.is_superseded(ticket) {
                        return NavOutcome::Superseded { url };
                    }
                    let url = carry_fragment(resolved, &url);
                    let host = &this.inner.host;
                    this.capture_current();
                    this.swap(&entry);
                    *this.inner.current.lock() = url.clone();
                    host.scroll_to(scroll_y);
                    host.focus_content();
                    this.publish(&url, &entry, SwapCause::HistoryPop);
                    NavOutcome::Swapped { url }
                }
                Err(error) => this.fall_back(url, error, ticket),
            }
        }
        .boxed()
    }

    fn fall_back(&self, url: Url, error: NavError, ticket: u64) -> NavOutcome {
        if self.is_superseded(ticket) {
            return NavOutcome::Superseded { url };
        }
        tracing::debug!(%url, %error, "swap failed, falling back to native navigation");
        self.inner.host.navigate_natively(&url);
        NavOutcome::FellBack { url, error }
    }

    /// Record the current scroll offset on the active history entry.
    fn persist_scroll(&self) {
        let host = &self.inner.host;
        let mut state = host.history_state().unwrap_or_default();
        state.scroll_y = host.scroll_y();
        host.replace_history_state(state);
    }

    /// Snapshot whatever the page shows now under the current URL.
    fn capture_current(&self) {
        let host = &self.inner.host;
        let Some(content_html) = host.content_html() else { return };
        let entry = PageEntry { content_html, title: host.title(), head_nodes: managed_head_nodes(host.as_ref()) };
        let key = page_key(&self.current_url());
        self.inner.cache.lock().insert(key, entry);
    }

    fn swap(&self, entry: &PageEntry) {
        let host = self.inner.host.as_ref();
        reconcile_head(host, &entry.head_nodes);
        host.replace_content(&entry.content_html);
        host.set_title(&entry.title);
    }

    fn publish(&self, url: &Url, entry: &PageEntry, cause: SwapCause) {
        let receivers = self
            .inner
            .events
            .publish(ContentReplaced { url: url.clone(), title: entry.title.clone(), cause });
        tracing::trace!(%url, receivers, "content replaced");
    }

    fn next_ticket(&self) -> u64 {
        self.inner.latest_ticket.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_superseded(&self, ticket: u64) -> bool {
        self.inner.latest_ticket.load(Ordering::SeqCst) != ticket
    }
}

fn without_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

/// `resolved` with the fragment of `requested`, unless the redirect set its own.
fn carry_fragment(mut resolved: Url, requested: &Url) -> Url {
    if resolved.fragment().is_none() {
        resolved.set_fragment(requested.fragment());
    }
    resolved
}

impl Inner {
    async fn fetch_uncached(
        self: Arc<Self>, url: Url, key: String, purpose: FetchPurpose,
    ) -> Result<Resolved, NavError> {
        let result = match self.fetcher.fetch_page(&url, purpose).await {
            Ok(page) => self.accept(&url, page),
            Err(e) => Err(NavError::from(e)),
        };

        match &result {
            Ok((resolved, entry)) => {
                let resolved_key = page_key(resolved);
                if resolved_key != key {
                    tracing::debug!(from = %key, to = %resolved_key, "fetch was redirected");
                }
                tracing::debug!(url = %resolved_key, purpose = purpose.as_str(), "cached page");
                self.cache.lock().insert(resolved_key, entry.clone());
            }
            Err(e) => tracing::debug!(url = %key, purpose = purpose.as_str(), error = %e, "page fetch failed"),
        }
        self.in_flight.lock().remove(&key);

        result
    }

    fn accept(&self, requested: &Url, page: FetchedPage) -> Result<Resolved, NavError> {
        if page.url.origin() != requested.origin() {
            return Err(NavError::Other(format!("redirected to another origin: {}", page.url)));
        }
        let entry = self.extractor.extract(&page.html)?;
        Ok((without_fragment(&page.url), entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HeadNode;
    use crate::nav::{ElementInfo, EventTarget, IntentKind, MemoryHost};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    const ORIGIN: &str = "https://films.example";

    fn page(title: &str, style: &str, body: &str) -> String {
        format!(
            r#"<!DOCTYPE html><html><head><title>{title}</title>
            <link rel="stylesheet" href="/css/site.css"><style>{style}</style>
            <script src="/js/app.js"></script></head>
            <body><nav>menu</nav><main id="content">{body}</main></body></html>"#
        )
    }

    /// In-process fetcher with per-URL gates.
    #[derive(Default)]
    struct ScriptedFetcher {
        pages: Mutex<HashMap<String, String>>,
        redirects: Mutex<HashMap<String, Url>>,
        gates: Mutex<HashMap<String, Arc<Notify>>>,
        calls: Mutex<Vec<(String, FetchPurpose)>>,
        started: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn serve(&self, path: &str, html: String) {
            self.pages.lock().insert(format!("{ORIGIN}{path}"), html);
        }

        fn serve_absolute(&self, url: &str, html: String) {
            self.pages.lock().insert(url.to_string(), html);
        }

        fn redirect(&self, path: &str, to: Url) {
            self.redirects.lock().insert(format!("{ORIGIN}{path}"), to);
        }

        /// Hold responses for `path` until the returned gate is notified.
        fn gate(&self, path: &str) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.gates.lock().insert(format!("{ORIGIN}{path}"), gate.clone());
            gate
        }

        fn calls_to(&self, path: &str) -> usize {
            let url = format!("{ORIGIN}{path}");
            self.calls.lock().iter().filter(|(u, _)| *u == url).count()
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch_page(&self, url: &Url, purpose: FetchPurpose) -> Result<FetchedPage, Error> {
            let key = page_key(url);
            self.calls.lock().push((key.clone(), purpose));
            self.started.fetch_add(1, Ordering::SeqCst);
            let gate = self.gates.lock().get(&key).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            let target = self.redirects.lock().get(&key).cloned().unwrap_or_else(|| url.clone());
            let html = self
                .pages
                .lock()
                .get(&page_key(&target))
                .cloned()
                .ok_or_else(|| Error::NetworkError(format!("connection refused: {target}")))?;
            Ok(FetchedPage { url: target, html })
        }
    }

    struct Harness {
        host: Arc<MemoryHost>,
        fetcher: Arc<ScriptedFetcher>,
        manager: NavigationManager,
    }

    fn harness() -> Harness {
        let start = page("1998", ".y98{}", "<h1>1998</h1>");
        let host = Arc::new(MemoryHost::from_html(url("/years/1998/"), &start, "#content").unwrap());
        let fetcher = Arc::new(ScriptedFetcher::default());
        fetcher.serve("/years/1998/", start);
        fetcher.serve("/years/1999/", page("1999", ".y99{}", "<h1>1999</h1>"));
        fetcher.serve("/years/2000/", page("2000", ".y00{}", "<h1>2000</h1>"));
        fetcher.serve("/broken/", "<html><body><p>no region</p></body></html>".to_string());

        let manager = NavigationManager::init(host.clone(), fetcher.clone(), NavConfig::default()).unwrap();
        Harness { host, fetcher, manager }
    }

    fn url(path: &str) -> Url {
        Url::parse(&format!("{ORIGIN}{path}")).unwrap()
    }

    fn link(href: &str) -> EventTarget {
        EventTarget::new(vec![ElementInfo::new("span"), ElementInfo::anchor(href)])
    }

    fn hover(href: &str) -> IntentEvent {
        IntentEvent { kind: IntentKind::PointerEnter, target: link(href) }
    }

    #[test]
    fn test_init_requires_content_region() {
        let host = Arc::new(
            MemoryHost::from_html(url("/"), "<html><body>bare</body></html>", "#content").unwrap(),
        );
        let result = NavigationManager::init(host, Arc::new(ScriptedFetcher::default()), NavConfig::default());
        assert!(matches!(result, Err(Error::MissingContentRegion(_))));
    }

    #[test]
    fn test_init_requires_history() {
        let host = Arc::new(MemoryHost::from_html(url("/"), &page("t", "", "x"), "#content").unwrap());
        host.set_supports_history(false);
        let result = NavigationManager::init(host, Arc::new(ScriptedFetcher::default()), NavConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_init_normalizes_history_state() {
        let h = harness();
        assert_eq!(h.host.history_state(), Some(HistoryState::at(0.0)));
        assert_eq!(h.manager.current_url(), url("/years/1998/"));
    }

    #[test]
    fn test_capture_round_trips_document() {
        let h = harness();
        let extracted = DocumentExtractor::new("#content")
            .unwrap()
            .extract(&page("1998", ".y98{}", "<h1>1998</h1>"))
            .unwrap();

        let captured = h.manager.cached(&url("/years/1998/")).unwrap();

        assert_eq!(captured, extracted);
        assert_eq!(
            captured.head_nodes,
            vec![HeadNode::stylesheet("/css/site.css"), HeadNode::style(".y98{}")]
        );
    }

    #[tokio::test]
    async fn test_restore_from_cache_matches_original() {
        let h = harness();
        let original = (h.host.content_html(), h.host.title(), managed_head_nodes(h.host.as_ref()));

        h.manager.navigate(url("/years/1999/")).await;
        let state = h.host.back().unwrap();
        let outcome = h.manager.handle_pop_state(state).await;

        assert_eq!(outcome, NavOutcome::Swapped { url: url("/years/1998/") });
        assert_eq!((h.host.content_html(), h.host.title(), managed_head_nodes(h.host.as_ref())), original);
        assert_eq!(h.fetcher.calls_to("/years/1998/"), 0);
    }

    #[tokio::test]
    async fn test_plain_click_is_intercepted_and_swaps() {
        let h = harness();
        let mut events = h.manager.subscribe();

        let nav = h.manager.handle_click(&ClickEvent::primary(link("/years/1999/"))).expect("intercepted");
        let outcome = nav.await;

        assert_eq!(outcome, NavOutcome::Swapped { url: url("/years/1999/") });
        assert_eq!(h.host.location(), url("/years/1999/"));
        assert_eq!(h.host.title(), "1999");
        assert_eq!(h.host.content_html().as_deref(), Some("<h1>1999</h1>"));
        assert_eq!(h.host.history_state(), Some(HistoryState::at(0.0)));
        assert!(h.host.content_focused());
        assert!(h.host.native_loads().is_empty());
        assert_eq!(
            managed_head_nodes(h.host.as_ref()),
            vec![HeadNode::stylesheet("/css/site.css"), HeadNode::style(".y99{}")]
        );

        let event = events.recv().await.unwrap();
        assert_eq!(event.url, url("/years/1999/"));
        assert_eq!(event.title, "1999");
        assert_eq!(event.cause, SwapCause::Navigate);
    }

    #[tokio::test]
    async fn test_swap_keeps_shared_stylesheet_and_unmanaged_script() {
        let h = harness();
        h.host.reset_head_counters();

        h.manager.navigate(url("/years/1999/")).await;

        // Only the page-specific style block is replaced.
        assert_eq!(h.host.head_counters(), (1, 1));
        assert_eq!(h.host.head_elements().iter().filter(|e| e.managed_key.is_none()).count(), 1);
    }

    #[test]
    fn test_modified_clicks_are_left_to_browser() {
        let h = harness();
        let mut click = ClickEvent::primary(link("/years/1999/"));
        click.modifiers.ctrl = true;
        assert!(h.manager.handle_click(&click).is_none());

        let mut click = ClickEvent::primary(link("/years/1999/"));
        click.button = 2;
        assert!(h.manager.handle_click(&click).is_none());

        assert!(h.manager.handle_click(&ClickEvent::primary(link("https://other.example/"))).is_none());
    }

    #[tokio::test]
    async fn test_same_document_link_is_never_intercepted() {
        let h = harness();
        assert!(h.manager.handle_intent(&hover("/years/1998/")).is_none());
        assert!(h.manager.handle_intent(&hover("#cast")).is_none());
        assert!(h.manager.handle_click(&ClickEvent::primary(link("/years/1998/#cast"))).is_none());
        assert_eq!(h.fetcher.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_save_data_disables_prefetch_only() {
        let h = harness();
        h.host.set_save_data(true);

        assert!(h.manager.handle_intent(&hover("/years/1999/")).is_none());
        assert_eq!(h.fetcher.calls_to("/years/1999/"), 0);

        let nav = h.manager.handle_click(&ClickEvent::primary(link("/years/1999/"))).unwrap();
        assert_eq!(nav.await, NavOutcome::Swapped { url: url("/years/1999/") });
    }

    #[tokio::test]
    async fn test_concurrent_prefetches_issue_one_fetch() {
        let h = harness();
        let gate = h.fetcher.gate("/years/1999/");

        let tasks: Vec<_> = (0..5)
            .map(|_| h.manager.handle_intent(&hover("/years/1999/")).unwrap())
            .collect();
        while h.fetcher.started.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(h.manager.in_flight_count(), 1);

        gate.notify_one();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(h.fetcher.calls_to("/years/1999/"), 1);
        assert_eq!(h.manager.in_flight_count(), 0);
        assert!(h.manager.cached(&url("/years/1999/")).is_some());
    }

    #[tokio::test]
    async fn test_hover_then_click_before_prefetch_resolves() {
        let h = harness();
        let gate = h.fetcher.gate("/years/1999/");

        let prefetch = h.manager.handle_intent(&hover("/years/1999/")).unwrap();
        while h.fetcher.started.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        let nav = tokio::spawn(h.manager.handle_click(&ClickEvent::primary(link("/years/1999/"))).unwrap());
        tokio::task::yield_now().await;
        assert_eq!(h.host.title(), "1998");

        gate.notify_one();
        let outcome = nav.await.unwrap();
        prefetch.await.unwrap();

        assert_eq!(outcome, NavOutcome::Swapped { url: url("/years/1999/") });
        assert_eq!(h.fetcher.calls_to("/years/1999/"), 1);
        assert_eq!(h.fetcher.calls.lock()[0].1, FetchPurpose::Prefetch);
        assert_eq!(h.host.title(), "1999");
    }

    #[tokio::test]
    async fn test_failed_navigation_falls_back_to_native_load() {
        let h = harness();

        let nav = h.manager.handle_click(&ClickEvent::primary(link("/decades/1980s/"))).unwrap();
        let outcome = nav.await;

        assert!(matches!(outcome, NavOutcome::FellBack { error: NavError::Network(_), .. }));
        assert_eq!(h.host.native_loads(), vec![url("/decades/1980s/")]);
        assert_eq!(h.host.title(), "1998");
        assert_eq!(h.host.history_len(), 1);
        assert!(h.manager.cached(&url("/decades/1980s/")).is_none());
    }

    #[tokio::test]
    async fn test_missing_region_is_treated_as_failure() {
        let h = harness();

        let outcome = h.manager.navigate(url("/broken/")).await;

        assert!(matches!(outcome, NavOutcome::FellBack { error: NavError::MissingContentRegion(_), .. }));
        assert!(h.manager.cached(&url("/broken/")).is_none());
        assert_eq!(h.host.native_loads(), vec![url("/broken/")]);
    }

    #[tokio::test]
    async fn test_failed_prefetch_is_silent_and_retried_on_click() {
        let h = harness();
        h.manager.handle_intent(&hover("/later/")).unwrap().await.unwrap();
        assert!(h.host.native_loads().is_empty());
        assert_eq!(h.manager.in_flight_count(), 0);

        h.fetcher.serve("/later/", page("Later", "", "<p>later</p>"));
        let outcome = h.manager.navigate(url("/later/")).await;

        assert_eq!(outcome, NavOutcome::Swapped { url: url("/later/") });
        assert_eq!(h.fetcher.calls_to("/later/"), 2);
    }

    #[tokio::test]
    async fn test_back_restores_scroll_offset() {
        let h = harness();
        h.host.scroll_to(300.0);

        h.manager.navigate(url("/years/1999/")).await;
        assert_eq!(h.host.scroll_y(), 0.0);
        h.host.scroll_to(80.0);

        let state = h.host.back().unwrap();
        let outcome = h.manager.handle_pop_state(state).await;

        assert_eq!(outcome, NavOutcome::Swapped { url: url("/years/1998/") });
        assert_eq!(h.host.scroll_y(), 300.0);
        assert_eq!(h.host.title(), "1998");
        assert_eq!(h.manager.current_url(), url("/years/1998/"));
    }

    #[tokio::test]
    async fn test_forward_after_back_uses_cache() {
        let h = harness();
        h.manager.navigate(url("/years/1999/")).await;
        let state = h.host.back().unwrap();
        h.manager.handle_pop_state(state).await;

        let state = h.host.forward().unwrap();
        let mut events = h.manager.subscribe();
        let outcome = h.manager.handle_pop_state(state).await;

        assert_eq!(outcome, NavOutcome::Swapped { url: url("/years/1999/") });
        assert_eq!(h.fetcher.calls_to("/years/1999/"), 1);
        assert_eq!(events.recv().await.unwrap().cause, SwapCause::HistoryPop);
    }

    #[tokio::test]
    async fn test_pop_without_state_scrolls_to_top() {
        let h = harness();
        h.host.push_history_state(HistoryState::at(10.0), &url("/years/2000/"));
        h.host.scroll_to(500.0);

        // Entry pushed by a foreign script carries no recognised state.
        let outcome = h.manager.handle_pop_state(None).await;

        assert_eq!(outcome, NavOutcome::Swapped { url: url("/years/2000/") });
        assert_eq!(h.host.scroll_y(), 0.0);
    }

    #[tokio::test]
    async fn test_same_document_pop_only_restores_scroll() {
        let h = harness();
        h.host.replace_history_state(HistoryState::at(120.0));
        h.host.push_history_state(HistoryState::at(0.0), &url("/years/1998/#cast"));
        h.host.scroll_to(900.0);

        let state = h.host.back().unwrap();
        let outcome = h.manager.handle_pop_state(state).await;

        assert_eq!(outcome, NavOutcome::ScrollRestored { url: url("/years/1998/") });
        assert_eq!(h.host.scroll_y(), 120.0);
        assert_eq!(h.fetcher.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_pop_falls_back() {
        let h = harness();
        h.host.push_history_state(HistoryState::at(0.0), &url("/gone/"));

        let outcome = h.manager.handle_pop_state(None).await;

        assert!(matches!(outcome, NavOutcome::FellBack { .. }));
        assert_eq!(h.host.native_loads(), vec![url("/gone/")]);
    }

    #[tokio::test]
    async fn test_stale_navigation_is_superseded() {
        let h = harness();
        let gate = h.fetcher.gate("/years/1999/");

        let slow = tokio::spawn(h.manager.navigate(url("/years/1999/")));
        while h.fetcher.started.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        let fast = h.manager.navigate(url("/years/2000/")).await;
        gate.notify_one();
        let slow = slow.await.unwrap();

        assert_eq!(fast, NavOutcome::Swapped { url: url("/years/2000/") });
        assert_eq!(slow, NavOutcome::Superseded { url: url("/years/1999/") });
        assert_eq!(h.host.location(), url("/years/2000/"));
        assert_eq!(h.host.title(), "2000");
        assert!(h.manager.cached(&url("/years/1999/")).is_some());
    }

    #[tokio::test]
    async fn test_navigation_recaptures_outgoing_page() {
        let h = harness();
        h.host.replace_content("<h1>1998</h1><p>sorted by year</p>");

        h.manager.navigate(url("/years/1999/")).await;

        let entry = h.manager.cached(&url("/years/1998/")).unwrap();
        assert_eq!(entry.content_html, "<h1>1998</h1><p>sorted by year</p>");
    }

    #[tokio::test]
    async fn test_session_cache_is_bounded() {
        let start = page("1998", "", "<h1>1998</h1>");
        let host = Arc::new(MemoryHost::from_html(url("/years/1998/"), &start, "#content").unwrap());
        let fetcher = Arc::new(ScriptedFetcher::default());
        fetcher.serve("/years/1999/", page("1999", "", "x"));
        fetcher.serve("/years/2000/", page("2000", "", "y"));
        let config = NavConfig { session_cache_capacity: 2, ..Default::default() };
        let manager = NavigationManager::init(host, fetcher.clone(), config).unwrap();

        manager.prefetch(&url("/years/1999/")).await.unwrap();
        manager.prefetch(&url("/years/2000/")).await.unwrap();

        assert!(manager.cached(&url("/years/1998/")).is_none());
        assert!(manager.cached(&url("/years/1999/")).is_some());
        assert!(manager.cached(&url("/years/2000/")).is_some());
    }

    #[tokio::test]
    async fn test_redirected_navigation_lands_on_final_url() {
        let h = harness();
        h.fetcher.redirect("/years/1999", url("/years/1999/"));

        let outcome = h.manager.navigate(url("/years/1999#cast")).await;

        assert_eq!(outcome, NavOutcome::Swapped { url: url("/years/1999/#cast") });
        assert_eq!(h.host.location(), url("/years/1999/#cast"));
        assert_eq!(h.manager.current_url(), url("/years/1999/#cast"));
        assert!(h.manager.cached(&url("/years/1999/")).is_some());
        assert!(h.manager.cached(&url("/years/1999")).is_none());

        let nav = h.manager.handle_click(&ClickEvent::primary(link("../2000/"))).unwrap();
        assert_eq!(nav.await, NavOutcome::Swapped { url: url("/years/2000/") });
    }

    #[tokio::test]
    async fn test_cross_origin_redirect_falls_back() {
        let h = harness();
        h.fetcher.redirect("/films/", Url::parse("https://other.example/films/").unwrap());
        h.fetcher.serve_absolute("https://other.example/films/", page("Other", "", "x"));

        let outcome = h.manager.navigate(url("/films/")).await;

        assert!(matches!(outcome, NavOutcome::FellBack { error: NavError::Other(_), .. }));
        assert_eq!(h.host.native_loads(), vec![url("/films/")]);
        assert_eq!(h.host.title(), "1998");
    }

    #[tokio::test]
    async fn test_trailing_slash_redirect_over_http() {
        use crate::fetch::FetchConfig;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/years/1999"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/years/1999/"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/years/1999/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(page("1999", "", r#"<a href="../2000/">2000</a>"#)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/years/2000/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page("2000", "", "<h1>2000</h1>")))
            .expect(1)
            .mount(&server)
            .await;

        let at = |p: &str| Url::parse(&server.uri()).unwrap().join(p).unwrap();
        let host = Arc::new(MemoryHost::from_html(at("/years/1998/"), &page("1998", "", "x"), "#content").unwrap());
        let client = Arc::new(FetchClient::new(FetchConfig::default()).unwrap());
        let manager = NavigationManager::init(host.clone(), client, NavConfig::default()).unwrap();

        let outcome = manager.navigate(at("/years/1999")).await;
        assert_eq!(outcome, NavOutcome::Swapped { url: at("/years/1999/") });
        assert_eq!(host.location(), at("/years/1999/"));

        let nav = manager.handle_click(&ClickEvent::primary(link("../2000/"))).unwrap();
        assert_eq!(nav.await, NavOutcome::Swapped { url: at("/years/2000/") });
        assert_eq!(host.title(), "2000");
    }
}
