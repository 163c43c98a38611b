//! Session tier: prefetch on intent, click interception and content swaps.
//!
//! The engine drives a page through [`PageHost`] and fetches documents through
//! [`PageFetcher`]; neither is tied to a real browser.

pub mod error;
pub mod events;
pub mod host;
pub mod link;
pub mod manager;
pub mod memory;
pub mod reconcile;
pub mod session;

pub use error::NavError;
pub use events::{ContentEvents, ContentReplaced, SwapCause};
pub use host::{HeadElementId, HistoryState, LiveHeadElement, PageHost};
pub use link::{ClickEvent, ElementInfo, EventTarget, IntentEvent, IntentKind, LinkRejection, Modifiers, eligible_link};
pub use manager::{FetchedPage, NavConfig, NavOutcome, NavigationManager, PageFetcher};
pub use memory::MemoryHost;
pub use reconcile::{ReconcileStats, adopt_head, managed_head_nodes, reconcile_head};
pub use session::SessionCache;
