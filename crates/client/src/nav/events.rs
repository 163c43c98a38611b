//! "Content replaced" notifications.
//!
//! Behaviors bound to the content region (search boxes, sortable tables,
//! scroll-spy) subscribe here and re-bind after each swap instead of hooking
//! into the navigation manager.

use tokio::sync::broadcast;
use url::Url;

/// What triggered a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapCause {
    Navigate,
    HistoryPop,
}

/// Published after the content region was replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentReplaced {
    pub url: Url,
    pub title: String,
    pub cause: SwapCause,
}

#[derive(Debug, Clone)]
pub struct ContentEvents {
    tx: broadcast::Sender<ContentReplaced>,
}

impl ContentEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContentReplaced> {
        self.tx.subscribe()
    }

    /// Publish an event, returning how many subscribers will see it.
    pub fn publish(&self, event: ContentReplaced) -> usize {
        self.tx.send(event).unwrap_or(0)
    }
}

impl Default for ContentEvents {
    fn default() -> Self {
        Self::new(16)
    }
}
