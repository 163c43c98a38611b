//! Client side of swapnav.
//!
//! This crate provides the HTTP fetch pipeline, document extraction, the
//! session-tier navigation manager and the persistent cache worker.

pub mod document;
pub mod fetch;
pub mod nav;
pub mod worker;

pub use document::{DocumentExtractor, HeadNode, PageEntry};
pub use fetch::{FetchClient, FetchConfig, FetchPurpose, FetchResponse};
pub use nav::{MemoryHost, NavConfig, NavOutcome, NavigationManager, PageFetcher, PageHost};
pub use worker::{CacheWorker, FetchDecision, Network, WorkerConfig, WorkerRegistration, WorkerRequest};
