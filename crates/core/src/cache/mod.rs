//! SQLite-backed persistent cache storage.
//!
//! This module provides the named, versioned cache stores the worker answers
//! fetches from, using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named stores keyed by request URL, overwrite-only writes
//! - Bulk invalidation by deleting a whole store
//! - Automatic schema migrations
//! - WAL mode for concurrent access from many fetch events

pub mod connection;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use stores::StoredResponse;
