//! Core types and shared functionality for swapnav.
//!
//! This crate provides:
//! - Persistent cache storage with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, StoredResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
