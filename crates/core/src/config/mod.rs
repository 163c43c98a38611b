//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWAPNAV_*)
//! 2. TOML config file (if SWAPNAV_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWAPNAV_*)
/// 2. TOML config file (if SWAPNAV_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite file backing the persistent cache stores.
    ///
    /// Set via SWAPNAV_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SWAPNAV_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SWAPNAV_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to read per document.
    ///
    /// Set via SWAPNAV_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// CSS selector locating the content region in every page.
    ///
    /// Set via SWAPNAV_CONTENT_SELECTOR environment variable.
    #[serde(default = "default_content_selector")]
    pub content_selector: String,

    /// Maximum number of pages held by the session cache.
    ///
    /// Set via SWAPNAV_SESSION_CACHE_CAPACITY environment variable.
    #[serde(default = "default_session_cache_capacity")]
    pub session_cache_capacity: usize,

    /// Prefix shared by both persistent store names.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version token of the HTML store. Bump to purge cached documents.
    ///
    /// Set via SWAPNAV_HTML_CACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub html_cache_version: String,

    /// Version token of the static-asset store.
    ///
    /// Set via SWAPNAV_STATIC_CACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub static_cache_version: String,

    /// Paths pre-populated into the HTML store on install.
    #[serde(default = "default_precache_paths")]
    pub precache_paths: Vec<String>,

    /// Path prefixes always treated as static assets.
    #[serde(default = "default_static_prefixes")]
    pub static_prefixes: Vec<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swapnav-cache.sqlite")
}

fn default_user_agent() -> String {
    "swapnav/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_content_selector() -> String {
    "#content".into()
}

fn default_session_cache_capacity() -> usize {
    64
}

fn default_cache_prefix() -> String {
    "swapnav".into()
}

fn default_version() -> String {
    "v1".into()
}

fn default_precache_paths() -> Vec<String> {
    vec!["/".into()]
}

fn default_static_prefixes() -> Vec<String> {
    vec!["/static/".into(), "/assets/".into()]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            content_selector: default_content_selector(),
            session_cache_capacity: default_session_cache_capacity(),
            cache_prefix: default_cache_prefix(),
            html_cache_version: default_version(),
            static_cache_version: default_version(),
            precache_paths: default_precache_paths(),
            static_prefixes: default_static_prefixes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the versioned HTML store, e.g. `swapnav-html-v1`.
    pub fn html_store_name(&self) -> String {
        format!("{}-html-{}", self.cache_prefix, self.html_cache_version)
    }

    /// Name of the versioned static-asset store, e.g. `swapnav-static-v1`.
    pub fn static_store_name(&self) -> String {
        format!("{}-static-{}", self.cache_prefix, self.static_cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWAPNAV_`
    /// 2. TOML file from `SWAPNAV_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWAPNAV_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWAPNAV_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
