//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use scraper::Selector;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent`, `cache_prefix` or a version token is empty
    /// - `content_selector` does not parse as a CSS selector
    /// - `session_cache_capacity` is 0
    /// - a static prefix is not an absolute path
    ///
    /// Returns `ConfigError::Missing` if `precache_paths` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.content_selector.trim().is_empty() {
            return Err(invalid("content_selector", "must not be empty"));
        }
        if let Err(e) = Selector::parse(&self.content_selector) {
            return Err(ConfigError::Invalid {
                field: "content_selector".into(),
                reason: format!("not a valid CSS selector: {e:?}"),
            });
        }

        if self.session_cache_capacity == 0 {
            return Err(invalid("session_cache_capacity", "must be greater than 0"));
        }

        if self.cache_prefix.is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }
        if self.html_cache_version.is_empty() {
            return Err(invalid("html_cache_version", "must not be empty"));
        }
        if self.static_cache_version.is_empty() {
            return Err(invalid("static_cache_version", "must not be empty"));
        }

        if self.precache_paths.is_empty() {
            return Err(ConfigError::Missing {
                field: "precache_paths".into(),
                hint: "list at least the site root, e.g. [\"/\"]".into(),
            });
        }

        if let Some(prefix) = self.static_prefixes.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "static_prefixes".into(),
                reason: format!("{prefix:?} must start with '/'"),
            });
        }

        if self.session_cache_capacity > 10_000 {
            tracing::warn!(
                capacity = self.session_cache_capacity,
                "session_cache_capacity is very large; every entry holds a full content region"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<(), ConfigError>) -> Option<String> {
        match result {
            Err(ConfigError::Invalid { field, .. }) | Err(ConfigError::Missing { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("max_bytes"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("timeout_ms"));
    }

    #[test]
    fn test_validate_bad_selector() {
        let config = AppConfig { content_selector: "##".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("content_selector"));

        let config = AppConfig { content_selector: "  ".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("content_selector"));
    }

    #[test]
    fn test_validate_zero_capacity() {
        let config = AppConfig { session_cache_capacity: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("session_cache_capacity"));
    }

    #[test]
    fn test_validate_empty_version() {
        let config = AppConfig { html_cache_version: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("html_cache_version"));
    }

    #[test]
    fn test_validate_missing_precache() {
        let config = AppConfig { precache_paths: Vec::new(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_validate_relative_static_prefix() {
        let config = AppConfig { static_prefixes: vec!["static/".into()], ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("static_prefixes"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, session_cache_capacity: 1, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
