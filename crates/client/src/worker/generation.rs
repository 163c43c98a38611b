use swapnav_core::AppConfig;

/// The pair of store names the current worker version owns.
///
/// Bumping either version token yields a new name; the old store is deleted
/// on the next activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheGeneration {
    pub html: String,
    pub static_assets: String,
}

impl CacheGeneration {
    pub fn new(prefix: &str, html_version: &str, static_version: &str) -> Self {
        Self {
            html: format!("{prefix}-html-{html_version}"),
            static_assets: format!("{prefix}-static-{static_version}"),
        }
    }

    pub fn contains(&self, store: &str) -> bool {
        store == self.html || store == self.static_assets
    }
}

impl From<&AppConfig> for CacheGeneration {
    fn from(config: &AppConfig) -> Self {
        Self { html: config.html_store_name(), static_assets: config.static_store_name() }
    }
}
