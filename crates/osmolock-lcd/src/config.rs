use serde::{Deserialize, Serialize};

use osmolock_core::constants::{DEFAULT_LCD_URL, DEFAULT_TIMEOUT_SECS};

/// Connection settings for an LCD endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LcdConfig {
    /// Scheme and host, optionally with a path prefix. No trailing slash needed.
    pub base_url: String,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for LcdConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LCD_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: concat!("osmolock/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl LcdConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
