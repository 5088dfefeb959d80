use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::common::config::DocumentedConfig;
use crate::common::paths;
use crate::documented_config;

pub const PANEL_URL_ENV: &str = "USERDECK_PANEL_URL";
pub const API_KEY_ENV: &str = "USERDECK_API_KEY";

/// Largest page size the application API accepts
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the panel, without the `/api` suffix
    pub panel_url: String,
    /// Application API key sent as a bearer token
    pub api_key: Option<String>,
    pub per_page: u32,
    pub search_debounce_ms: u64,
    /// Window in which identical requests are served from cache
    pub dedupe_interval_ms: u64,
    pub error_retry_interval_ms: u64,
    /// Retries after a failed fetch; unlimited when unset
    pub error_retry_count: Option<u32>,
    pub request_timeout_secs: u64,
    /// Use Nerd Font glyphs for icons instead of text labels
    pub nerd_font_icons: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            panel_url: "http://localhost".to_string(),
            api_key: None,
            per_page: 50,
            search_debounce_ms: 200,
            dedupe_interval_ms: 2000,
            error_retry_interval_ms: 5000,
            error_retry_count: None,
            request_timeout_secs: 15,
            nerd_font_icons: true,
        }
    }
}

documented_config!(AppConfig {
    fields: [
        panel_url, "Base URL of the panel",
        per_page, "Users per page (1-100)",
        search_debounce_ms, "Quiet time after typing before a search is sent",
        dedupe_interval_ms, "Identical requests within this window reuse the cached page",
        error_retry_interval_ms, "Base delay for exponential retry after a failed fetch",
        request_timeout_secs, "HTTP request timeout",
        nerd_font_icons, "Render icons with Nerd Font glyphs",
    ],
    optional: [
        api_key, "Application API key (or set USERDECK_API_KEY)",
        error_retry_count, "Maximum retries after a failed fetch (unlimited when unset)",
    ],
    config_path: paths::config_file(),
});

impl AppConfig {
    /// Load the user config and apply environment overrides
    pub fn load() -> Result<Self> {
        let path = <Self as DocumentedConfig>::config_path()?;
        let mut config = Self::load_from_path(&path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config = <Self as DocumentedConfig>::load_from_path_documented(path)?;
        Ok(config.sanitized())
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(PANEL_URL_ENV)
            && !url.trim().is_empty()
        {
            self.panel_url = url.trim().to_string();
        }
        if let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.trim().is_empty()
        {
            self.api_key = Some(key.trim().to_string());
        }
    }

    /// Returns a copy with out-of-range values replaced
    pub fn sanitized(mut self) -> Self {
        self.panel_url = self.panel_url.trim().trim_end_matches('/').to_string();
        self.per_page = self.per_page.clamp(1, MAX_PER_PAGE);
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = Self::default().request_timeout_secs;
        }
        self.api_key = self
            .api_key
            .take()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        self
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn dedupe_interval(&self) -> Duration {
        Duration::from_millis(self.dedupe_interval_ms)
    }

    pub fn error_retry_interval(&self) -> Duration {
        Duration::from_millis(self.error_retry_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_missing_file_writes_documented_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config, AppConfig::default());

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("panel_url = \"http://localhost\"  # Base URL of the panel"));
        assert!(written.contains("# api_key = \"\""));
        assert!(written.contains("# error_retry_count = 0"));

        // The generated file must load back unchanged
        assert_eq!(AppConfig::load_from_path(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_keeps_defaults_and_sanitizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "panel_url = \"https://panel.example.com/\"\nper_page = 500\napi_key = \"  \"\n",
        )
        .unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.panel_url, "https://panel.example.com");
        assert_eq!(config.per_page, MAX_PER_PAGE);
        assert_eq!(config.api_key, None);
        assert_eq!(config.search_debounce(), Duration::from_millis(200));
    }

    #[test]
    fn test_set_optional_field_is_written_uncommented() {
        let config = AppConfig {
            api_key: Some("ptla_secret".to_string()),
            ..AppConfig::default()
        };
        let rendered = config.to_documented_string();
        assert!(rendered.contains("api_key = \"ptla_secret\""));
        assert!(!rendered.contains("# api_key"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        unsafe {
            std::env::set_var(PANEL_URL_ENV, "https://env.example.com");
            std::env::set_var(API_KEY_ENV, "ptla_env");
        }

        let mut config = AppConfig::default();
        config.apply_env_overrides();

        unsafe {
            std::env::remove_var(PANEL_URL_ENV);
            std::env::remove_var(API_KEY_ENV);
        }

        assert_eq!(config.panel_url, "https://env.example.com");
        assert_eq!(config.api_key.as_deref(), Some("ptla_env"));
    }
}
