//! Host configuration.
//!
//! Stored at `~/.config/travelcache/config.json`. Environment variables (and
//! a `.env` file) override the stored values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::DEFAULT_STALE_MINUTES;
use crate::remote::RetryPolicy;
use crate::reviews::DEFAULT_PAGE_SIZE;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "travelcache";

const CONFIG_FILE: &str = "config.json";

const ENV_USER_ID: &str = "TRAVELCACHE_USER_ID";
const ENV_PAGE_SIZE: &str = "TRAVELCACHE_PAGE_SIZE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user_id: Option<i64>,
    pub review_page_size: usize,
    pub cache_stale_minutes: i64,
    pub fetch_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: None,
            review_page_size: DEFAULT_PAGE_SIZE,
            cache_stale_minutes: DEFAULT_STALE_MINUTES,
            fetch_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&contents).with_context(|| format!("Invalid config {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents).with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Per-user cache directory.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;

        let mut path = cache_dir.join(APP_NAME);
        if let Some(user_id) = self.user_id {
            path = path.join(user_id.to_string());
        }
        Ok(path)
    }

    /// Load `.env` if present and apply environment overrides.
    pub fn apply_env(&mut self) {
        let _ = dotenvy::dotenv();
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_USER_ID) {
            match raw.trim().parse() {
                Ok(id) => self.user_id = Some(id),
                Err(_) => warn!(value = %raw, "Ignoring invalid {}", ENV_USER_ID),
            }
        }
        if let Some(raw) = lookup(ENV_PAGE_SIZE) {
            match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => self.review_page_size = size,
                _ => warn!(value = %raw, "Ignoring invalid {}", ENV_PAGE_SIZE),
            }
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.fetch_retries, Duration::from_millis(self.retry_backoff_ms))
    }
}
