use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_LOAD_MORE_THROTTLE_MS: u64 = 1000;
pub const DEFAULT_SCROLL_THRESHOLD_PX: f64 = 20.0;
pub const DEFAULT_COMMENT_TTL_SECONDS: u64 = 5 * 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevueConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub comments: CommentConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub page_size: usize,
    pub load_more_throttle_ms: u64,
    pub scroll_threshold_px: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentConfig {
    pub ttl_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            anon_key: String::new(),
            request_timeout_seconds: 10,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            load_more_throttle_ms: DEFAULT_LOAD_MORE_THROTTLE_MS,
            scroll_threshold_px: DEFAULT_SCROLL_THRESHOLD_PX,
        }
    }
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_COMMENT_TTL_SECONDS,
        }
    }
}

impl FeedConfig {
    /// Clamps `page_size` to at least 1; a zero page size would never end a feed.
    pub fn normalized(mut self) -> Self {
        if self.page_size == 0 {
            warn!("feed.page_size is 0, using 1");
            self.page_size = 1;
        }
        self
    }

    pub fn load_more_throttle(&self) -> Duration {
        Duration::from_millis(self.load_more_throttle_ms)
    }
}

impl CommentConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl RevueConfig {
    /// `<config dir>/revue/config.json`, creating the directory if needed.
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        let app_config_dir = config_dir.join("revue");
        std::fs::create_dir_all(&app_config_dir)?;
        Ok(app_config_dir.join("config.json"))
    }

    /// Loads the user's config file, falling back to defaults when it is
    /// missing or unreadable. The defaults are written back so the file can be
    /// edited afterwards.
    pub fn load() -> Self {
        match Self::config_file_path().and_then(|path| Self::load_from(&path)) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "could not load config, using defaults");
                let default_config = Self::default();
                if let Err(save_err) = default_config.save() {
                    warn!(error = %save_err, "could not save default config");
                }
                default_config
            }
        }
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&content)?;
        config.feed = config.feed.normalized();
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::config_file_path()?)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write then rename so a crash never leaves a truncated file behind.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Applies `REVUE_BACKEND_URL`, `REVUE_ANON_KEY` and
    /// `REVUE_REQUEST_TIMEOUT_SECS` on top of the loaded values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("REVUE_BACKEND_URL") {
            info!("REVUE_BACKEND_URL set, overriding backend url");
            self.backend.url = url;
        }
        if let Some(key) = lookup("REVUE_ANON_KEY") {
            self.backend.anon_key = key;
        }
        if let Some(raw) = lookup("REVUE_REQUEST_TIMEOUT_SECS") {
            match raw.parse() {
                Ok(secs) => self.backend.request_timeout_seconds = secs,
                Err(e) => warn!(value = %raw, error = %e, "invalid REVUE_REQUEST_TIMEOUT_SECS"),
            }
        }
        self
    }
}
