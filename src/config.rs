// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::generate::ai_adapter::DEFAULT_MODEL;
use crate::generate::haiku::DEFAULT_MAX_EXCERPT_CHARS;
use crate::generate::rate_limit::DEFAULT_MAX_PER_SECOND;
use crate::ingest::registry::SourceRegistry;
use crate::ingest::types::FeedSource;
use crate::pipeline::PipelineSettings;
use crate::translate::{cache::DEFAULT_CACHE_FILE, DEFAULT_LANGUAGE};

pub const ENV_CONFIG_PATH: &str = "HAIKU_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/haiku.toml";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_AI_TEST_MODE: &str = "AI_TEST_MODE";

fn default_sources_per_cycle() -> usize {
    2
}
fn default_max_items_per_feed() -> usize {
    5
}
fn default_poll_interval_secs() -> u64 {
    2 * 60
}
fn default_cache_lifetime_secs() -> u64 {
    3 * 60 * 60
}
fn default_rate_limit_per_sec() -> u32 {
    DEFAULT_MAX_PER_SECOND
}
fn default_batch_size() -> usize {
    3
}
fn default_batch_pause_ms() -> u64 {
    500
}
fn default_max_excerpt_chars() -> usize {
    DEFAULT_MAX_EXCERPT_CHARS
}
fn default_translation_cache_path() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_FILE)
}
fn default_translation_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Overrides the built-in feed list when non-empty.
    #[serde(default)]
    pub feeds: Vec<FeedSource>,
    #[serde(default = "default_sources_per_cycle")]
    pub sources_per_cycle: usize,
    #[serde(default = "default_max_items_per_feed")]
    pub max_items_per_feed: usize,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_cache_lifetime_secs")]
    pub cache_lifetime_secs: u64,
    #[serde(default = "default_rate_limit_per_sec")]
    pub rate_limit_per_sec: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,
    #[serde(default = "default_max_excerpt_chars")]
    pub max_excerpt_chars: usize,
    #[serde(default = "default_translation_cache_path")]
    pub translation_cache_path: PathBuf,
    #[serde(default = "default_translation_language")]
    pub translation_language: String,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            sources_per_cycle: default_sources_per_cycle(),
            max_items_per_feed: default_max_items_per_feed(),
            poll_interval_secs: default_poll_interval_secs(),
            cache_lifetime_secs: default_cache_lifetime_secs(),
            rate_limit_per_sec: default_rate_limit_per_sec(),
            batch_size: default_batch_size(),
            batch_pause_ms: default_batch_pause_ms(),
            max_excerpt_chars: default_max_excerpt_chars(),
            translation_cache_path: default_translation_cache_path(),
            translation_language: default_translation_language(),
            model: default_model(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(s).context("parsing haiku config")?;
        Ok(cfg.sanitized())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallbacks:
    /// 1) $HAIKU_CONFIG_PATH (must exist)
    /// 2) config/haiku.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            } else {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
        }
        let p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if p.exists() {
            return Self::load_from_file(&p);
        }
        Ok(Self::default())
    }

    // Zeros would stall or disable the pipeline; fall back to defaults instead.
    fn sanitized(mut self) -> Self {
        if self.sources_per_cycle == 0 {
            self.sources_per_cycle = default_sources_per_cycle();
        }
        if self.max_items_per_feed == 0 {
            self.max_items_per_feed = default_max_items_per_feed();
        }
        if self.poll_interval_secs == 0 {
            self.poll_interval_secs = default_poll_interval_secs();
        }
        if self.cache_lifetime_secs == 0 {
            self.cache_lifetime_secs = default_cache_lifetime_secs();
        }
        if self.rate_limit_per_sec == 0 {
            self.rate_limit_per_sec = default_rate_limit_per_sec();
        }
        if self.batch_size == 0 {
            self.batch_size = default_batch_size();
        }
        if self.max_excerpt_chars == 0 {
            self.max_excerpt_chars = default_max_excerpt_chars();
        }
        self.feeds
            .retain(|f| !f.name.trim().is_empty() && !f.url.trim().is_empty());
        self
    }

    pub fn registry(&self) -> SourceRegistry {
        if self.feeds.is_empty() {
            SourceRegistry::default()
        } else {
            SourceRegistry::new(self.feeds.clone())
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            sources_per_cycle: self.sources_per_cycle,
            max_items_per_feed: self.max_items_per_feed,
            batch_size: self.batch_size,
            batch_pause: Duration::from_millis(self.batch_pause_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn cache_lifetime(&self) -> Duration {
        Duration::from_secs(self.cache_lifetime_secs)
    }
}

/// `AI_TEST_MODE=mock` swaps the OpenAI client for a fixed-output mock.
pub fn ai_mock_mode() -> bool {
    std::env::var(ENV_AI_TEST_MODE)
        .map(|v| v == "mock")
        .unwrap_or(false)
}

/// The OpenAI key is mandatory outside mock mode; a missing key stops startup.
pub fn openai_api_key() -> Result<String> {
    let key = std::env::var(ENV_OPENAI_API_KEY)
        .map_err(|_| anyhow!("Missing {ENV_OPENAI_API_KEY} env var"))?;
    if key.trim().is_empty() {
        return Err(anyhow!("{ENV_OPENAI_API_KEY} is empty"));
    }
    Ok(key)
}
