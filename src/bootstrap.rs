// src/bootstrap.rs
//! Wiring: config + collaborators -> shared state and router.

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tracing::{info, warn};

use crate::api::{self, AppState};
use crate::config::{self, AppConfig};
use crate::generate::{DynGenerator, HaikuGenerator, MockProvider, OpenAiProvider, RateLimiter};
use crate::ingest::rss::RssFeedClient;
use crate::ingest::types::FeedClient;
use crate::live::{LiveChannel, LiveSettings};
use crate::pipeline::Pipeline;
use crate::store::HaikuStore;
use crate::translate::{TranslationCache, Translator};

pub struct AppRuntime {
    pub cfg: AppConfig,
    pub generator: DynGenerator,
    pub feeds: Arc<dyn FeedClient>,
}

impl AppRuntime {
    /// Production wiring. Fails when the OpenAI key is missing (unless in mock mode).
    pub fn from_env() -> Result<Self> {
        let cfg = AppConfig::load_default()?;
        let generator: DynGenerator = if config::ai_mock_mode() {
            warn!("AI_TEST_MODE=mock: using fixed-output generator");
            Arc::new(MockProvider::default())
        } else {
            let key = config::openai_api_key()?;
            Arc::new(OpenAiProvider::new(key, Some(&cfg.model))?)
        };
        // Safe diagnostics only: never log the key.
        info!(
            provider = generator.provider_name(),
            model = %cfg.model,
            feeds = cfg.registry().all().len(),
            poll_secs = cfg.poll_interval_secs,
            "runtime configured"
        );
        Ok(Self {
            cfg,
            generator,
            feeds: Arc::new(RssFeedClient::http()?),
        })
    }

    pub fn new(cfg: AppConfig, generator: DynGenerator, feeds: Arc<dyn FeedClient>) -> Self {
        Self {
            cfg,
            generator,
            feeds,
        }
    }

    pub fn state(&self) -> AppState {
        let store = Arc::new(HaikuStore::new());
        let pipeline = Pipeline::new(
            Arc::new(self.cfg.registry()),
            self.feeds.clone(),
            HaikuGenerator::new(self.generator.clone(), self.cfg.max_excerpt_chars),
            Arc::new(RateLimiter::per_second(self.cfg.rate_limit_per_sec)),
            store.clone(),
            self.cfg.pipeline_settings(),
        );
        let translator = Translator::new(
            self.generator.clone(),
            Arc::new(TranslationCache::new(&self.cfg.translation_cache_path)),
            self.cfg.translation_language.clone(),
        );
        let live = LiveChannel::new(
            pipeline,
            translator.clone(),
            LiveSettings {
                poll_interval: self.cfg.poll_interval(),
                cache_lifetime: self.cfg.cache_lifetime(),
            },
        );
        AppState {
            store,
            live,
            translator,
        }
    }

    pub fn router(&self) -> Router {
        api::router(self.state())
    }
}

/// Build the full application router from env/config (used by the binary).
pub fn app() -> Result<Router> {
    Ok(AppRuntime::from_env()?.router())
}
