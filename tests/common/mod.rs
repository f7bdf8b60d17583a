// tests/common/mod.rs
// Shared builders for integration tests: scripted generator + fixture-backed feeds.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use haiku_news::config::AppConfig;
use haiku_news::generate::{HaikuGenerator, RateLimiter, TextGenerator};
use haiku_news::ingest::registry::SourceRegistry;
use haiku_news::ingest::rss::RssFeedClient;
use haiku_news::ingest::types::{FeedClient, FeedSource};
use haiku_news::live::{LiveChannel, LiveSettings};
use haiku_news::translate::{TranslationCache, Translator};
use haiku_news::{HaikuStore, Pipeline, PipelineSettings};

pub const GOOD_HAIKU: &str = "An old silent pond\nA frog jumps into the pond\nSplash! Silence again";
pub const WORLD_A_URL: &str = "https://a.example.com/rss";
pub const WORLD_B_URL: &str = "https://b.example.com/rss";
pub const DOWN_URL: &str = "https://down.example.com/rss";

pub const WORLD_A: &str = include_str!("../fixtures/world_a.xml");
pub const WORLD_B: &str = include_str!("../fixtures/world_b.xml");

/// Valid haiku for most prompts; `BADSHAPE` in the prompt yields a two-line reply,
/// `NOREPLY` yields nothing. Translation prompts are answered with a fixed string.
pub struct ScriptedGenerator {
    pub haiku_calls: AtomicUsize,
    pub translate_calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedGenerator {
    pub fn new() -> Arc<Self> {
        Self::slow(Duration::ZERO)
    }

    /// Every haiku reply takes `delay` to arrive.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            haiku_calls: AtomicUsize::new(0),
            translate_calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn haiku_calls(&self) -> usize {
        self.haiku_calls.load(Ordering::SeqCst)
    }

    pub fn translate_calls(&self) -> usize {
        self.translate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, prompt: &str, _max_tokens: u32) -> Option<String> {
        if prompt.contains("English haiku:") {
            self.translate_calls.fetch_add(1, Ordering::SeqCst);
            return Some("Старый пруд".to_string());
        }
        self.haiku_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if prompt.contains("NOREPLY") {
            None
        } else if prompt.contains("BADSHAPE") {
            Some("Too short a poem\nonly two lines here".to_string())
        } else {
            Some(GOOD_HAIKU.to_string())
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

pub fn fixture_feeds() -> Arc<dyn FeedClient> {
    Arc::new(RssFeedClient::from_fixtures([
        (WORLD_A_URL, WORLD_A),
        (WORLD_B_URL, WORLD_B),
    ]))
}

pub fn fixture_sources() -> Vec<FeedSource> {
    vec![
        FeedSource::new("World A", WORLD_A_URL),
        FeedSource::new("World B", WORLD_B_URL),
    ]
}

pub fn settings_for(sources: usize) -> PipelineSettings {
    PipelineSettings {
        sources_per_cycle: sources,
        max_items_per_feed: 5,
        batch_size: 3,
        batch_pause: Duration::from_millis(500),
    }
}

pub fn pipeline_with(
    sources: Vec<FeedSource>,
    gen: Arc<ScriptedGenerator>,
    store: Arc<HaikuStore>,
) -> Pipeline {
    let n = sources.len();
    Pipeline::new(
        Arc::new(SourceRegistry::new(sources)),
        fixture_feeds(),
        HaikuGenerator::new(gen, 500),
        Arc::new(RateLimiter::per_second(5)),
        store,
        settings_for(n),
    )
}

pub fn translator_in(dir: &tempfile::TempDir, gen: Arc<ScriptedGenerator>) -> Translator {
    Translator::new(
        gen,
        Arc::new(TranslationCache::new(dir.path().join("translation-cache.json"))),
        "Russian",
    )
}

pub fn live_with(pipeline: Pipeline, translator: Translator) -> LiveChannel {
    LiveChannel::new(
        pipeline,
        translator,
        LiveSettings {
            poll_interval: Duration::from_secs(120),
            cache_lifetime: Duration::from_secs(3 * 3600),
        },
    )
}

/// Config pointing at the fixture feeds with a temp translation cache.
pub fn fixture_config(dir: &tempfile::TempDir) -> AppConfig {
    AppConfig {
        feeds: fixture_sources(),
        sources_per_cycle: 2,
        translation_cache_path: dir.path().join("translation-cache.json"),
        ..AppConfig::default()
    }
}
