// src/translate/mod.rs
//! Haiku translation backed by the file cache.

pub mod cache;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::generate::DynGenerator;
use crate::store::Haiku;
pub use cache::{text_id, TranslationCache};

pub const DEFAULT_LANGUAGE: &str = "Russian";
const TRANSLATION_MAX_TOKENS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    /// The generation service produced nothing.
    Upstream,
    /// The translation came back but could not be cached.
    Cache(String),
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslateError::Upstream => write!(f, "translation service returned nothing"),
            TranslateError::Cache(e) => write!(f, "translation cache write failed: {e}"),
        }
    }
}

impl std::error::Error for TranslateError {}

pub fn build_prompt(text: &str, language: &str) -> String {
    format!(
        "Translate this English haiku into a {language} haiku. Focus on preserving the core meaning and imagery, not word-for-word translation.\n\n\
         Important guidelines:\n\
         1. Capture the essence of the original haiku's idea and emotion\n\
         2. Create a proper {language} haiku with poetic quality\n\
         3. Maintain the traditional three-line structure\n\
         4. The result should feel natural in {language}, not like a direct translation\n\
         5. Prioritize poetic beauty and meaning over literal accuracy\n\n\
         Return ONLY the translated {language} haiku with no additional comments.\n\n\
         English haiku:\n\
         {text}"
    )
}

#[derive(Clone)]
pub struct Translator {
    client: DynGenerator,
    cache: Arc<TranslationCache>,
    language: String,
}

impl Translator {
    pub fn new(client: DynGenerator, cache: Arc<TranslationCache>, language: impl Into<String>) -> Self {
        Self {
            client,
            cache,
            language: language.into(),
        }
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Run a cache file operation on the blocking pool.
    async fn with_cache<T, F>(&self, f: F) -> Result<T, TranslateError>
    where
        F: FnOnce(&TranslationCache) -> T + Send + 'static,
        T: Send + 'static,
    {
        let cache = self.cache.clone();
        tokio::task::spawn_blocking(move || f(&cache))
            .await
            .map_err(|e| TranslateError::Cache(e.to_string()))
    }

    /// Cached translation, or a fresh one that is then cached.
    pub async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let id = text_id(text);
        let key = id.clone();
        if let Some(hit) = self.with_cache(move |c| c.get(&key)).await? {
            counter!("translation_cache_hits_total").increment(1);
            tracing::debug!(target: "translate", %id, "translation found in cache");
            return Ok(hit);
        }
        counter!("translation_cache_misses_total").increment(1);

        let prompt = build_prompt(text, &self.language);
        let translation = self
            .client
            .complete(&prompt, TRANSLATION_MAX_TOKENS)
            .await
            .ok_or(TranslateError::Upstream)?;

        let (key, value) = (id.clone(), translation.clone());
        self.with_cache(move |c| c.put(&key, &value))
            .await?
            .map_err(|e| TranslateError::Cache(e.to_string()))?;
        tracing::info!(target: "translate", %id, "translation cached");
        Ok(translation)
    }

    /// Cache hits for `texts`, keyed by the original text.
    pub async fn cached(&self, texts: Vec<String>) -> Result<BTreeMap<String, String>, TranslateError> {
        self.with_cache(move |c| {
            let all = c.load_all();
            texts
                .into_iter()
                .filter_map(|t| all.get(&text_id(&t)).cloned().map(|tr| (t, tr)))
                .collect()
        })
        .await
    }

    /// Translate unless already cached. Errors are logged, never returned.
    pub async fn ensure_translated(&self, haiku: &Haiku) {
        let id = text_id(&haiku.text);
        if self.with_cache(move |c| c.exists(&id)).await.unwrap_or(false) {
            return;
        }
        tracing::debug!(target: "translate", id = %haiku.id, "pre-translating haiku");
        if let Err(e) = self.translate(&haiku.text).await {
            tracing::warn!(target: "translate", id = %haiku.id, error = %e, "pre-translation failed");
        }
    }

    /// Pre-translate in a detached task; callers do not wait for it.
    pub fn spawn_pretranslate(&self, haikus: Vec<Haiku>) -> Option<JoinHandle<()>> {
        if haikus.is_empty() {
            return None;
        }
        let me = self.clone();
        Some(tokio::spawn(async move {
            for h in &haikus {
                me.ensure_translated(h).await;
            }
            tracing::info!(target: "translate", count = haikus.len(), "background pre-translation completed");
        }))
    }
}
