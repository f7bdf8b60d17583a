//! Feed -> haiku batch processing.
//!
//! One cycle: pick sources, fetch, drop known guids, then run fixed-size batches. Items of a
//! batch run as independent tasks; batches run strictly one after another with a short pause
//! between them.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use metrics::counter;
use serde::Serialize;
use tokio::task::JoinSet;

use crate::generate::{HaikuGenerator, RateLimiter};
use crate::ingest::{self, registry::SourceRegistry, types::FeedClient, types::FeedItem};
use crate::store::{Haiku, HaikuStore};

pub const DEFAULT_BATCH_SIZE: usize = 3;
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub sources_per_cycle: usize,
    pub max_items_per_feed: usize,
    pub batch_size: usize,
    pub batch_pause: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            sources_per_cycle: 2,
            max_items_per_feed: 5,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pause: DEFAULT_BATCH_PAUSE,
        }
    }
}

/// What one cycle did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub fetched: usize,
    pub unprocessed: usize,
    pub batches: usize,
    pub generated: usize,
    pub rejected: usize,
    pub failed: usize,
    #[serde(skip)]
    pub haikus: Vec<Haiku>,
}

enum ItemOutcome {
    Created(Haiku),
    Rejected,
    Skipped,
}

#[derive(Clone)]
pub struct Pipeline {
    registry: Arc<SourceRegistry>,
    feeds: Arc<dyn FeedClient>,
    generator: HaikuGenerator,
    limiter: Arc<RateLimiter>,
    store: Arc<HaikuStore>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        registry: Arc<SourceRegistry>,
        feeds: Arc<dyn FeedClient>,
        generator: HaikuGenerator,
        limiter: Arc<RateLimiter>,
        store: Arc<HaikuStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            registry,
            feeds,
            generator,
            limiter,
            store,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<HaikuStore> {
        &self.store
    }

    /// Haikus created by this cycle only.
    pub async fn process_new_feed_items(&self) -> Result<Vec<Haiku>> {
        Ok(self.run_cycle().await?.haikus)
    }

    pub async fn run_cycle(&self) -> Result<CycleReport> {
        if self.registry.is_empty() {
            bail!("no feed sources configured");
        }
        tracing::info!(target: "pipeline", "starting feed processing");

        let sources = self.registry.pick_random(self.settings.sources_per_cycle);
        let items = ingest::fetch_items(
            self.feeds.as_ref(),
            &sources,
            self.settings.max_items_per_feed,
        )
        .await;
        self.process_items(items).await
    }

    /// Run already-fetched items through dedup, generation and the store.
    pub async fn process_items(&self, items: Vec<FeedItem>) -> Result<CycleReport> {
        let mut report = CycleReport {
            fetched: items.len(),
            ..Default::default()
        };
        if items.is_empty() {
            tracing::info!(target: "pipeline", "no feed items fetched");
            return Ok(report);
        }

        let mut seen = HashSet::new();
        let unprocessed: Vec<FeedItem> = items
            .into_iter()
            .filter(|it| !self.store.has_been_processed(&it.guid))
            .filter(|it| seen.insert(it.guid.clone()))
            .collect();
        report.unprocessed = unprocessed.len();
        tracing::info!(
            target: "pipeline",
            unprocessed = report.unprocessed,
            total = report.fetched,
            "filtered already processed items"
        );

        let batch_size = self.settings.batch_size.max(1);
        let total_batches = unprocessed.len().div_ceil(batch_size);

        for (i, batch) in unprocessed.chunks(batch_size).enumerate() {
            tracing::info!(target: "pipeline", batch = i + 1, of = total_batches, "processing batch");

            let mut set = JoinSet::new();
            for item in batch.iter().cloned() {
                let me = self.clone();
                set.spawn(async move { me.process_item(item).await });
            }
            report.batches += 1;

            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(ItemOutcome::Created(h)) => {
                        report.generated += 1;
                        report.haikus.push(h);
                    }
                    Ok(ItemOutcome::Rejected) => report.rejected += 1,
                    Ok(ItemOutcome::Skipped) => {}
                    Err(e) => {
                        tracing::error!(target: "pipeline", error = ?e, "item task failed");
                        report.failed += 1;
                    }
                }
            }

            if i + 1 < total_batches {
                tokio::time::sleep(self.settings.batch_pause).await;
            }
        }

        // Items whose task never got to run still count as attempted.
        for item in &unprocessed {
            self.store.mark_as_processed(&item.guid);
        }

        tracing::info!(
            target: "pipeline",
            generated = report.generated,
            rejected = report.rejected,
            failed = report.failed,
            "feed processing finished"
        );
        Ok(report)
    }

    async fn process_item(&self, item: FeedItem) -> ItemOutcome {
        // Claim the guid before generating; an overlapping cycle sees it as taken.
        if !self.store.mark_as_processed(&item.guid) {
            return ItemOutcome::Skipped;
        }
        tracing::debug!(target: "pipeline", guid = %item.guid, title = %item.title, "processing item");

        let text = self
            .limiter
            .run(self.generator.generate(item.generation_input()))
            .await;

        match text {
            Some(text) => {
                let haiku = Haiku {
                    id: item.guid.clone(),
                    text,
                    link: item.link.clone(),
                    source_name: item.source_name.clone(),
                    timestamp: item.timestamp_ms(),
                    original_title: item.title.clone(),
                    original_excerpt: item.excerpt.clone(),
                };
                self.store.add(haiku.clone());
                counter!("haiku_generated_total").increment(1);
                tracing::info!(target: "pipeline", guid = %item.guid, source = %item.source_name, "haiku generated");
                ItemOutcome::Created(haiku)
            }
            None => ItemOutcome::Rejected,
        }
    }
}
