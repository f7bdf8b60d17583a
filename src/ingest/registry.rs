// src/ingest/registry.rs
//! Static list of world-news feeds plus the per-cycle random subset.

use rand::seq::SliceRandom;

use crate::ingest::types::FeedSource;

/// Feeds used when the config file does not provide its own list.
pub const DEFAULT_FEEDS: &[(&str, &str)] = &[
    ("The Guardian", "https://www.theguardian.com/world/rss"),
    ("BBC News", "http://feeds.bbci.co.uk/news/world/rss.xml"),
    ("CNN", "http://rss.cnn.com/rss/edition_world.rss"),
    ("NPR News", "https://feeds.npr.org/1001/rss.xml"),
    ("Al Jazeera", "https://www.aljazeera.com/xml/rss/all.xml"),
    ("ABC News", "https://abcnews.go.com/abcnews/worldnewsheadlines"),
    ("CBS News", "https://www.cbsnews.com/latest/rss/world"),
    ("NBC News", "https://feeds.nbcnews.com/nbcnews/public/world"),
    ("Washington Post", "https://feeds.washingtonpost.com/rss/world"),
    ("NYT World", "https://rss.nytimes.com/services/xml/rss/nyt/World.xml"),
];

#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<FeedSource>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new(
            DEFAULT_FEEDS
                .iter()
                .map(|(name, url)| FeedSource::new(*name, *url))
                .collect(),
        )
    }
}

impl SourceRegistry {
    pub fn new(sources: Vec<FeedSource>) -> Self {
        Self { sources }
    }

    pub fn all(&self) -> &[FeedSource] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Shuffled subset of at most `n` sources, so each cycle hits only a few feeds.
    pub fn pick_random(&self, n: usize) -> Vec<FeedSource> {
        let mut picked = self.sources.clone();
        picked.shuffle(&mut rand::rng());
        picked.truncate(n);
        picked
    }
}
