// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A named feed endpoint from the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// One `<item>` as the feed collaborator hands it over. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub pub_date: Option<String>,
    pub content_snippet: Option<String>,
    pub guid: Option<String>,
}

/// A validated, source-tagged feed item. Identity is `guid`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub published_at: OffsetDateTime,
    pub excerpt: Option<String>,
    pub guid: String,
    pub source_name: String,
}

impl FeedItem {
    /// Text handed to the generator: the snippet, or the title when there is none.
    pub fn generation_input(&self) -> &str {
        match self.excerpt.as_deref() {
            Some(s) if !s.trim().is_empty() => s,
            _ => &self.title,
        }
    }

    /// Publication time as milliseconds since the Unix epoch.
    pub fn timestamp_ms(&self) -> i64 {
        (self.published_at.unix_timestamp_nanos() / 1_000_000) as i64
    }
}

/// Feed-fetch capability: `url -> items`.
#[async_trait::async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<RawFeedItem>>;
    fn name(&self) -> &'static str;
}
