// src/ingest/mod.rs
pub mod registry;
pub mod rss;
pub mod types;

use crate::ingest::rss::parse_pub_date;
use crate::ingest::types::{FeedClient, FeedItem, FeedSource, RawFeedItem};
use futures::future::join_all;
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "haiku_feed_items_total",
            "Feed items kept after validation, sorting and truncation."
        );
        describe_counter!(
            "haiku_feed_errors_total",
            "Feed fetch/parse errors (per source)."
        );
        describe_histogram!("haiku_feed_parse_ms", "RSS parse time in milliseconds.");
    });
}

/// Normalize feed text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    // Tag removal can leave "towns ." behind
    out = out.replace(" .", ".").replace(" ,", ",");
    out.trim().to_string()
}

/// Keep complete items only, newest first, at most `max_items`, tagged with the source name.
pub fn select_recent(raw: Vec<RawFeedItem>, source_name: &str, max_items: usize) -> Vec<FeedItem> {
    let mut items: Vec<FeedItem> = raw
        .into_iter()
        .filter_map(|it| {
            let published_at = parse_pub_date(it.pub_date.as_deref()?)?;
            Some(FeedItem {
                title: it.title?,
                link: it.link?,
                published_at,
                excerpt: it.content_snippet,
                guid: it.guid?,
                source_name: source_name.to_string(),
            })
        })
        .collect();
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    items.truncate(max_items);
    items
}

/// Fetch one source; any failure becomes an empty list.
pub async fn fetch_source(
    client: &dyn FeedClient,
    source: &FeedSource,
    max_items: usize,
) -> Vec<FeedItem> {
    match client.fetch(&source.url).await {
        Ok(raw) => {
            let total = raw.len();
            let kept = select_recent(raw, &source.name, max_items);
            tracing::info!(
                target: "ingest",
                source = %source.name,
                total,
                kept = kept.len(),
                "fetched feed"
            );
            kept
        }
        Err(e) => {
            tracing::warn!(
                target: "ingest",
                error = ?e,
                source = %source.name,
                url = %source.url,
                client = client.name(),
                "feed fetch failed"
            );
            counter!("haiku_feed_errors_total").increment(1);
            Vec::new()
        }
    }
}

/// Fetch all given sources concurrently and concatenate their items in source order.
pub async fn fetch_items(
    client: &dyn FeedClient,
    sources: &[FeedSource],
    max_items: usize,
) -> Vec<FeedItem> {
    ensure_metrics_described();

    let per_source = join_all(
        sources
            .iter()
            .map(|source| fetch_source(client, source, max_items)),
    )
    .await;

    let items: Vec<FeedItem> = per_source.into_iter().flatten().collect();
    counter!("haiku_feed_items_total").increment(items.len() as u64);
    tracing::info!(
        target: "ingest",
        sources = sources.len(),
        items = items.len(),
        "feed fetch finished"
    );
    items
}
