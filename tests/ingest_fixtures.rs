// tests/ingest_fixtures.rs
// Parse + select over the bundled RSS fixtures.

mod common;

use common::*;
use haiku_news::ingest::{fetch_items, fetch_source};
use haiku_news::ingest::types::FeedSource;

#[tokio::test]
async fn world_a_keeps_complete_items_newest_first() {
    let feeds = fixture_feeds();
    let items = fetch_source(feeds.as_ref(), &FeedSource::new("World A", WORLD_A_URL), 5).await;

    let guids: Vec<_> = items.iter().map(|i| i.guid.as_str()).collect();
    assert_eq!(guids, vec!["a-talks", "a-markets", "a-floods"]);
    assert!(items.iter().all(|i| i.source_name == "World A"));

    let floods = &items[2];
    assert_eq!(
        floods.excerpt.as_deref(),
        Some("Rising water shut bridges across the valley overnight.")
    );
    assert_eq!(floods.generation_input(), floods.excerpt.as_deref().unwrap());
}

#[tokio::test]
async fn max_items_truncates_after_sorting() {
    let feeds = fixture_feeds();
    let items = fetch_source(feeds.as_ref(), &FeedSource::new("World A", WORLD_A_URL), 1).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].guid, "a-talks");
}

#[tokio::test]
async fn sources_are_concatenated_and_failures_skipped() {
    let feeds = fixture_feeds();
    let sources = vec![
        FeedSource::new("World A", WORLD_A_URL),
        FeedSource::new("Down", DOWN_URL),
        FeedSource::new("World B", WORLD_B_URL),
    ];
    let items = fetch_items(feeds.as_ref(), &sources, 5).await;
    let guids: Vec<_> = items.iter().map(|i| i.guid.as_str()).collect();
    assert_eq!(guids, vec!["a-talks", "a-markets", "a-floods", "b-harvest"]);
}

#[tokio::test]
async fn unknown_source_yields_nothing() {
    let feeds = fixture_feeds();
    let items = fetch_source(feeds.as_ref(), &FeedSource::new("Down", DOWN_URL), 5).await;
    assert!(items.is_empty());
}
