// tests/live_channel.rs
//
// Per-client live sessions on a paused clock: event order, polling, errors, disconnect.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use haiku_news::live::LiveEvent;
use haiku_news::translate::text_id;
use haiku_news::{Haiku, HaikuStore};
use tokio::sync::mpsc::Receiver;

async fn next(rx: &mut Receiver<LiveEvent>) -> LiveEvent {
    rx.recv().await.expect("session ended early")
}

async fn expect_handshake(rx: &mut Receiver<LiveEvent>) -> Vec<Haiku> {
    assert_eq!(next(rx).await, LiveEvent::initializing(true));
    let initial = match next(rx).await {
        LiveEvent::Initial(h) => h,
        other => panic!("expected initial, got {other:?}"),
    };
    assert_eq!(next(rx).await, LiveEvent::initializing(false));
    initial
}

fn sample(id: &str) -> Haiku {
    Haiku {
        id: id.to_string(),
        text: GOOD_HAIKU.to_string(),
        link: format!("https://example.com/{id}"),
        source_name: "Wire".to_string(),
        timestamp: 1_749_448_800_000,
        original_title: "t".to_string(),
        original_excerpt: None,
    }
}

#[tokio::test(start_paused = true)]
async fn fresh_session_sends_status_initial_status_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let gen = ScriptedGenerator::new();
    let store = Arc::new(HaikuStore::new());
    let live = live_with(
        pipeline_with(fixture_sources(), gen.clone(), store),
        translator_in(&dir, gen.clone()),
    );

    let mut rx = live.open();
    let initial = expect_handshake(&mut rx).await;
    assert!(initial.is_empty());
    assert_eq!(gen.haiku_calls(), 0, "no cycle before the first tick");
}

#[tokio::test(start_paused = true)]
async fn poll_tick_reports_checking_and_pushes_only_new_haikus() {
    let dir = tempfile::tempdir().unwrap();
    let gen = ScriptedGenerator::new();
    let store = Arc::new(HaikuStore::new());
    let live = live_with(
        pipeline_with(fixture_sources(), gen.clone(), store.clone()),
        translator_in(&dir, gen.clone()),
    );

    let mut rx = live.open();
    expect_handshake(&mut rx).await;

    assert_eq!(next(&mut rx).await, LiveEvent::checking(true));
    assert_eq!(next(&mut rx).await, LiveEvent::checking(false));
    let update = match next(&mut rx).await {
        LiveEvent::Update(h) => h,
        other => panic!("expected update, got {other:?}"),
    };
    let mut ids: Vec<_> = update.iter().map(|h| h.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["a-floods", "a-talks", "b-harvest"]);

    // Second tick finds nothing new: checking pair only, no update.
    assert_eq!(next(&mut rx).await, LiveEvent::checking(true));
    assert_eq!(next(&mut rx).await, LiveEvent::checking(false));
    assert_eq!(next(&mut rx).await, LiveEvent::checking(true));

    // Fresh haikus are pre-translated in the background.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(translator_in(&dir, gen.clone())
        .cache()
        .exists(&text_id(GOOD_HAIKU)));
    assert_eq!(gen.translate_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_cycle_sends_error_then_checking_false_and_keeps_going() {
    let dir = tempfile::tempdir().unwrap();
    let gen = ScriptedGenerator::new();
    let store = Arc::new(HaikuStore::new());
    let live = live_with(
        pipeline_with(vec![], gen.clone(), store),
        translator_in(&dir, gen.clone()),
    );

    let mut rx = live.open();
    expect_handshake(&mut rx).await;

    assert_eq!(next(&mut rx).await, LiveEvent::checking(true));
    assert_eq!(
        next(&mut rx).await,
        LiveEvent::Error {
            message: "Error checking feed.".to_string()
        }
    );
    assert_eq!(next(&mut rx).await, LiveEvent::checking(false));
    // still polling
    assert_eq!(next(&mut rx).await, LiveEvent::checking(true));
}

#[tokio::test(start_paused = true)]
async fn disconnect_stops_polling() {
    let dir = tempfile::tempdir().unwrap();
    let gen = ScriptedGenerator::new();
    let store = Arc::new(HaikuStore::new());
    let live = live_with(
        pipeline_with(fixture_sources(), gen.clone(), store),
        translator_in(&dir, gen.clone()),
    );

    let mut rx = live.open();
    expect_handshake(&mut rx).await;
    drop(rx);

    tokio::time::sleep(Duration::from_secs(30 * 60)).await;
    assert_eq!(gen.haiku_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn leaving_mid_cycle_keeps_results_and_ends_session() {
    let dir = tempfile::tempdir().unwrap();
    let gen = ScriptedGenerator::slow(Duration::from_secs(10));
    let store = Arc::new(HaikuStore::new());
    let live = live_with(
        pipeline_with(fixture_sources(), gen.clone(), store.clone()),
        translator_in(&dir, gen.clone()),
    );

    let mut rx = live.open();
    expect_handshake(&mut rx).await;
    assert_eq!(next(&mut rx).await, LiveEvent::checking(true));
    drop(rx);

    // Two batches of 10 s replies plus the pause; the cycle runs to completion.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(gen.haiku_calls(), 4);
    assert_eq!(store.len(), 3);
    assert_eq!(gen.translate_calls(), 0, "an abandoned cycle skips pre-translation");

    tokio::time::sleep(Duration::from_secs(30 * 60)).await;
    assert_eq!(gen.haiku_calls(), 4, "no further cycles after the client left");
}

#[tokio::test(start_paused = true)]
async fn store_survives_reconnect_until_lifetime_elapses() {
    let dir = tempfile::tempdir().unwrap();
    let gen = ScriptedGenerator::new();
    let store = Arc::new(HaikuStore::new());
    let live = live_with(
        pipeline_with(fixture_sources(), gen.clone(), store.clone()),
        translator_in(&dir, gen.clone()),
    );

    // First connection ever: nothing has been cleared yet, so the store starts fresh.
    let mut rx = live.open();
    assert!(expect_handshake(&mut rx).await.is_empty());
    drop(rx);

    store.add(sample("kept"));
    tokio::time::advance(Duration::from_secs(60 * 60)).await;

    let mut rx = live.open();
    let initial = expect_handshake(&mut rx).await;
    assert_eq!(initial.len(), 1);
    assert_eq!(initial[0].id, "kept");
    drop(rx);

    tokio::time::advance(Duration::from_secs(2 * 60 * 60 + 1)).await;

    let mut rx = live.open();
    assert!(expect_handshake(&mut rx).await.is_empty());
    assert!(!store.has_been_processed("kept"));
}

#[tokio::test(start_paused = true)]
async fn initial_snapshot_is_newest_first_and_pretranslated() {
    let dir = tempfile::tempdir().unwrap();
    let gen = ScriptedGenerator::new();
    let store = Arc::new(HaikuStore::new());
    let live = live_with(
        pipeline_with(fixture_sources(), gen.clone(), store.clone()),
        translator_in(&dir, gen.clone()),
    );
    drop(live.open());
    // let the first session observe the drop and exit
    tokio::time::sleep(Duration::from_millis(10)).await;

    let mut older = sample("older");
    older.timestamp -= 60_000;
    older.text = "Older pond at dusk\nA heron waits by the reeds\nNight falls without sound".into();
    store.add(older);
    store.add(sample("newer"));

    let mut rx = live.open();
    let initial = expect_handshake(&mut rx).await;
    let ids: Vec<_> = initial.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["newer", "older"]);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(gen.translate_calls(), 2);
}
