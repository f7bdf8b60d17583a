//! Live update channel: one background job per connected client.
//!
//! Lifecycle per connection: initializing (status + initial snapshot) -> streaming, where
//! each poll tick runs a pipeline cycle and pushes only the new haikus -> closed once the
//! client's receiver is gone. Processing errors are reported as events and never end the
//! stream.

use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::Event;
use metrics::gauge;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::pipeline::Pipeline;
use crate::store::{Haiku, HaikuStore};
use crate::translate::Translator;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2 * 60);
pub const DEFAULT_CACHE_LIFETIME: Duration = Duration::from_secs(3 * 60 * 60);
const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StatusPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initializing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checking: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    Status(StatusPayload),
    Initial(Vec<Haiku>),
    Update(Vec<Haiku>),
    Error { message: String },
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    message: &'a str,
}

impl LiveEvent {
    pub fn initializing(on: bool) -> Self {
        LiveEvent::Status(StatusPayload {
            initializing: Some(on),
            checking: None,
        })
    }

    pub fn checking(on: bool) -> Self {
        LiveEvent::Status(StatusPayload {
            initializing: None,
            checking: Some(on),
        })
    }

    /// SSE `event:` name.
    pub fn name(&self) -> &'static str {
        match self {
            LiveEvent::Status(_) => "status",
            LiveEvent::Initial(_) => "initial",
            LiveEvent::Update(_) => "update",
            LiveEvent::Error { .. } => "error",
        }
    }

    /// SSE `data:` payload.
    pub fn data(&self) -> serde_json::Result<String> {
        match self {
            LiveEvent::Status(s) => serde_json::to_string(s),
            LiveEvent::Initial(h) | LiveEvent::Update(h) => serde_json::to_string(h),
            LiveEvent::Error { message } => serde_json::to_string(&ErrorPayload { message }),
        }
    }

    pub fn to_sse(&self) -> serde_json::Result<Event> {
        Ok(Event::default().event(self.name()).data(self.data()?))
    }
}

#[derive(Debug, Clone)]
pub struct LiveSettings {
    pub poll_interval: Duration,
    pub cache_lifetime: Duration,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            cache_lifetime: DEFAULT_CACHE_LIFETIME,
        }
    }
}

#[derive(Clone)]
pub struct LiveChannel {
    store: Arc<HaikuStore>,
    pipeline: Pipeline,
    translator: Translator,
    settings: LiveSettings,
}

impl LiveChannel {
    pub fn new(pipeline: Pipeline, translator: Translator, settings: LiveSettings) -> Self {
        Self {
            store: pipeline.store().clone(),
            pipeline,
            translator,
            settings,
        }
    }

    /// Open a client session. Dropping the receiver ends the session's background job.
    pub fn open(&self) -> mpsc::Receiver<LiveEvent> {
        if self.store.expire_if_stale(self.settings.cache_lifetime) {
            tracing::info!(target: "live", "cache lifetime elapsed, store cleared");
        } else {
            tracing::debug!(target: "live", "using existing cache");
        }

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let me = self.clone();
        tokio::spawn(async move {
            gauge!("haiku_live_connections").increment(1.0);
            tracing::info!(target: "live", "connection established");
            me.run_session(tx).await;
            gauge!("haiku_live_connections").decrement(1.0);
            tracing::info!(target: "live", "connection closed");
        });
        rx
    }

    async fn run_session(&self, tx: mpsc::Sender<LiveEvent>) {
        if tx.send(LiveEvent::initializing(true)).await.is_err() {
            return;
        }
        let initial = self.store.get_all();
        tracing::info!(target: "live", count = initial.len(), "sending initial haikus");
        if tx.send(LiveEvent::Initial(initial.clone())).await.is_err() {
            return;
        }
        self.translator.spawn_pretranslate(initial);
        if tx.send(LiveEvent::initializing(false)).await.is_err() {
            return;
        }

        let period = self.settings.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                _ = ticker.tick() => {}
            }
            if !self.poll_once(&tx).await {
                break;
            }
        }
    }

    /// One cycle. Returns `false` once the client is gone.
    async fn poll_once(&self, tx: &mpsc::Sender<LiveEvent>) -> bool {
        tracing::info!(target: "live", "polling for new feed items");
        if tx.send(LiveEvent::checking(true)).await.is_err() {
            return false;
        }

        // The cycle runs to completion even if the client leaves meanwhile.
        let outcome = self.pipeline.process_new_feed_items().await;
        if tx.is_closed() {
            tracing::debug!(target: "live", "client left during cycle, discarding results");
            return false;
        }

        match outcome {
            Ok(new_haikus) => {
                self.translator.spawn_pretranslate(new_haikus.clone());
                if tx.send(LiveEvent::checking(false)).await.is_err() {
                    return false;
                }
                if !new_haikus.is_empty() {
                    tracing::info!(target: "live", count = new_haikus.len(), "sending update");
                    if tx.send(LiveEvent::Update(new_haikus)).await.is_err() {
                        return false;
                    }
                }
            }
            Err(e) => {
                tracing::error!(target: "live", error = ?e, "error during periodic feed check");
                let error = LiveEvent::Error {
                    message: "Error checking feed.".to_string(),
                };
                if tx.send(error).await.is_err() || tx.send(LiveEvent::checking(false)).await.is_err() {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_payload_omits_unset_flag() {
        assert_eq!(
            LiveEvent::initializing(true).data().unwrap(),
            r#"{"initializing":true}"#
        );
        assert_eq!(
            LiveEvent::checking(false).data().unwrap(),
            r#"{"checking":false}"#
        );
    }

    #[test]
    fn event_names_and_payloads() {
        assert_eq!(LiveEvent::Initial(vec![]).name(), "initial");
        assert_eq!(LiveEvent::Initial(vec![]).data().unwrap(), "[]");
        assert_eq!(LiveEvent::Update(vec![]).name(), "update");
        let err = LiveEvent::Error {
            message: "boom".into(),
        };
        assert_eq!(err.name(), "error");
        assert_eq!(err.data().unwrap(), r#"{"message":"boom"}"#);
    }
}
