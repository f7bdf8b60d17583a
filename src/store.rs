//! In-memory haiku collection plus the ledger of attempted feed items.
//!
//! Both live behind one lock and are always cleared together: dropping haikus while
//! keeping their guids would suppress regeneration forever.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use metrics::gauge;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// A generated haiku as stored and sent over the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Haiku {
    /// Guid of the source feed item.
    pub id: String,
    pub text: String,
    pub link: String,
    pub source_name: String,
    /// Publication time, ms since the Unix epoch.
    pub timestamp: i64,
    pub original_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_excerpt: Option<String>,
}

/// Guids already attempted, whether or not a haiku came out of it.
#[derive(Debug, Default)]
pub struct DedupLedger {
    seen: HashSet<String>,
}

impl DedupLedger {
    pub fn has_been_processed(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Returns `true` when the id was not yet recorded.
    pub fn mark_as_processed(&mut self, id: &str) -> bool {
        self.seen.insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn reset(&mut self) {
        self.seen.clear();
    }
}

#[derive(Debug, Default)]
struct Inner {
    haikus: HashMap<String, Haiku>,
    ledger: DedupLedger,
    last_clear: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct HaikuStore {
    inner: Mutex<Inner>,
}

impl HaikuStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a haiku; its id counts as processed from now on.
    pub fn add(&self, haiku: Haiku) {
        let mut g = self.inner.lock();
        g.ledger.mark_as_processed(&haiku.id);
        g.haikus.insert(haiku.id.clone(), haiku);
        gauge!("haiku_store_size").set(g.haikus.len() as f64);
    }

    /// All haikus, newest publication first.
    pub fn get_all(&self) -> Vec<Haiku> {
        let mut out: Vec<Haiku> = self.inner.lock().haikus.values().cloned().collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        out
    }

    pub fn get_by_id(&self, id: &str) -> Option<Haiku> {
        self.inner.lock().haikus.get(id).cloned()
    }

    pub fn has_been_processed(&self, id: &str) -> bool {
        self.inner.lock().ledger.has_been_processed(id)
    }

    /// Returns `true` when the id was not yet recorded.
    pub fn mark_as_processed(&self, id: &str) -> bool {
        self.inner.lock().ledger.mark_as_processed(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().haikus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn processed_count(&self) -> usize {
        self.inner.lock().ledger.len()
    }

    /// Drop every haiku and every processed id.
    pub fn clear(&self) {
        let mut g = self.inner.lock();
        Self::clear_locked(&mut g);
    }

    /// Clear when more than `lifetime` has passed since the last clear, or when the store
    /// has never been cleared. Returns whether a clear happened.
    pub fn expire_if_stale(&self, lifetime: Duration) -> bool {
        let now = Instant::now();
        let mut g = self.inner.lock();
        let stale = match g.last_clear {
            None => true,
            Some(at) => now.duration_since(at) > lifetime,
        };
        if stale {
            Self::clear_locked(&mut g);
            g.last_clear = Some(now);
        }
        stale
    }

    pub fn last_clear(&self) -> Option<Instant> {
        self.inner.lock().last_clear
    }

    fn clear_locked(g: &mut Inner) {
        g.haikus.clear();
        g.ledger.reset();
        gauge!("haiku_store_size").set(0.0);
    }
}
