// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod live;
pub mod metrics;
pub mod pipeline;
pub mod store;

// Feed ingest (registry, RSS collaborator, fetcher)
pub mod ingest;

// Haiku generation (AI adapter, syllables, validation, rate limiting)
pub mod generate;

// Translation cache + translator
pub mod translate;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::bootstrap::{app, AppRuntime};
pub use crate::pipeline::{CycleReport, Pipeline, PipelineSettings};
pub use crate::store::{DedupLedger, Haiku, HaikuStore};
